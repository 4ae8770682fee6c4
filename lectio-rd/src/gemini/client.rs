//! Gemini REST client

use crate::error::{Error, Result};
use crate::gemini::types::*;
use crate::gemini::VerseAudioSource;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures::future::BoxFuture;
use futures::FutureExt;
use lectio_common::types::{ChapterContent, Verse};
use std::time::Duration;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const TEXT_MODEL: &str = "gemini-2.5-flash";
const TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";
const IMAGE_MODEL: &str = "imagen-4.0-generate-001";

/// Chapter fetches retry transient failures this many times past the first
/// attempt; verse audio never auto-retries.
const CHAPTER_RETRIES: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(1500);

/// HTTP client for the generative API.
///
/// Cheap to clone (reqwest clients share a connection pool), which lets
/// methods hand out `'static` futures for the verse cache.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self { http, api_key }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    fn key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or(Error::MissingCredential)
    }

    async fn post_generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = format!("{}/{}:generateContent?key={}", API_BASE, model, self.key()?);
        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Service(format!("request failed: {}", e)))?;
        let response = check_status(response)?;
        response
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(format!("invalid response body: {}", e)))
    }

    /// Fetch a chapter as structured verse text, retrying transient
    /// failures with bounded linear backoff.
    pub async fn fetch_chapter(&self, book: &str, chapter: u32) -> Result<ChapterContent> {
        let client = self.clone();
        let book = book.to_string();
        retry_transient(move || {
            let client = client.clone();
            let book = book.clone();
            async move { client.fetch_chapter_once(&book, chapter).await }
        })
        .await
    }

    async fn fetch_chapter_once(&self, book: &str, chapter: u32) -> Result<ChapterContent> {
        let prompt = format!(
            "Provide the full text of {} chapter {} from the King James Version \
             of the Bible, split into numbered verses, plus a one-sentence summary \
             of the chapter.",
            book, chapter
        );
        let schema = serde_json::json!({
            "type": "OBJECT",
            "properties": {
                "verses": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "number": {"type": "INTEGER"},
                            "text": {"type": "STRING"}
                        },
                        "required": ["number", "text"]
                    }
                },
                "summary": {"type": "STRING"}
            },
            "required": ["verses"]
        });
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part::text(prompt)],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(schema),
                ..Default::default()
            }),
        };

        let response = self.post_generate(TEXT_MODEL, &request).await?;
        let text = response
            .first_text()
            .ok_or_else(|| Error::MalformedResponse("no text candidate".to_string()))?;
        let payload: ChapterPayload = serde_json::from_str(text)
            .map_err(|e| Error::MalformedResponse(format!("invalid chapter JSON: {}", e)))?;

        let content = ChapterContent {
            book: book.to_string(),
            chapter,
            verses: payload
                .verses
                .into_iter()
                .map(|v| Verse {
                    number: v.number,
                    text: v.text,
                })
                .collect(),
            summary: payload.summary,
        };
        content
            .validate()
            .map_err(|e| Error::MalformedResponse(e.to_string()))?;
        Ok(content)
    }

    /// Synthesize one verse to raw PCM16-LE bytes. No auto-retry; the
    /// failure surfaces immediately so the reader can offer a manual one.
    pub async fn synthesize_verse(&self, text: &str, voice_id: &str) -> Result<Vec<u8>> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part::text(text)],
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig::prebuilt(voice_id)),
                ..Default::default()
            }),
        };

        let response = self.post_generate(TTS_MODEL, &request).await?;
        let inline = response
            .first_inline_data()
            .ok_or_else(|| Error::MalformedResponse("no audio in response".to_string()))?;
        BASE64
            .decode(&inline.data)
            .map_err(|e| Error::MalformedResponse(format!("invalid audio base64: {}", e)))
    }

    /// Free-form study assistant answer grounded in the current chapter.
    pub async fn ask_assistant(&self, query: &str, context: &str) -> Result<String> {
        let prompt = format!(
            "You are a helpful Bible study assistant. The reader is currently \
             reading:\n\n{}\n\nAnswer their question concisely:\n{}",
            context, query
        );
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part::text(prompt)],
            }],
            generation_config: None,
        };
        let response = self.post_generate(TEXT_MODEL, &request).await?;
        response
            .first_text()
            .map(|t| t.to_string())
            .ok_or_else(|| Error::MalformedResponse("no answer text".to_string()))
    }

    /// Generate a cover image, returned as raw image bytes.
    pub async fn generate_cover(&self, prompt: &str) -> Result<Vec<u8>> {
        let url = format!("{}/{}:predict?key={}", API_BASE, IMAGE_MODEL, self.key()?);
        let request = PredictRequest {
            instances: vec![PredictInstance {
                prompt: prompt.to_string(),
            }],
            parameters: PredictParameters {
                sample_count: 1,
                aspect_ratio: "3:4".to_string(),
            },
        };
        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Service(format!("request failed: {}", e)))?;
        let response = check_status(response)?;
        let body: PredictResponse = response
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(format!("invalid response body: {}", e)))?;
        let encoded = body
            .predictions
            .first()
            .and_then(|p| p.bytes_base64_encoded.as_deref())
            .ok_or_else(|| Error::MalformedResponse("no image in response".to_string()))?;
        BASE64
            .decode(encoded)
            .map_err(|e| Error::MalformedResponse(format!("invalid image base64: {}", e)))
    }
}

impl VerseAudioSource for GeminiClient {
    fn verse_audio(&self, text: &str, voice_id: &str) -> BoxFuture<'static, Result<Vec<u8>>> {
        let client = self.clone();
        let text = text.to_string();
        let voice_id = voice_id.to_string();
        async move { client.synthesize_verse(&text, &voice_id).await }.boxed()
    }
}

/// Run an operation, retrying retryable failures up to [`CHAPTER_RETRIES`]
/// additional attempts with linear backoff.
async fn retry_transient<T, F, Fut>(mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < CHAPTER_RETRIES => {
                let delay = RETRY_BASE_DELAY * (attempt + 1);
                tracing::warn!(attempt, "retrying in {:?}: {}", delay, e);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Map HTTP status to the error taxonomy. 401/403 means the key itself is
/// bad, which the reader treats the same as a missing one.
fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match status.as_u16() {
        401 | 403 => Err(Error::MissingCredential),
        429 => Err(Error::Service("rate limited".to_string())),
        s if status.is_server_error() => Err(Error::Service(format!("upstream status {}", s))),
        s => Err(Error::MalformedResponse(format!("unexpected status {}", s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_fails_fast() {
        let client = GeminiClient::new(None);
        match client.fetch_chapter("Genesis", 1).await {
            Err(Error::MissingCredential) => {}
            other => panic!("expected MissingCredential, got {:?}", other.map(|_| ())),
        }
        match client.synthesize_verse("text", "Puck").await {
            Err(Error::MissingCredential) => {}
            other => panic!("expected MissingCredential, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_chapter_payload_parsing() {
        let payload: ChapterPayload = serde_json::from_str(
            r#"{"verses": [{"number": 1, "text": "In the beginning"}], "summary": "Creation"}"#,
        )
        .unwrap();
        assert_eq!(payload.verses.len(), 1);
        assert_eq!(payload.summary.as_deref(), Some("Creation"));
    }

    #[test]
    fn test_has_credential() {
        assert!(GeminiClient::new(Some("k".to_string())).has_credential());
        assert!(!GeminiClient::new(None).has_credential());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_retried_a_bounded_number_of_times() {
        let mut attempts = 0;
        let result: Result<()> = retry_transient(|| {
            attempts += 1;
            async { Err(Error::Service("503".to_string())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts, 1 + CHAPTER_RETRIES);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_fails_immediately() {
        let mut attempts = 0;
        let result: Result<()> = retry_transient(|| {
            attempts += 1;
            async { Err(Error::MissingCredential) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_stops_on_success() {
        let mut attempts = 0;
        let result = retry_transient(|| {
            attempts += 1;
            let outcome = if attempts < 3 {
                Err(Error::MalformedResponse("empty verses".to_string()))
            } else {
                Ok(42)
            };
            async move { outcome }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts, 3);
    }
}
