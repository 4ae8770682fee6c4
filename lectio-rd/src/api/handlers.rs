//! Request handlers

use crate::api::server::AppContext;
use crate::error::Error;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lectio_common::events::ReaderEvent;
use lectio_common::types::{find_voice, voice_catalog, ChapterContent};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl StatusResponse {
    fn ok() -> Json<Self> {
        Json(Self {
            status: "ok".to_string(),
            code: None,
        })
    }
}

/// Map service errors onto HTTP statuses. The body carries a stable code
/// so the UI can distinguish a persistent credential banner from a
/// transient toast.
fn error_response(e: Error) -> Response {
    let status = match &e {
        Error::MissingCredential => StatusCode::SERVICE_UNAVAILABLE,
        Error::Service(_) | Error::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
        Error::InvalidState(_) => StatusCode::CONFLICT,
        Error::BadRequest(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = Json(StatusResponse {
        status: e.to_string(),
        code: Some(e.code().to_string()),
    });
    (status, body).into_response()
}

// ---------------------------------------------------------------------------
// Health and content

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub git_hash: String,
    pub has_credential: bool,
}

pub async fn health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: env!("GIT_HASH").to_string(),
        has_credential: ctx.gemini.has_credential(),
    })
}

/// Fetch a chapter, disk cache first. A fresh fetch is persisted and the
/// chapter becomes the sequencer's loaded chapter either way.
pub async fn get_chapter(
    State(ctx): State<AppContext>,
    Path((book, chapter)): Path<(String, u32)>,
) -> Result<Json<ChapterContent>, Response> {
    if chapter == 0 {
        return Err(error_response(Error::BadRequest(
            "chapter numbers start at 1".to_string(),
        )));
    }

    let content = match ctx.store.load(&book, chapter) {
        Some(content) => content,
        None => {
            let content = ctx
                .gemini
                .fetch_chapter(&book, chapter)
                .await
                .map_err(error_response)?;
            if let Err(e) = ctx.store.save(&content) {
                tracing::warn!("failed to cache chapter: {}", e);
            }
            content
        }
    };

    ctx.sequencer.load_chapter(content.verses.clone()).await;
    ctx.state.events.emit_lossy(ReaderEvent::ChapterLoaded {
        book: content.book.clone(),
        chapter: content.chapter,
        verse_count: content.verses.len(),
        timestamp: chrono::Utc::now(),
    });

    Ok(Json(content))
}

pub async fn list_voices() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "voices": voice_catalog() }))
}

// ---------------------------------------------------------------------------
// Playback control

#[derive(Deserialize, Default)]
pub struct PlayRequest {
    #[serde(default)]
    pub start_index: usize,
}

pub async fn play(
    State(ctx): State<AppContext>,
    body: Option<Json<PlayRequest>>,
) -> Result<Json<StatusResponse>, Response> {
    let start = body.map(|Json(r)| r.start_index).unwrap_or(0);
    ctx.sequencer
        .play_chapter(start)
        .await
        .map_err(error_response)?;
    Ok(StatusResponse::ok())
}

pub async fn pause(State(ctx): State<AppContext>) -> Result<Json<StatusResponse>, Response> {
    ctx.sequencer.pause().await.map_err(error_response)?;
    Ok(StatusResponse::ok())
}

pub async fn resume(State(ctx): State<AppContext>) -> Result<Json<StatusResponse>, Response> {
    ctx.sequencer.resume().await.map_err(error_response)?;
    Ok(StatusResponse::ok())
}

pub async fn stop(State(ctx): State<AppContext>) -> Json<StatusResponse> {
    ctx.sequencer.stop().await;
    StatusResponse::ok()
}

#[derive(Deserialize)]
pub struct VerseRequest {
    pub index: usize,
}

pub async fn play_verse(
    State(ctx): State<AppContext>,
    Json(request): Json<VerseRequest>,
) -> Result<Json<StatusResponse>, Response> {
    ctx.sequencer
        .play_from_verse(request.index)
        .await
        .map_err(error_response)?;
    Ok(StatusResponse::ok())
}

#[derive(Deserialize)]
pub struct VoiceRequest {
    pub voice_id: String,
}

pub async fn set_voice(
    State(ctx): State<AppContext>,
    Json(request): Json<VoiceRequest>,
) -> Result<Json<StatusResponse>, Response> {
    let voice = find_voice(&request.voice_id)
        .ok_or_else(|| {
            error_response(Error::BadRequest(format!(
                "unknown voice: {}",
                request.voice_id
            )))
        })?
        .clone();
    ctx.sequencer
        .change_voice(voice)
        .await
        .map_err(error_response)?;
    Ok(StatusResponse::ok())
}

#[derive(Serialize)]
pub struct StateResponse {
    #[serde(flatten)]
    pub playback: crate::state::PlaybackSnapshot,
    pub voice_id: String,
    pub verse_count: usize,
}

pub async fn playback_state(State(ctx): State<AppContext>) -> Json<StateResponse> {
    Json(StateResponse {
        playback: ctx.state.snapshot().await,
        voice_id: ctx.sequencer.voice().id,
        verse_count: ctx.sequencer.verse_count(),
    })
}

// ---------------------------------------------------------------------------
// Assistant and cover art

#[derive(Deserialize)]
pub struct AssistantRequest {
    pub query: String,
    #[serde(default)]
    pub context: String,
}

#[derive(Serialize)]
pub struct AssistantResponse {
    pub answer: String,
}

pub async fn ask_assistant(
    State(ctx): State<AppContext>,
    Json(request): Json<AssistantRequest>,
) -> Result<Json<AssistantResponse>, Response> {
    if request.query.trim().is_empty() {
        return Err(error_response(Error::BadRequest("empty query".to_string())));
    }
    let answer = ctx
        .gemini
        .ask_assistant(&request.query, &request.context)
        .await
        .map_err(error_response)?;
    Ok(Json(AssistantResponse { answer }))
}

#[derive(Deserialize)]
pub struct CoverRequest {
    pub prompt: String,
}

pub async fn generate_cover(
    State(ctx): State<AppContext>,
    Json(request): Json<CoverRequest>,
) -> Result<Response, Response> {
    if request.prompt.trim().is_empty() {
        return Err(error_response(Error::BadRequest("empty prompt".to_string())));
    }
    let bytes = ctx
        .gemini
        .generate_cover(&request.prompt)
        .await
        .map_err(error_response)?;
    Ok((
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "image/png")],
        bytes,
    )
        .into_response())
}
