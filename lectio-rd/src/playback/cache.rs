//! Verse audio cache
//!
//! Keyed by verse text and voice, the two inputs synthesis actually depends
//! on. The value is a shared future, not a finished buffer: the entry is
//! inserted before the first await, so a prefetch and a playback request
//! for the same verse share one provider call no matter how they
//! interleave. Text+voice keys also make late inserts from a superseded
//! prefetch harmless after a chapter or voice change: the stale entry can
//! never collide with a new chapter's verse at the same position.
//!
//! Voice or chapter changes clear the whole map; detached clones of the
//! old futures still resolve for whoever holds them.

use crate::audio::decoder::decode_pcm16;
use crate::audio::types::{VerseAudio, CHANNELS, SAMPLE_RATE};
use crate::error::Error;
use crate::gemini::VerseAudioSource;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type CachedResult = std::result::Result<Arc<VerseAudio>, Arc<Error>>;
type CachedFuture = Shared<BoxFuture<'static, CachedResult>>;

pub struct VerseCache {
    source: Arc<dyn VerseAudioSource>,
    entries: Mutex<HashMap<(String, String), CachedFuture>>,
}

impl VerseCache {
    pub fn new(source: Arc<dyn VerseAudioSource>) -> Self {
        Self {
            source,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Get the audio for a verse, starting a fetch+decode if none is in
    /// flight. Concurrent callers for the same text and voice await the
    /// same future.
    pub async fn get_or_fetch(&self, text: &str, voice_id: &str) -> CachedResult {
        let key = (text.to_string(), voice_id.to_string());
        let future = {
            let mut entries = self.entries.lock().unwrap();
            if let Some(existing) = entries.get(&key) {
                existing.clone()
            } else {
                let fetch = self.source.verse_audio(text, voice_id);
                let future: CachedFuture = async move {
                    let bytes = fetch.await.map_err(Arc::new)?;
                    let audio = decode_pcm16(&bytes, SAMPLE_RATE, CHANNELS).map_err(Arc::new)?;
                    Ok(Arc::new(audio))
                }
                .boxed()
                .shared();
                entries.insert(key, future.clone());
                future
            }
        };
        future.await
    }

    pub fn contains(&self, text: &str, voice_id: &str) -> bool {
        self.entries
            .lock()
            .unwrap()
            .contains_key(&(text.to_string(), voice_id.to_string()))
    }

    /// Drop all entries. In-flight fetches keep running for any holder of
    /// a cloned future but their results are never re-observed here.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}
