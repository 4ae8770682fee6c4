//! Prefetch scheduler
//!
//! Warms the verse cache for a small window past the cursor. Prefetch
//! failures are logged at debug level and otherwise ignored; when the
//! cursor actually reaches a failed verse the sequencer re-observes the
//! cached error and handles it there.

use crate::playback::cache::VerseCache;
use lectio_common::types::Verse;
use std::sync::Arc;

pub struct Prefetcher {
    window: usize,
}

impl Prefetcher {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Schedule fetches for verses `cursor+1 ..= cursor+window`. Cached and
    /// in-flight verses cost nothing; new ones spawn detached tasks.
    pub fn schedule(
        &self,
        cache: &Arc<VerseCache>,
        verses: &Arc<Vec<Verse>>,
        cursor: usize,
        voice_id: &str,
    ) {
        for index in cursor + 1..=cursor + self.window {
            if index >= verses.len() || cache.contains(&verses[index].text, voice_id) {
                continue;
            }
            let cache = Arc::clone(cache);
            let text = verses[index].text.clone();
            let voice_id = voice_id.to_string();
            tokio::spawn(async move {
                if let Err(e) = cache.get_or_fetch(&text, &voice_id).await {
                    tracing::debug!(index, "prefetch failed: {}", e);
                }
            });
        }
    }
}
