//! Playback sequencer
//!
//! Drives verse-by-verse playback of the loaded chapter. Every interrupting
//! command (play, pause, stop, jump, voice change, chapter load) bumps an
//! epoch counter; the run loop re-checks the epoch after every await and
//! quietly exits when it has been superseded. No command ever has to join
//! or abort the old loop, it just strands it.

use crate::audio::output::AudioSink;
use crate::error::{Error, Result};
use crate::gemini::VerseAudioSource;
use crate::playback::cache::VerseCache;
use crate::playback::prefetch::Prefetcher;
use crate::state::SharedState;
use lectio_common::events::{PlaybackState, ReaderEvent};
use lectio_common::types::{Verse, VoiceProfile};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Cheap-to-clone handle to the playback engine.
#[derive(Clone)]
pub struct Sequencer {
    inner: Arc<Inner>,
}

struct Inner {
    state: Arc<SharedState>,
    sink: Arc<dyn AudioSink>,
    cache: Arc<VerseCache>,
    prefetcher: Prefetcher,
    verses: RwLock<Arc<Vec<Verse>>>,
    voice: RwLock<VoiceProfile>,
    epoch: AtomicU64,
}

impl Sequencer {
    pub fn new(
        state: Arc<SharedState>,
        sink: Arc<dyn AudioSink>,
        source: Arc<dyn VerseAudioSource>,
        voice: VoiceProfile,
        lookahead: usize,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state,
                sink,
                cache: Arc::new(VerseCache::new(source)),
                prefetcher: Prefetcher::new(lookahead),
                verses: RwLock::new(Arc::new(Vec::new())),
                voice: RwLock::new(voice),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    pub fn voice(&self) -> VoiceProfile {
        self.inner.voice.read().unwrap().clone()
    }

    pub fn verse_count(&self) -> usize {
        self.inner.verses.read().unwrap().len()
    }

    /// Replace the loaded chapter. Stops playback and discards all cached
    /// audio; any in-flight fetch for the old chapter resolves into a
    /// detached future nobody re-observes.
    pub async fn load_chapter(&self, verses: Vec<Verse>) {
        let inner = &self.inner;
        inner.bump_epoch();
        let _ = inner.sink.stop();
        inner.cache.clear();
        *inner.verses.write().unwrap() = Arc::new(verses);
        inner.state.set_cursor(0).await;
        inner.state.set_active_verse(None).await;
        inner.state.set_loading(false).await;
        inner.state.set_status(PlaybackState::Idle).await;
    }

    /// Start (or restart) sequential playback from the given verse index.
    /// A start index past the end of the chapter settles back to idle
    /// without touching the provider.
    pub async fn play_chapter(&self, start: usize) -> Result<()> {
        let inner = &self.inner;
        let epoch = inner.bump_epoch();
        let _ = inner.sink.stop();
        inner.state.clear_error().await;

        let verses = inner.verses_snapshot();
        if start >= verses.len() {
            inner.state.set_active_verse(None).await;
            inner.state.set_loading(false).await;
            inner.state.set_status(PlaybackState::Idle).await;
            return Ok(());
        }

        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            inner.run(epoch, verses, start).await;
        });
        Ok(())
    }

    /// Pause at the current verse. Valid only while playing; the cursor
    /// stays put so resume restarts the same verse from its beginning.
    pub async fn pause(&self) -> Result<()> {
        let inner = &self.inner;
        if inner.state.status().await != PlaybackState::Playing {
            return Err(Error::InvalidState("not playing".to_string()));
        }
        inner.bump_epoch();
        let _ = inner.sink.stop();
        inner.state.set_loading(false).await;
        inner.state.set_status(PlaybackState::Paused).await;
        Ok(())
    }

    pub async fn resume(&self) -> Result<()> {
        if self.inner.state.status().await != PlaybackState::Paused {
            return Err(Error::InvalidState("not paused".to_string()));
        }
        let cursor = self.inner.state.cursor().await;
        self.play_chapter(cursor).await
    }

    /// Stop playback entirely and discard cached audio.
    pub async fn stop(&self) {
        let inner = &self.inner;
        inner.bump_epoch();
        let _ = inner.sink.stop();
        inner.cache.clear();
        inner.state.set_cursor(0).await;
        inner.state.set_active_verse(None).await;
        inner.state.set_loading(false).await;
        inner.state.set_status(PlaybackState::Idle).await;
    }

    /// Tap-a-verse semantics: tapping the sounding verse toggles
    /// pause/resume, tapping any other verse stops playback and restarts
    /// there.
    pub async fn play_from_verse(&self, index: usize) -> Result<()> {
        if index >= self.verse_count() {
            return Err(Error::BadRequest(format!(
                "verse index {} out of range",
                index
            )));
        }
        let status = self.inner.state.status().await;
        if self.inner.state.active_verse().await == Some(index) {
            match status {
                PlaybackState::Playing => return self.pause().await,
                PlaybackState::Paused => return self.resume().await,
                _ => {}
            }
        }
        self.stop().await;
        self.play_chapter(index).await
    }

    /// Switch the reading voice. Cached audio is voice-specific so the
    /// whole cache goes; if something is sounding or loading, playback
    /// restarts at the cursor in the new voice.
    pub async fn change_voice(&self, voice: VoiceProfile) -> Result<()> {
        let inner = &self.inner;
        inner.cache.clear();
        let voice_id = voice.id.clone();
        *inner.voice.write().unwrap() = voice;
        inner.state.events.emit_lossy(ReaderEvent::VoiceChanged {
            voice_id,
            timestamp: chrono::Utc::now(),
        });

        match inner.state.status().await {
            PlaybackState::Playing | PlaybackState::Loading => {
                let cursor = inner.state.cursor().await;
                self.play_chapter(cursor).await
            }
            _ => Ok(()),
        }
    }
}

impl Inner {
    /// Invalidate any running loop and return the new epoch.
    fn bump_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_stale(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) != epoch
    }

    fn verses_snapshot(&self) -> Arc<Vec<Verse>> {
        Arc::clone(&self.verses.read().unwrap())
    }

    fn voice_id(&self) -> String {
        self.voice.read().unwrap().id.clone()
    }

    async fn run(self: Arc<Self>, epoch: u64, verses: Arc<Vec<Verse>>, start: usize) {
        let mut index = start;
        while index < verses.len() {
            if self.is_stale(epoch) {
                return;
            }
            let verse = &verses[index];
            self.state.set_cursor(index).await;

            let voice_id = self.voice_id();
            if !self.cache.contains(&verse.text, &voice_id) {
                self.state.set_loading(true).await;
                self.state.set_status(PlaybackState::Loading).await;
            }
            self.prefetcher
                .schedule(&self.cache, &verses, index, &voice_id);

            let audio = self.cache.get_or_fetch(&verse.text, &voice_id).await;
            if self.is_stale(epoch) {
                return;
            }
            self.state.set_loading(false).await;

            let audio = match audio {
                Ok(audio) => audio,
                Err(e) => {
                    self.fail(format!("verse {} audio failed: {}", verse.number, e))
                        .await;
                    return;
                }
            };

            let completion = match self.sink.start(audio) {
                Ok(completion) => completion,
                Err(e) => {
                    self.fail(format!("audio output failed: {}", e)).await;
                    return;
                }
            };
            self.state.set_status(PlaybackState::Playing).await;
            self.state.set_active_verse(Some(index)).await;
            self.state.events.emit_lossy(ReaderEvent::VerseStarted {
                index,
                number: verse.number,
                timestamp: chrono::Utc::now(),
            });
            tracing::debug!(index, number = verse.number, "verse started");

            let natural = completion.ended().await;
            if self.is_stale(epoch) {
                // A command took over; it already set the state it wants.
                return;
            }
            if !natural {
                self.fail("audio output stopped unexpectedly".to_string())
                    .await;
                return;
            }
            self.state.events.emit_lossy(ReaderEvent::VerseCompleted {
                index,
                number: verse.number,
                timestamp: chrono::Utc::now(),
            });

            index += 1;
        }

        self.state.set_active_verse(None).await;
        self.state.set_status(PlaybackState::Idle).await;
        self.state.events.emit_lossy(ReaderEvent::ChapterCompleted {
            timestamp: chrono::Utc::now(),
        });
        tracing::info!("chapter playback complete");
    }

    /// Record a playback failure: the error message persists in the
    /// snapshot while the status passes through Error and settles at Idle,
    /// ready for the next command.
    async fn fail(&self, message: String) {
        tracing::error!("{}", message);
        let _ = self.sink.stop();
        self.state.set_loading(false).await;
        self.state.set_active_verse(None).await;
        self.state.set_error(message.clone()).await;
        self.state.set_status(PlaybackState::Error).await;
        self.state.events.emit_lossy(ReaderEvent::PlaybackError {
            message,
            timestamp: chrono::Utc::now(),
        });
        self.state.set_status(PlaybackState::Idle).await;
    }
}
