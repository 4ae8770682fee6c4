//! Shared playback state
//!
//! Thread-safe observable state for the verse sequencer. The reader view
//! never inspects raw errors or engine internals; everything it needs is a
//! pure function of this snapshot plus the event stream.

use lectio_common::events::{EventBus, PlaybackState, ReaderEvent};
use serde::Serialize;
use tokio::sync::RwLock;

/// Observable playback snapshot returned by the state endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackSnapshot {
    pub status: PlaybackState,
    /// Verse index currently playing or about to play
    pub cursor: usize,
    /// Highlighted verse index (None when nothing is sounding)
    pub active_verse: Option<usize>,
    /// True while awaiting an uncached fetch/decode for the current verse
    pub loading_audio: bool,
    /// Last playback error message; persists until the next play command
    pub last_error: Option<String>,
}

/// Shared state accessible by the sequencer and API handlers.
///
/// Uses RwLock for concurrent read access with rare writes.
pub struct SharedState {
    status: RwLock<PlaybackState>,
    cursor: RwLock<usize>,
    active_verse: RwLock<Option<usize>>,
    loading_audio: RwLock<bool>,
    last_error: RwLock<Option<String>>,

    /// Event broadcaster for SSE delivery
    pub events: EventBus,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            status: RwLock::new(PlaybackState::Idle),
            cursor: RwLock::new(0),
            active_verse: RwLock::new(None),
            loading_audio: RwLock::new(false),
            last_error: RwLock::new(None),
            events: EventBus::new(100),
        }
    }

    pub async fn status(&self) -> PlaybackState {
        *self.status.read().await
    }

    /// Set the playback status, broadcasting a state-change event when the
    /// value actually changes.
    pub async fn set_status(&self, new_state: PlaybackState) {
        let old_state = {
            let mut status = self.status.write().await;
            std::mem::replace(&mut *status, new_state)
        };
        if old_state != new_state {
            self.events.emit_lossy(ReaderEvent::PlaybackStateChanged {
                old_state,
                new_state,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    pub async fn cursor(&self) -> usize {
        *self.cursor.read().await
    }

    pub async fn set_cursor(&self, index: usize) {
        *self.cursor.write().await = index;
    }

    pub async fn active_verse(&self) -> Option<usize> {
        *self.active_verse.read().await
    }

    pub async fn set_active_verse(&self, index: Option<usize>) {
        *self.active_verse.write().await = index;
    }

    pub async fn set_loading(&self, loading: bool) {
        *self.loading_audio.write().await = loading;
    }

    pub async fn set_error(&self, message: String) {
        *self.last_error.write().await = Some(message);
    }

    pub async fn clear_error(&self) {
        *self.last_error.write().await = None;
    }

    /// Atomic-enough snapshot for the state endpoint; fields are read in
    /// sequence, which is fine for a UI poll.
    pub async fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            status: self.status().await,
            cursor: self.cursor().await,
            active_verse: self.active_verse().await,
            loading_audio: *self.loading_audio.read().await,
            last_error: self.last_error.read().await.clone(),
        }
    }

    /// Subscribe to the event stream for SSE.
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<ReaderEvent> {
        self.events.subscribe()
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_snapshot_is_idle() {
        let state = SharedState::new();
        let snapshot = state.snapshot().await;
        assert_eq!(snapshot.status, PlaybackState::Idle);
        assert_eq!(snapshot.cursor, 0);
        assert!(snapshot.active_verse.is_none());
        assert!(!snapshot.loading_audio);
        assert!(snapshot.last_error.is_none());
    }

    #[tokio::test]
    async fn test_status_change_emits_event() {
        let state = SharedState::new();
        let mut rx = state.subscribe_events();

        state.set_status(PlaybackState::Loading).await;
        match rx.recv().await.unwrap() {
            ReaderEvent::PlaybackStateChanged {
                old_state,
                new_state,
                ..
            } => {
                assert_eq!(old_state, PlaybackState::Idle);
                assert_eq!(new_state, PlaybackState::Loading);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_redundant_status_change_is_silent() {
        let state = SharedState::new();
        let mut rx = state.subscribe_events();

        state.set_status(PlaybackState::Idle).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_error_persists_until_cleared() {
        let state = SharedState::new();
        state.set_error("audio synth failed".to_string()).await;
        assert_eq!(
            state.snapshot().await.last_error.as_deref(),
            Some("audio synth failed")
        );
        state.clear_error().await;
        assert!(state.snapshot().await.last_error.is_none());
    }
}
