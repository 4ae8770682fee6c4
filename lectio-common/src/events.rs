//! Event types for the Lectio event system
//!
//! Provides the shared event definitions and EventBus used for SSE fan-out
//! and internal coordination.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Playback status of the verse sequencer.
///
/// Exactly one value holds at any instant; UI highlight and control
/// affordances are a pure function of this value plus the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// Nothing sounding, no pending work
    Idle,
    /// Awaiting fetch/decode of the verse about to play
    Loading,
    /// A verse buffer is sounding
    Playing,
    /// Hard-stopped mid-chapter; cursor preserved for resume
    Paused,
    /// Unrecoverable playback failure (transient; settles to Idle)
    Error,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Loading => "loading",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Error => "error",
        };
        f.write_str(s)
    }
}

/// Lectio event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReaderEvent {
    /// Playback state changed
    ///
    /// Triggers:
    /// - SSE: update play/pause controls
    PlaybackStateChanged {
        /// State before change
        old_state: PlaybackState,
        /// State after change
        new_state: PlaybackState,
        /// When state changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A chapter's verse list was loaded into the sequencer
    ///
    /// Triggers:
    /// - SSE: render new chapter, reset highlight
    ChapterLoaded {
        book: String,
        chapter: u32,
        verse_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A verse buffer started sounding
    ///
    /// Triggers:
    /// - SSE: highlight verse, auto-scroll if off-screen
    VerseStarted {
        /// Position in the chapter's verse list
        index: usize,
        /// Display verse number
        number: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A verse buffer reached its natural end
    VerseCompleted {
        index: usize,
        number: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The last verse of the chapter completed naturally
    ///
    /// Triggers:
    /// - SSE: clear highlight, reset play button
    ChapterCompleted {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The selected synthesis voice changed (cached audio was discarded)
    VoiceChanged {
        voice_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback failed on the verse being awaited
    ///
    /// Prefetch failures are never surfaced this way; only the verse
    /// actually being awaited for playback produces a visible error.
    PlaybackError {
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl ReaderEvent {
    /// Event type name used as the SSE `event:` field.
    pub fn event_type(&self) -> &'static str {
        match self {
            ReaderEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            ReaderEvent::ChapterLoaded { .. } => "ChapterLoaded",
            ReaderEvent::VerseStarted { .. } => "VerseStarted",
            ReaderEvent::VerseCompleted { .. } => "VerseCompleted",
            ReaderEvent::ChapterCompleted { .. } => "ChapterCompleted",
            ReaderEvent::VoiceChanged { .. } => "VoiceChanged",
            ReaderEvent::PlaybackError { .. } => "PlaybackError",
        }
    }
}

/// Broadcast event bus for one-to-many event delivery.
///
/// Thin wrapper over `tokio::sync::broadcast` so emitters don't have to
/// care whether anyone is listening.
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<ReaderEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<ReaderEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, returning an error if there are no subscribers.
    pub fn emit(&self, event: ReaderEvent) -> Result<usize, broadcast::error::SendError<ReaderEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the no-subscribers case.
    pub fn emit_lossy(&self, event: ReaderEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}
