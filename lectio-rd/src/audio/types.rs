//! Decoded audio buffer types

use std::sync::Arc;

/// Sample rate of provider TTS output (Hz)
pub const SAMPLE_RATE: u32 = 24_000;

/// Channel count of provider TTS output (mono)
pub const CHANNELS: u16 = 1;

/// A fully decoded verse utterance, ready for the output device.
///
/// Buffers are shared via `Arc<VerseAudio>` between the cache, the prefetch
/// window and the sink; nothing mutates samples after decode.
#[derive(Debug, Clone)]
pub struct VerseAudio {
    /// Interleaved f32 samples in [-1.0, 1.0]
    pub samples: Arc<Vec<f32>>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl VerseAudio {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: Arc::new(samples),
            sample_rate,
            channels,
        }
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    /// Playback duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.frames() as u64 * 1000) / self.sample_rate as u64
    }
}
