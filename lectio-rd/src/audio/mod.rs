//! Audio pipeline for lectio-rd
//!
//! Decoding of provider PCM payloads into normalized f32 sample buffers and
//! delivery to the output device through the [`AudioSink`] trait.

pub mod decoder;
pub mod output;
pub mod types;

pub use decoder::decode_pcm16;
pub use output::{completion_pair, AudioSink, Completion, CompletionSignal, CpalSink};
pub use types::{VerseAudio, CHANNELS, SAMPLE_RATE};
