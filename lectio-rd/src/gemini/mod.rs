//! Generative API client
//!
//! Thin REST glue for the Gemini API: structured chapter text, per-verse
//! TTS synthesis, assistant answers and cover image generation. All
//! provider-shape knowledge lives here; the rest of the service sees
//! domain types and raw PCM bytes.

pub mod client;
pub mod types;

pub use client::GeminiClient;

use crate::error::Result;
use futures::future::BoxFuture;

/// Source of raw verse audio, the seam the playback cache fetches through.
///
/// Returns raw PCM16-LE bytes for the given verse text and voice. Futures
/// are `'static` so the cache can share them between concurrent callers.
pub trait VerseAudioSource: Send + Sync {
    fn verse_audio(&self, text: &str, voice_id: &str) -> BoxFuture<'static, Result<Vec<u8>>>;
}
