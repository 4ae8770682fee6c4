//! lectio-rd: Bible reading service
//!
//! Fetches chapter text and per-verse TTS audio from the Gemini API and
//! plays it back verse by verse, exposing an HTTP + SSE control surface
//! for the browser reader.

pub mod api;
pub mod audio;
pub mod config;
pub mod content;
pub mod error;
pub mod gemini;
pub mod playback;
pub mod state;

pub use error::{Error, Result};
pub use state::SharedState;
