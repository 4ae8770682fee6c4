//! HTTP control surface
//!
//! REST endpoints for chapter content and playback control plus an SSE
//! stream of reader events. CORS is wide open; the browser UI is served
//! from a different origin during development.

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{create_router, AppContext};
