//! # Lectio Common Library
//!
//! Shared code for the Lectio reader service:
//! - Domain types (verses, chapters, voice profiles)
//! - Event types (ReaderEvent enum) and EventBus
//! - Configuration file discovery and data directory resolution
//! - Common error types

pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use error::{Error, Result};
pub use events::{EventBus, PlaybackState, ReaderEvent};
