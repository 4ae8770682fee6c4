//! Playback engine
//!
//! The sequencer walks a chapter verse by verse, fetching audio through the
//! deduplicating cache and feeding it to the output sink. The prefetcher
//! warms the cache ahead of the cursor so verse boundaries are gapless.

pub mod cache;
pub mod prefetch;
pub mod sequencer;

pub use cache::VerseCache;
pub use prefetch::Prefetcher;
pub use sequencer::Sequencer;
