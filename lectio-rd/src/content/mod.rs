//! Chapter content persistence

pub mod store;

pub use store::ChapterStore;
