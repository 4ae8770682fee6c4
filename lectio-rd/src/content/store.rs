//! On-disk chapter cache
//!
//! Fetched chapter text is stored as one JSON file per chapter so a book
//! can be re-read offline and without repeating provider calls. Entries
//! are versioned by key prefix; a format change bumps the prefix and old
//! entries simply stop being found.

use crate::error::{Error, Result};
use lectio_common::types::ChapterContent;
use std::path::{Path, PathBuf};

const KEY_VERSION: &str = "v1";

pub struct ChapterStore {
    dir: PathBuf,
}

impl ChapterStore {
    /// Open the store under `data_dir/chapters`, creating it if needed.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let dir = data_dir.join("chapters");
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, book: &str, chapter: u32) -> PathBuf {
        self.dir
            .join(format!("{}_{}_{}.json", KEY_VERSION, sanitize(book), chapter))
    }

    /// Load a cached chapter. A corrupt entry is removed and reported as
    /// absent so the caller re-fetches.
    pub fn load(&self, book: &str, chapter: u32) -> Option<ChapterContent> {
        let path = self.path_for(book, chapter);
        let bytes = std::fs::read(&path).ok()?;
        match serde_json::from_slice::<ChapterContent>(&bytes) {
            Ok(content) if content.validate().is_ok() => Some(content),
            _ => {
                tracing::warn!(path = %path.display(), "removing corrupt chapter entry");
                let _ = std::fs::remove_file(&path);
                None
            }
        }
    }

    pub fn save(&self, content: &ChapterContent) -> Result<()> {
        let path = self.path_for(&content.book, content.chapter);
        let bytes = serde_json::to_vec_pretty(content)
            .map_err(|e| Error::Internal(format!("chapter serialization failed: {}", e)))?;
        std::fs::write(&path, bytes)?;
        tracing::debug!(book = %content.book, chapter = content.chapter, "chapter cached");
        Ok(())
    }
}

/// Keys must be filesystem-safe across platforms; book names come from
/// request paths.
fn sanitize(book: &str) -> String {
    book.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}
