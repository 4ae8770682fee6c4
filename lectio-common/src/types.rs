//! Domain types for the Lectio reader
//!
//! Verse and chapter content as returned by the generative text service,
//! plus the catalog of prebuilt synthesis voices.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// A single verse within a chapter.
///
/// Verses are immutable once fetched. Sequencing is by position in the
/// chapter's verse list, not by `number`; numbers are display labels and
/// may skip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    /// Display verse number (>= 1, may be non-contiguous)
    pub number: u32,
    /// Verse text
    pub text: String,
}

/// A fetched chapter: verse list plus an optional theological summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterContent {
    /// Book name as requested (e.g. "Genesis")
    pub book: String,
    /// Chapter number (1-based)
    pub chapter: u32,
    /// Ordered verse list (sequencing is by index)
    pub verses: Vec<Verse>,
    /// Brief chapter summary from the text model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl ChapterContent {
    /// Structural validation: a chapter must carry at least one verse.
    ///
    /// The generative service occasionally returns well-formed JSON with an
    /// empty verse list; such responses are rejected (and retried upstream).
    pub fn validate(&self) -> Result<()> {
        if self.verses.is_empty() {
            return Err(Error::InvalidInput(format!(
                "chapter {} {} has no verses",
                self.book, self.chapter
            )));
        }
        Ok(())
    }
}

/// Voice gender label, for display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceGender {
    Male,
    Female,
}

/// A prebuilt synthesis voice.
///
/// Changing the selected voice invalidates all cached audio, since
/// synthesized speech is voice-specific.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceProfile {
    /// Provider voice identifier (passed to the TTS call)
    pub id: String,
    /// Display name
    pub name: String,
    pub gender: VoiceGender,
    /// Short style description ("warm", "bright", ...)
    pub style: String,
}

impl VoiceProfile {
    fn new(id: &str, name: &str, gender: VoiceGender, style: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            gender,
            style: style.to_string(),
        }
    }
}

/// Identifier of the default voice used when none is configured.
pub const DEFAULT_VOICE_ID: &str = "Puck";

/// Catalog of available prebuilt voices.
pub fn voice_catalog() -> &'static [VoiceProfile] {
    static CATALOG: OnceLock<Vec<VoiceProfile>> = OnceLock::new();
    CATALOG.get_or_init(|| {
        vec![
            VoiceProfile::new("Puck", "Puck", VoiceGender::Male, "lively"),
            VoiceProfile::new("Charon", "Charon", VoiceGender::Male, "informative"),
            VoiceProfile::new("Kore", "Kore", VoiceGender::Female, "firm"),
            VoiceProfile::new("Zephyr", "Zephyr", VoiceGender::Female, "bright"),
            VoiceProfile::new("Fenrir", "Fenrir", VoiceGender::Male, "excitable"),
            VoiceProfile::new("Aoede", "Aoede", VoiceGender::Female, "breezy"),
        ]
    })
}

/// Look up a voice by its provider identifier.
pub fn find_voice(id: &str) -> Option<&'static VoiceProfile> {
    voice_catalog().iter().find(|v| v.id == id)
}

/// The default voice profile.
pub fn default_voice() -> &'static VoiceProfile {
    find_voice(DEFAULT_VOICE_ID).expect("default voice present in catalog")
}
