//! Runtime configuration for lectio-rd
//!
//! Merges command-line/environment settings (parsed by clap in main) with
//! the optional TOML config file, following the standard priority order:
//! CLI > environment > config file > compiled default.

use lectio_common::config::{default_data_dir, TomlConfig};
use lectio_common::types::DEFAULT_VOICE_ID;
use std::path::PathBuf;

/// Default HTTP listen port
pub const DEFAULT_PORT: u16 = 5750;

/// Default prefetch lookahead window (verses past the cursor)
pub const DEFAULT_LOOKAHEAD: usize = 2;

/// Bounds for the lookahead window. Smaller windows avoid provider rate
/// limits, larger windows hide more latency.
pub const LOOKAHEAD_MIN: usize = 1;
pub const LOOKAHEAD_MAX: usize = 3;

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    /// Prefetch window, clamped to [LOOKAHEAD_MIN, LOOKAHEAD_MAX]
    pub lookahead: usize,
    pub default_voice: String,
    /// Generative API key; None leaves content requests failing with a
    /// persistent missing-credential error
    pub api_key: Option<String>,
}

impl Config {
    /// Merge CLI/env values (clap already applied env fallbacks) with the
    /// TOML config file.
    pub fn resolve(
        file: &TomlConfig,
        port: Option<u16>,
        data_dir: Option<PathBuf>,
        lookahead: Option<usize>,
        voice: Option<String>,
        api_key: Option<String>,
    ) -> Self {
        let lookahead = lookahead
            .or(file.lookahead)
            .unwrap_or(DEFAULT_LOOKAHEAD)
            .clamp(LOOKAHEAD_MIN, LOOKAHEAD_MAX);

        Self {
            port: port.or(file.port).unwrap_or(DEFAULT_PORT),
            data_dir: data_dir
                .or_else(|| file.data_dir.clone())
                .unwrap_or_else(default_data_dir),
            lookahead,
            default_voice: voice
                .or_else(|| file.default_voice.clone())
                .unwrap_or_else(|| DEFAULT_VOICE_ID.to_string()),
            api_key: api_key.or_else(|| file.api_key.clone()).filter(|k| !k.is_empty()),
        }
    }
}
