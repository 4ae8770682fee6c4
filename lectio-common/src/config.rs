//! Configuration file discovery and data directory resolution
//!
//! Resolution priority, highest first:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Optional settings read from the TOML config file.
///
/// Every field is optional; missing files or fields fall back to defaults
/// and never prevent startup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// HTTP listen port
    pub port: Option<u16>,
    /// Data directory (chapter store lives underneath)
    pub data_dir: Option<PathBuf>,
    /// Prefetch lookahead window (1-3)
    pub lookahead: Option<usize>,
    /// Default synthesis voice id
    pub default_voice: Option<String>,
    /// Generative API key (environment variable takes precedence)
    pub api_key: Option<String>,
}

impl TomlConfig {
    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Load from the default config file location, falling back to defaults
    /// on any failure (missing or unparsable files log a warning and never
    /// abort startup).
    pub fn load_default() -> Self {
        let Some(path) = config_file_path() else {
            return Self::default();
        };
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

/// Locate the config file for the current platform, if one exists.
///
/// Linux checks `~/.config/lectio/config.toml` then `/etc/lectio/config.toml`;
/// other platforms use the per-user config directory.
pub fn config_file_path() -> Option<PathBuf> {
    if let Some(user_config) = dirs::config_dir().map(|d| d.join("lectio").join("config.toml")) {
        if user_config.exists() {
            return Some(user_config);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/lectio/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default data directory.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("lectio"))
        .unwrap_or_else(|| PathBuf::from("./lectio_data"))
}

/// Resolve the data directory following the standard priority order.
///
/// The environment variable is named by `env_var` so the caller controls
/// the prefix; clap handles CLI/env merging for most settings, but the data
/// directory is also resolvable without clap (used by tests and tools).
pub fn resolve_data_dir(cli_arg: Option<&Path>, env_var: &str, file: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var(env_var) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    if let Some(path) = &file.data_dir {
        return path.clone();
    }
    default_data_dir()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    const TEST_ENV: &str = "LECTIO_TEST_DATA_DIR";

    #[test]
    fn test_default_data_dir_non_empty() {
        assert!(!default_data_dir().as_os_str().is_empty());
    }

    #[test]
    #[serial]
    fn test_resolve_priority_cli_wins() {
        std::env::set_var(TEST_ENV, "/tmp/lectio-env");
        let file = TomlConfig {
            data_dir: Some(PathBuf::from("/tmp/lectio-file")),
            ..Default::default()
        };
        let resolved = resolve_data_dir(Some(Path::new("/tmp/lectio-cli")), TEST_ENV, &file);
        assert_eq!(resolved, PathBuf::from("/tmp/lectio-cli"));
        std::env::remove_var(TEST_ENV);
    }

    #[test]
    #[serial]
    fn test_resolve_priority_env_over_file() {
        std::env::set_var(TEST_ENV, "/tmp/lectio-env");
        let file = TomlConfig {
            data_dir: Some(PathBuf::from("/tmp/lectio-file")),
            ..Default::default()
        };
        let resolved = resolve_data_dir(None, TEST_ENV, &file);
        assert_eq!(resolved, PathBuf::from("/tmp/lectio-env"));
        std::env::remove_var(TEST_ENV);
    }

    #[test]
    #[serial]
    fn test_resolve_priority_file_over_default() {
        std::env::remove_var(TEST_ENV);
        let file = TomlConfig {
            data_dir: Some(PathBuf::from("/tmp/lectio-file")),
            ..Default::default()
        };
        let resolved = resolve_data_dir(None, TEST_ENV, &file);
        assert_eq!(resolved, PathBuf::from("/tmp/lectio-file"));
    }

    #[test]
    fn test_toml_parse() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "port = 6000\nlookahead = 3\ndefault_voice = \"Kore\""
        )
        .unwrap();
        let config = TomlConfig::load_from(file.path()).unwrap();
        assert_eq!(config.port, Some(6000));
        assert_eq!(config.lookahead, Some(3));
        assert_eq!(config.default_voice.as_deref(), Some("Kore"));
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_toml_parse_error_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number").unwrap();
        assert!(TomlConfig::load_from(file.path()).is_err());
    }
}
