//! Engine configuration.
//!
//! Loaded from a TOML file when one is given, otherwise defaults.
//! The state directory can additionally be overridden with the
//! `VIGIL_STATE_DIR` environment variable, which wins over both.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::debounce::{DEFAULT_TTL_MS, DEFAULT_WINDOW_MS};

/// Default number of leaderboard rows.
pub const DEFAULT_LEADERBOARD_SIZE: usize = 10;

/// Environment variable overriding the state directory.
pub const STATE_DIR_ENV: &str = "VIGIL_STATE_DIR";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Engine configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VigilConfig {
    /// Directory for the JSON document store.
    pub state_dir: PathBuf,

    /// Process-wide default notification destination.
    pub default_destination: Option<String>,

    /// Debounce trailing window in milliseconds.
    pub debounce_window_ms: u64,

    /// Debounce entry TTL in milliseconds.
    pub debounce_ttl_ms: u64,

    /// Number of rows returned by the leaderboard by default.
    pub leaderboard_size: usize,
}

impl Default for VigilConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            default_destination: None,
            debounce_window_ms: DEFAULT_WINDOW_MS,
            debounce_ttl_ms: DEFAULT_TTL_MS,
            leaderboard_size: DEFAULT_LEADERBOARD_SIZE,
        }
    }
}

impl VigilConfig {
    /// Loads configuration from an optional TOML file and applies the
    /// environment override for the state directory.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            None => Self::default(),
        };

        if let Some(dir) = std::env::var_os(STATE_DIR_ENV) {
            config.state_dir = PathBuf::from(dir);
        }

        Ok(config)
    }
}

/// Default state directory: `$XDG_STATE_HOME/vigil` (or `/tmp/vigil`).
fn default_state_dir() -> PathBuf {
    dirs::state_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("vigil")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = VigilConfig::default();
        assert_eq!(config.debounce_window_ms, 1_000);
        assert_eq!(config.debounce_ttl_ms, 10_000);
        assert_eq!(config.leaderboard_size, 10);
        assert!(config.default_destination.is_none());
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = NamedTempFile::new().expect("tempfile");
        writeln!(
            file,
            r#"
state_dir = "/var/lib/vigil"
default_destination = "general"
debounce_window_ms = 2000
leaderboard_size = 5
"#
        )
        .expect("write");

        let config = VigilConfig::load(Some(file.path())).expect("load");
        assert_eq!(config.state_dir, PathBuf::from("/var/lib/vigil"));
        assert_eq!(config.default_destination.as_deref(), Some("general"));
        assert_eq!(config.debounce_window_ms, 2_000);
        // Unset keys keep their defaults.
        assert_eq!(config.debounce_ttl_ms, 10_000);
        assert_eq!(config.leaderboard_size, 5);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let mut file = NamedTempFile::new().expect("tempfile");
        writeln!(file, "no_such_key = true").expect("write");

        let result = VigilConfig::load(Some(file.path()));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = VigilConfig::load(Some(Path::new("/nonexistent/vigil.toml")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
