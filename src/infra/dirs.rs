//! Platform-specific directory management
//!
//! Resolves where spk keeps its global configuration, and where the AWS CLI
//! keeps its profiles.
//!
//! Environment variables can override default directories:
//! - `SPK_CONFIG_DIR` - Override config directory
//! - `AWS_CONFIG_FILE` - Override the AWS CLI config file

use std::env;
use std::path::PathBuf;

/// Environment variable names for directory overrides
pub const ENV_CONFIG_DIR: &str = "SPK_CONFIG_DIR";
pub const ENV_AWS_CONFIG_FILE: &str = "AWS_CONFIG_FILE";

/// Application name used in directory paths
const APP_NAME: &str = "spk";

/// Platform-specific directory provider for spk
#[derive(Debug, Clone)]
pub struct SpkDirs {
    config_dir: PathBuf,
}

impl SpkDirs {
    /// Create a new `SpkDirs` instance
    ///
    /// Checks environment variables first, then falls back to platform defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config_dir: Self::resolve_config_dir(),
        }
    }

    /// Use an explicit config directory
    #[must_use]
    pub fn with_config_dir(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// Get the config directory path
    ///
    /// - Linux: `$XDG_CONFIG_HOME/spk` or `~/.config/spk`
    /// - macOS: `~/Library/Application Support/spk`
    #[must_use]
    pub fn config_dir(&self) -> PathBuf {
        self.config_dir.clone()
    }

    /// Get the global config file path
    #[must_use]
    pub fn global_config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Path of the AWS CLI config file holding SSO profiles
    #[must_use]
    pub fn aws_config_path() -> Option<PathBuf> {
        if let Ok(path) = env::var(ENV_AWS_CONFIG_FILE) {
            return Some(PathBuf::from(path));
        }
        dirs::home_dir().map(|h| h.join(".aws").join("config"))
    }

    fn resolve_config_dir() -> PathBuf {
        if let Ok(path) = env::var(ENV_CONFIG_DIR) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .map(|p| p.join(APP_NAME))
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".config").join(APP_NAME))
                    .unwrap_or_else(|| PathBuf::from(".").join(".config").join(APP_NAME))
            })
    }
}

impl Default for SpkDirs {
    fn default() -> Self {
        Self::new()
    }
}
