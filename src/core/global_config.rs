//! Global configuration management
//!
//! Reads and manages per-user settings from `config.toml` in the config
//! directory: the default GitHub org used to expand bare repo names, default
//! AWS settings for new workspaces, and the list of known workspaces.

use crate::config::defaults::{DEFAULT_AWS_REGION, DEFAULT_GITHUB_ORG};
use crate::infra::dirs::SpkDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Global configuration error types
#[derive(Error, Debug)]
pub enum GlobalConfigError {
    /// Failed to read config file
    #[error("Failed to read config file '{path}': {error}")]
    ReadError { path: String, error: String },

    /// Failed to parse config file
    #[error("Failed to parse config file '{path}': {error}")]
    ParseError { path: String, error: String },

    /// Unknown key passed to `spk config set`
    #[error("Unknown config key '{key}'. Valid keys: github_org, aws_profile, aws_region")]
    UnknownKey { key: String },
}

/// Global configuration for spk
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GlobalConfig {
    /// Defaults applied to new workspaces and bare repo names
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Known workspaces
    #[serde(default)]
    pub workspaces: WorkspacesConfig,
}

/// User defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DefaultsConfig {
    /// GitHub org used when a repo is given without one
    pub github_org: Option<String>,

    /// AWS profile for new workspaces
    pub aws_profile: Option<String>,

    /// AWS region for new workspaces
    pub aws_region: Option<String>,
}

/// Workspaces created on this machine
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkspacesConfig {
    /// Workspace root paths, in registration order
    #[serde(default)]
    pub paths: Vec<String>,
}

impl GlobalConfig {
    /// Load global configuration from the config directory
    ///
    /// If the config file doesn't exist, returns default configuration.
    pub fn load(dirs: &SpkDirs) -> Result<Self, GlobalConfigError> {
        Self::load_from_path(&dirs.global_config_path())
    }

    /// Load global configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, GlobalConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| GlobalConfigError::ReadError {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| GlobalConfigError::ParseError {
            path: path.display().to_string(),
            error: e.to_string(),
        })
    }

    /// Save global configuration to the config directory
    pub fn save(&self, dirs: &SpkDirs) -> Result<(), GlobalConfigError> {
        self.save_to_path(&dirs.global_config_path())
    }

    /// Save global configuration to a specific path
    ///
    /// Creates parent directories if they don't exist.
    pub fn save_to_path(&self, path: &Path) -> Result<(), GlobalConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| GlobalConfigError::ReadError {
                path: parent.display().to_string(),
                error: e.to_string(),
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| GlobalConfigError::ParseError {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        fs::write(path, content).map_err(|e| GlobalConfigError::ReadError {
            path: path.display().to_string(),
            error: e.to_string(),
        })
    }

    /// Effective GitHub org
    #[must_use]
    pub fn github_org(&self) -> &str {
        self.defaults
            .github_org
            .as_deref()
            .unwrap_or(DEFAULT_GITHUB_ORG)
    }

    /// Effective AWS region
    #[must_use]
    pub fn aws_region(&self) -> &str {
        self.defaults
            .aws_region
            .as_deref()
            .unwrap_or(DEFAULT_AWS_REGION)
    }

    /// Remember a workspace root; returns false if it was already known
    pub fn register_workspace(&mut self, root: &Path) -> bool {
        let root = root.display().to_string();
        if self.workspaces.paths.contains(&root) {
            return false;
        }
        self.workspaces.paths.push(root);
        true
    }

    /// Set one of the user defaults by key
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), GlobalConfigError> {
        let slot = match key {
            "github_org" => &mut self.defaults.github_org,
            "aws_profile" => &mut self.defaults.aws_profile,
            "aws_region" => &mut self.defaults.aws_region,
            _ => {
                return Err(GlobalConfigError::UnknownKey {
                    key: key.to_string(),
                })
            }
        };
        *slot = if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        };
        Ok(())
    }
}
