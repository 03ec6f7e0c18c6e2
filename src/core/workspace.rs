//! Workspace manifest
//!
//! A workspace is a directory holding `.spk/workspace.json` plus one working
//! copy per managed repository. The manifest records where each repo lives,
//! how to build and test it, and workspace-wide environment overrides.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::config::defaults::{ENV_FILE, MANIFEST_FILE, SPK_DIR};
use crate::core::registry::{Registry, Repository};
use crate::error::WorkspaceError;

/// One repository entry in the manifest
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepoDef {
    /// Clone URL
    pub remote: String,

    /// Working copy path relative to the workspace root
    pub path: String,

    /// Build command override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_command: Option<String>,

    /// Test command override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_command: Option<String>,

    /// Repos that must be built before this one
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,

    /// Branch to sync against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
}

/// The `.spk/workspace.json` manifest
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Workspace {
    /// Workspace name
    pub name: String,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// AWS profile used for secrets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_profile: Option<String>,

    /// AWS region used for secrets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_region: Option<String>,

    /// Managed repositories, keyed by name
    #[serde(default)]
    pub repos: BTreeMap<String, RepoDef>,

    /// Environment overrides applied on top of `.env`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// Workspace-wide branch to sync against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,

    /// SSM environment (`beta`, `prod`) used by `spk env refresh`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssm_env_path: Option<String>,
}

impl Workspace {
    /// Create an in-memory workspace
    pub fn new(
        name: impl Into<String>,
        aws_profile: Option<String>,
        aws_region: Option<String>,
    ) -> Self {
        let mut env = BTreeMap::new();
        if let Some(region) = &aws_region {
            env.insert("AWS_REGION".to_string(), region.clone());
        }
        Self {
            name: name.into(),
            created_at: Utc::now(),
            aws_profile,
            aws_region,
            repos: BTreeMap::new(),
            env,
            default_branch: None,
            ssm_env_path: None,
        }
    }

    /// Parse a manifest from a JSON string
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Initialize a workspace at `root`, failing if one already exists
    pub fn create(
        root: &Path,
        name: impl Into<String>,
        aws_profile: Option<String>,
        aws_region: Option<String>,
    ) -> Result<Self, WorkspaceError> {
        let manifest = manifest_path(root);
        if manifest.exists() {
            return Err(WorkspaceError::AlreadyExists {
                path: root.to_path_buf(),
            });
        }

        let workspace = Self::new(name, aws_profile, aws_region);
        workspace.save(root)?;
        tracing::info!("Created workspace '{}' at {}", workspace.name, root.display());
        Ok(workspace)
    }

    /// Load the manifest of the workspace rooted at `root`
    pub fn load(root: &Path) -> Result<Self, WorkspaceError> {
        let path = manifest_path(root);
        let content = fs::read_to_string(&path).map_err(|e| WorkspaceError::ReadError {
            path: path.clone(),
            error: e.to_string(),
        })?;
        Self::from_json(&content).map_err(|e| WorkspaceError::ParseError {
            path,
            error: e.to_string(),
        })
    }

    /// Write the manifest under `root`, creating `.spk/` if needed
    pub fn save(&self, root: &Path) -> Result<(), WorkspaceError> {
        let path = manifest_path(root);
        let write_error = |e: &dyn std::fmt::Display| WorkspaceError::WriteError {
            path: path.clone(),
            error: e.to_string(),
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| write_error(&e))?;
        }
        let content = self.to_json().map_err(|e| write_error(&e))?;
        fs::write(&path, content).map_err(|e| write_error(&e))
    }

    /// Register a repo, replacing any entry with the same name
    pub fn add_repo(&mut self, name: impl Into<String>, repo: RepoDef) {
        self.repos.insert(name.into(), repo);
    }

    /// Unregister a repo
    pub fn remove_repo(&mut self, name: &str) -> Result<RepoDef, WorkspaceError> {
        self.repos
            .remove(name)
            .ok_or_else(|| WorkspaceError::RepoNotFound {
                name: name.to_string(),
            })
    }

    /// Look up a repo entry
    pub fn repo(&self, name: &str) -> Result<&RepoDef, WorkspaceError> {
        self.repos
            .get(name)
            .ok_or_else(|| WorkspaceError::RepoNotFound {
                name: name.to_string(),
            })
    }

    /// Absolute working copy path of a repo, refusing paths outside `root`
    pub fn repo_dir(&self, root: &Path, name: &str) -> Result<PathBuf, WorkspaceError> {
        let def = self.repo(name)?;
        let relative = Path::new(&def.path);
        if escapes_root(relative) {
            return Err(WorkspaceError::PathEscapesWorkspace {
                path: relative.to_path_buf(),
            });
        }
        Ok(root.join(relative))
    }

    /// Build the in-memory registry for this workspace
    ///
    /// Entries whose path would leave the workspace are skipped with a
    /// warning.
    pub fn registry(&self, root: &Path) -> Registry {
        let mut registry = Registry::new();
        for (name, def) in &self.repos {
            let Ok(location) = self.repo_dir(root, name) else {
                tracing::warn!("Ignoring repo '{}': path '{}' escapes the workspace", name, def.path);
                continue;
            };
            let mut repo = Repository::new(name, location).with_dependencies(&def.dependencies);
            repo.build_command.clone_from(&def.build_command);
            repo.test_command.clone_from(&def.test_command);
            repo.default_branch.clone_from(&def.default_branch);
            registry.register(repo);
        }
        registry
    }

    /// Path of the editor workspace file for this workspace
    pub fn code_workspace_path(&self, root: &Path) -> PathBuf {
        root.join(format!("{}.code-workspace", self.name))
    }

    /// Editor workspace document listing every repo folder
    pub fn code_workspace(&self) -> serde_json::Value {
        let folders: Vec<serde_json::Value> = self
            .repos
            .values()
            .map(|def| serde_json::json!({ "path": def.path }))
            .collect();
        serde_json::json!({ "folders": folders })
    }

    /// Write the editor workspace file
    pub fn write_code_workspace(&self, root: &Path) -> Result<PathBuf, WorkspaceError> {
        let path = self.code_workspace_path(root);
        let content = serde_json::to_string_pretty(&self.code_workspace()).map_err(|e| {
            WorkspaceError::WriteError {
                path: path.clone(),
                error: e.to_string(),
            }
        })?;
        fs::write(&path, content).map_err(|e| WorkspaceError::WriteError {
            path: path.clone(),
            error: e.to_string(),
        })?;
        Ok(path)
    }
}

/// Path of `.spk/workspace.json` under `root`
pub fn manifest_path(root: &Path) -> PathBuf {
    root.join(SPK_DIR).join(MANIFEST_FILE)
}

/// Path of the workspace-wide `.env`
pub fn env_path(root: &Path) -> PathBuf {
    root.join(ENV_FILE)
}

/// Walk up from `start` to the nearest directory holding a manifest
pub fn find_root(start: &Path) -> Result<PathBuf, WorkspaceError> {
    start
        .ancestors()
        .find(|dir| manifest_path(dir).is_file())
        .map(Path::to_path_buf)
        .ok_or_else(|| WorkspaceError::NotFound {
            start: start.to_path_buf(),
        })
}

/// True if a relative repo path is absolute, climbs out of its root, or
/// names the root itself
fn escapes_root(path: &Path) -> bool {
    let mut named = false;
    for component in path.components() {
        match component {
            Component::Normal(_) => named = true,
            Component::CurDir => {}
            _ => return true,
        }
    }
    !named
}
