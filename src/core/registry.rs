//! Repository registry
//!
//! In-memory view of the repositories a workspace manages: where each
//! working copy lives and which other repositories must be built first.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// One managed repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    /// Unique name, used as the graph node key
    pub name: String,
    /// Absolute path of the working copy
    pub location: PathBuf,
    /// Repositories that must be built before this one
    pub explicit_dependencies: BTreeSet<String>,
    /// Build command override from the manifest
    pub build_command: Option<String>,
    /// Test command override from the manifest
    pub test_command: Option<String>,
    /// Branch to sync against, if pinned for this repo
    pub default_branch: Option<String>,
}

impl Repository {
    /// Create a repository with no dependencies or overrides
    pub fn new(name: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            explicit_dependencies: BTreeSet::new(),
            build_command: None,
            test_command: None,
            default_branch: None,
        }
    }

    /// Declare repositories that must be built first
    #[must_use]
    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.explicit_dependencies
            .extend(deps.into_iter().map(Into::into));
        self
    }

    /// Override the build command
    #[must_use]
    pub fn with_build_command(mut self, command: impl Into<String>) -> Self {
        self.build_command = Some(command.into());
        self
    }

    /// Override the test command
    #[must_use]
    pub fn with_test_command(mut self, command: impl Into<String>) -> Self {
        self.test_command = Some(command.into());
        self
    }

    /// Path of the working copy
    pub fn location(&self) -> &Path {
        &self.location
    }
}

/// The set of registered repositories, keyed by name
#[derive(Debug, Clone, Default)]
pub struct Registry {
    repos: BTreeMap<String, Repository>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a repository, replacing any previous entry with the same name
    pub fn register(&mut self, repo: Repository) {
        self.repos.insert(repo.name.clone(), repo);
    }

    /// Unregister a repository
    pub fn unregister(&mut self, name: &str) -> Option<Repository> {
        self.repos.remove(name)
    }

    /// Look up a repository by name
    pub fn get(&self, name: &str) -> Option<&Repository> {
        self.repos.get(name)
    }

    /// Check whether a name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.repos.contains_key(name)
    }

    /// All registered repositories
    ///
    /// Iteration happens to be name-ordered, but build ordering never
    /// depends on it; the planner sorts its own frontier.
    pub fn all(&self) -> impl Iterator<Item = &Repository> {
        self.repos.values()
    }

    /// Registered names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.repos.keys().map(String::as_str)
    }

    /// Number of registered repositories
    pub fn len(&self) -> usize {
        self.repos.len()
    }

    /// True if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    /// Find the repository whose working copy contains `dir`
    pub fn containing(&self, dir: &Path) -> Option<&Repository> {
        self.repos.values().find(|repo| dir.starts_with(&repo.location))
    }
}

impl FromIterator<Repository> for Registry {
    fn from_iter<T: IntoIterator<Item = Repository>>(iter: T) -> Self {
        let mut registry = Self::new();
        for repo in iter {
            registry.register(repo);
        }
        registry
    }
}
