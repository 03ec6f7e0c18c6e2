//! Repository synchronization
//!
//! Brings clean working copies up to date with their remote branch. Dirty
//! working copies are fetched but never rebased or stashed.

use std::fmt;
use std::path::Path;

use crate::config::defaults::DEFAULT_BRANCH;
use crate::core::registry::{Registry, Repository};
use crate::infra::git::GitError;

/// Git operations used by sync, use and list
pub trait GitClient {
    /// True if `dir` is the root of a git working copy
    fn is_repo(&self, dir: &Path) -> bool;

    /// Clone `url` into `dest`
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), GitError>;

    /// Short name of the checked out branch (`HEAD` when detached)
    fn current_branch(&self, dir: &Path) -> Result<String, GitError>;

    /// Branch the remote's `HEAD` points at, if known
    fn default_branch(&self, dir: &Path) -> Option<String>;

    /// Short status, one line per changed path
    fn status(&self, dir: &Path) -> Result<String, GitError>;

    /// True if the working copy has uncommitted changes
    fn is_dirty(&self, dir: &Path) -> Result<bool, GitError> {
        Ok(!self.status(dir)?.trim().is_empty())
    }

    /// Fetch from `remote`
    fn fetch(&self, dir: &Path, remote: &str) -> Result<(), GitError>;

    /// Rebase the current branch onto `upstream`
    fn rebase(&self, dir: &Path, upstream: &str) -> Result<(), GitError>;

    /// Abort an in-progress rebase
    fn abort_rebase(&self, dir: &Path) -> Result<(), GitError>;

    /// Pull without rebasing
    fn pull(&self, dir: &Path) -> Result<(), GitError>;
}

/// Options for a sync run
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Branch to sync against, overriding all configured defaults
    pub branch: Option<String>,
    /// Merge with `pull` instead of rebasing
    pub no_rebase: bool,
}

/// What happened to one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// Fetched and rebased (or pulled)
    UpToDate { branch: String },
    /// Working copy missing
    NotCloned,
    /// Local changes present; fetched only
    Dirty { status: String },
    /// A git step failed
    Failed { error: String },
}

impl SyncStatus {
    /// True if the repo was brought up to date
    pub fn is_synced(&self) -> bool {
        matches!(self, Self::UpToDate { .. })
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpToDate { branch } => write!(f, "up to date with origin/{branch}"),
            Self::NotCloned => f.write_str("not cloned"),
            Self::Dirty { .. } => f.write_str("local changes, skipped rebase"),
            Self::Failed { error } => f.write_str(error),
        }
    }
}

/// State of a working copy as shown by `spk list`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkingCopyState {
    /// Directory does not exist
    Missing,
    /// Directory exists but is not a git checkout
    NotGit,
    /// No local changes
    Clean,
    /// Uncommitted changes
    Dirty,
}

impl fmt::Display for WorkingCopyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Missing => "missing",
            Self::NotGit => "not-git",
            Self::Clean => "clean",
            Self::Dirty => "dirty",
        })
    }
}

/// Classify the working copy at `dir`
///
/// A status that cannot be read counts as dirty.
pub fn working_copy_state<G: GitClient>(git: &G, dir: &Path) -> WorkingCopyState {
    if !dir.exists() {
        WorkingCopyState::Missing
    } else if !git.is_repo(dir) {
        WorkingCopyState::NotGit
    } else if git.is_dirty(dir).unwrap_or(true) {
        WorkingCopyState::Dirty
    } else {
        WorkingCopyState::Clean
    }
}

/// Branch to sync against
///
/// Explicit flag, then the repo's default, then the workspace default,
/// then the remote `HEAD`, then `main`.
pub fn target_branch<G: GitClient>(
    git: &G,
    repo: &Repository,
    workspace_branch: Option<&str>,
    requested: Option<&str>,
) -> String {
    requested
        .or(repo.default_branch.as_deref())
        .or(workspace_branch)
        .map(str::to_string)
        .or_else(|| git.default_branch(&repo.location))
        .unwrap_or_else(|| DEFAULT_BRANCH.to_string())
}

/// Sync one repository
pub fn sync_repo<G: GitClient>(
    git: &G,
    repo: &Repository,
    workspace_branch: Option<&str>,
    options: &SyncOptions,
) -> SyncStatus {
    if !repo.location.exists() {
        return SyncStatus::NotCloned;
    }

    let status = match git.status(&repo.location) {
        Ok(status) => status,
        Err(err) => return SyncStatus::Failed { error: err.to_string() },
    };
    if !status.trim().is_empty() {
        // Refresh remote refs so `git status` reports how far behind we are
        if let Err(err) = git.fetch(&repo.location, "origin") {
            tracing::warn!("Fetch failed for {}: {}", repo.name, err);
        }
        return SyncStatus::Dirty { status };
    }

    let branch = target_branch(git, repo, workspace_branch, options.branch.as_deref());

    if options.no_rebase {
        return match git.pull(&repo.location) {
            Ok(()) => SyncStatus::UpToDate { branch },
            Err(err) => SyncStatus::Failed { error: err.to_string() },
        };
    }

    if let Err(err) = git.fetch(&repo.location, "origin") {
        return SyncStatus::Failed {
            error: format!("fetch failed: {err}"),
        };
    }

    let upstream = format!("origin/{branch}");
    if let Err(err) = git.rebase(&repo.location, &upstream) {
        tracing::debug!("Rebase of {} failed: {}", repo.name, err);
        if let Err(abort) = git.abort_rebase(&repo.location) {
            tracing::warn!("Could not abort rebase in {}: {}", repo.name, abort);
        }
        return SyncStatus::Failed {
            error: format!("rebase onto {upstream} failed"),
        };
    }

    SyncStatus::UpToDate { branch }
}

/// Sync every registered repository in name order
pub fn sync_all<G: GitClient>(
    git: &G,
    registry: &Registry,
    workspace_branch: Option<&str>,
    options: &SyncOptions,
) -> Vec<(String, SyncStatus)> {
    let mut names: Vec<&str> = registry.names().collect();
    names.sort_unstable();

    names
        .into_iter()
        .filter_map(|name| registry.get(name))
        .map(|repo| {
            let status = sync_repo(git, repo, workspace_branch, options);
            (repo.name.clone(), status)
        })
        .collect()
}
