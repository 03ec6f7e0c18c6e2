//! Git operations
//!
//! Clones and branch lookups go through the gix crate. Fetch, rebase, pull
//! and status shell out to `git` so they honour the user's credential
//! helpers, hooks and merge configuration.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use thiserror::Error;

use crate::config::defaults::MAX_FETCH_ATTEMPTS;
use crate::core::sync::GitClient;

/// Git operation errors
#[derive(Error, Debug)]
pub enum GitError {
    /// Failed to clone repository
    #[error("Failed to clone '{url}': {error}")]
    CloneFailed { url: String, error: String },

    /// A git subcommand exited unsuccessfully
    #[error("'{command}' failed in '{dir}': {error}")]
    CommandFailed {
        command: String,
        dir: PathBuf,
        error: String,
    },

    /// The git executable is not installed
    #[error("git not found on PATH")]
    NotInstalled,

    /// IO error
    #[error("IO error for '{path}': {error}")]
    IoError { path: PathBuf, error: String },

    /// Invalid repository
    #[error("Invalid repository at '{path}': {error}")]
    InvalidRepository { path: PathBuf, error: String },
}

/// Git client backed by gix and the `git` executable
#[derive(Debug, Clone)]
pub struct GitCli {
    max_fetch_attempts: u32,
    initial_retry_delay: Duration,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl GitCli {
    /// Create a client with the default retry policy
    pub fn new() -> Self {
        Self {
            max_fetch_attempts: MAX_FETCH_ATTEMPTS,
            initial_retry_delay: Duration::from_millis(500),
        }
    }

    /// Create a client with a custom retry policy
    pub fn with_retry(max_fetch_attempts: u32, initial_retry_delay: Duration) -> Self {
        Self {
            max_fetch_attempts: max_fetch_attempts.max(1),
            initial_retry_delay,
        }
    }

    /// True if the git executable is available
    pub fn is_installed() -> bool {
        which::which("git").is_ok()
    }

    /// Run a git subcommand in `dir`, returning trimmed stdout
    fn git(&self, dir: &Path, args: &[&str]) -> Result<String, GitError> {
        let command = format!("git {}", args.join(" "));
        tracing::debug!("Running '{}' in {}", command, dir.display());

        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    GitError::NotInstalled
                } else {
                    GitError::IoError {
                        path: dir.to_path_buf(),
                        error: e.to_string(),
                    }
                }
            })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
        } else {
            Err(GitError::CommandFailed {
                command,
                dir: dir.to_path_buf(),
                error: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    fn open(dir: &Path) -> Result<gix::Repository, GitError> {
        gix::open(dir).map_err(|e| GitError::InvalidRepository {
            path: dir.to_path_buf(),
            error: e.to_string(),
        })
    }
}

impl GitClient for GitCli {
    fn is_repo(&self, dir: &Path) -> bool {
        dir.join(".git").exists() && gix::open(dir).is_ok()
    }

    fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), GitError> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| GitError::IoError {
                path: parent.to_path_buf(),
                error: e.to_string(),
            })?;
        }

        let clone_failed = |e: &dyn std::fmt::Display| GitError::CloneFailed {
            url: url.to_string(),
            error: e.to_string(),
        };

        let mut prepare = gix::prepare_clone(url, dest).map_err(|e| clone_failed(&e))?;
        let (mut checkout, _outcome) = prepare
            .fetch_then_checkout(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
            .map_err(|e| clone_failed(&e))?;
        checkout
            .main_worktree(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
            .map_err(|e| clone_failed(&e))?;

        Ok(())
    }

    fn current_branch(&self, dir: &Path) -> Result<String, GitError> {
        let repo = Self::open(dir)?;
        let head = repo.head_name().map_err(|e| GitError::InvalidRepository {
            path: dir.to_path_buf(),
            error: e.to_string(),
        })?;
        Ok(head.map_or_else(|| "HEAD".to_string(), |name| name.shorten().to_string()))
    }

    fn default_branch(&self, dir: &Path) -> Option<String> {
        let head = self
            .git(dir, &["symbolic-ref", "--short", "refs/remotes/origin/HEAD"])
            .ok()?;
        head.strip_prefix("origin/")
            .map(str::to_string)
            .filter(|branch| !branch.is_empty())
    }

    fn status(&self, dir: &Path) -> Result<String, GitError> {
        self.git(dir, &["status", "--short"])
    }

    fn fetch(&self, dir: &Path, remote: &str) -> Result<(), GitError> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_retry_delay)
            .with_max_elapsed_time(None)
            .build();

        let mut attempt = 0;
        backoff::retry(policy, || {
            attempt += 1;
            match self.git(dir, &["fetch", remote]) {
                Ok(_) => Ok(()),
                Err(e @ GitError::NotInstalled) => Err(backoff::Error::permanent(e)),
                Err(e) if attempt >= self.max_fetch_attempts => Err(backoff::Error::permanent(e)),
                Err(e) => {
                    tracing::debug!("Fetch attempt {} failed: {}", attempt, e);
                    Err(backoff::Error::transient(e))
                }
            }
        })
        .map_err(|e| match e {
            backoff::Error::Permanent(err) | backoff::Error::Transient { err, .. } => err,
        })
    }

    fn rebase(&self, dir: &Path, upstream: &str) -> Result<(), GitError> {
        self.git(dir, &["rebase", upstream]).map(drop)
    }

    fn abort_rebase(&self, dir: &Path) -> Result<(), GitError> {
        self.git(dir, &["rebase", "--abort"]).map(drop)
    }

    fn pull(&self, dir: &Path) -> Result<(), GitError> {
        self.git(dir, &["pull"]).map(drop)
    }
}
