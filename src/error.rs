//! Error types for spk
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Workspace manifest errors
#[derive(Error, Debug)]
pub enum WorkspaceError {
    /// No manifest found walking up from the start directory
    #[error("Not inside an spk workspace (no .spk/workspace.json found above '{start}')")]
    NotFound { start: PathBuf },

    /// A manifest already exists at the target path
    #[error("Workspace already exists at '{path}'")]
    AlreadyExists { path: PathBuf },

    /// Manifest could not be read
    #[error("Failed to read workspace manifest '{path}': {error}")]
    ReadError { path: PathBuf, error: String },

    /// Manifest could not be parsed
    #[error("Failed to parse workspace manifest '{path}': {error}")]
    ParseError { path: PathBuf, error: String },

    /// Manifest could not be written
    #[error("Failed to write workspace manifest '{path}': {error}")]
    WriteError { path: PathBuf, error: String },

    /// Repo is not registered in the manifest
    #[error("Repo '{name}' not found in workspace. Run 'spk list' to see repos")]
    RepoNotFound { name: String },

    /// Repo path points outside the workspace root
    #[error("Repo path '{path}' escapes the workspace, refusing to touch it")]
    PathEscapesWorkspace { path: PathBuf },
}

/// Build order planning errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolverError {
    /// A dependency names a repo that is not registered
    #[error("Repo '{dependency}' required by '{repo}' is not registered in the workspace")]
    NotRegistered { repo: String, dependency: String },

    /// The dependency graph has no topological order
    #[error("Circular dependency detected among: {}", cycle.join(", "))]
    CyclicDependency { cycle: Vec<String> },

    /// Two producers claim the same package for one consumer
    #[error("Consumer '{consumer}' links '{package}' from both '{first}' and '{second}'")]
    ConflictingEdge {
        consumer: String,
        package: String,
        first: String,
        second: String,
    },
}

/// Link mutation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// A real file or directory occupies the link slot
    #[error("'{slot}' is not a link, leaving it alone (resolve manually)")]
    Conflict { slot: PathBuf },

    /// The link could not be created for an environmental reason
    #[error("Failed to link '{slot}' -> '{source_dir}': {error}")]
    Failed {
        slot: PathBuf,
        source_dir: PathBuf,
        error: String,
    },
}

/// Build errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// The build target is not registered
    #[error("Repo '{name}' not found in workspace")]
    NotRegistered { name: String },

    /// The working copy is missing on disk
    #[error("Repo directory '{path}' for '{name}' does not exist. Run 'spk use {name}'")]
    NotCloned { name: String, path: PathBuf },

    /// The build command exited unsuccessfully
    #[error("Build failed for '{repo}' ({})", describe_exit(*code))]
    BuildFailed { repo: String, code: Option<i32> },

    /// The build process could not be started
    #[error("Failed to start build for '{repo}': {error}")]
    Spawn { repo: String, error: String },

    /// The build was cancelled by the user
    #[error("Build of '{repo}' was interrupted")]
    Interrupted { repo: String },
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Secrets store errors
#[derive(Error, Debug)]
pub enum SecretsError {
    /// The aws CLI is not installed
    #[error("AWS CLI not found. Install it with: brew install awscli")]
    CliNotFound,

    /// The aws CLI returned an error
    #[error("Failed to fetch parameters: {error}")]
    FetchFailed { error: String },

    /// The aws CLI output could not be parsed
    #[error("Failed to parse SSM response: {error}")]
    ParseError { error: String },

    /// The SSO session for the profile has expired
    #[error("AWS credentials expired for profile '{profile}'. Run 'spk login'")]
    CredentialsExpired { profile: String },

    /// SSO login failed
    #[error("AWS SSO login failed for profile '{profile}'")]
    LoginFailed { profile: String },

    /// `aws configure sso` exited unsuccessfully
    #[error("aws configure sso did not complete")]
    ConfigureFailed,
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to remove directory
    #[error("Failed to remove directory '{path}': {error}")]
    RemoveDir { path: PathBuf, error: String },

    /// Failed to write file
    #[error("Failed to write file '{path}': {error}")]
    WriteFile { path: PathBuf, error: String },

    /// Failed to read file
    #[error("Failed to read file '{path}': {error}")]
    ReadFile { path: PathBuf, error: String },
}

/// Top-level spk error type
#[derive(Error, Debug)]
pub enum SpkError {
    /// Workspace error
    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    /// Resolver error
    #[error("Resolver error: {0}")]
    Resolver(#[from] ResolverError),

    /// Build error
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Link error
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    /// Secrets error
    #[error("Secrets error: {0}")]
    Secrets(#[from] SecretsError),

    /// Filesystem error
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] FilesystemError),

    /// Generic error
    #[error("{0}")]
    Generic(String),
}
