//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

use spk::core::workspace::{RepoDef, Workspace};

/// Name of the workspace directory created by [`TestProject::create_workspace`]
pub const WORKSPACE: &str = "ws";

/// Test project context
///
/// Owns a temporary directory holding an isolated spk config directory and
/// any workspaces the test creates.
pub struct TestProject {
    /// Temporary directory for the test project
    pub dir: TempDir,
}

impl TestProject {
    /// Create a new test project in a temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Get the path to the test project directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Root of the workspace created by [`Self::create_workspace`]
    pub fn workspace_root(&self) -> PathBuf {
        self.path().join(WORKSPACE)
    }

    /// Config directory used in place of the user's
    pub fn config_dir(&self) -> PathBuf {
        self.path().join("config")
    }

    /// Build an spk command isolated from the user's environment
    pub fn command(&self, cwd: &Path, args: &[&str]) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_spk"));
        cmd.current_dir(cwd)
            .args(args)
            .env("SPK_CONFIG_DIR", self.config_dir())
            .env("AWS_CONFIG_FILE", self.path().join("aws-config"))
            // Keeps spk from asking `gh` for a token
            .env("GITHUB_TOKEN", "test-token")
            .env("SHELL", "/bin/sh")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Run spk in `cwd`
    pub fn spk_in(&self, cwd: &Path, args: &[&str]) -> Output {
        self.command(cwd, args)
            .output()
            .expect("Failed to execute spk")
    }

    /// Run spk in the workspace root
    pub fn spk(&self, args: &[&str]) -> Output {
        self.spk_in(&self.workspace_root(), args)
    }

    /// Run `spk create ws` and return the workspace root
    pub fn create_workspace(&self) -> PathBuf {
        let output = self.spk_in(&self.path(), &["create", WORKSPACE]);
        assert_success(&output, "spk create");
        self.workspace_root()
    }

    /// Register a repo directly in the manifest and create its directory
    pub fn add_repo(&self, name: &str, def: RepoDef) {
        let root = self.workspace_root();
        let mut workspace = Workspace::load(&root).expect("Failed to load workspace");
        std::fs::create_dir_all(root.join(&def.path)).expect("Failed to create repo directory");
        workspace.add_repo(name, def);
        workspace.save(&root).expect("Failed to save workspace");
    }

    /// Load the workspace manifest
    pub fn workspace(&self) -> Workspace {
        Workspace::load(&self.workspace_root()).expect("Failed to load workspace")
    }

    /// Create a file in the test project
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Create a directory in the test project
    pub fn create_dir(&self, name: &str) {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(path).expect("Failed to create directory");
    }

    /// Check if a file exists in the test project
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Read a file from the test project
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Repo definition with a build command and dependencies
pub fn repo(name: &str, build: Option<&str>, deps: &[&str]) -> RepoDef {
    RepoDef {
        remote: format!("https://github.com/example/{name}.git"),
        path: name.to_string(),
        build_command: build.map(str::to_string),
        dependencies: deps.iter().map(|d| (*d).to_string()).collect(),
        ..RepoDef::default()
    }
}

/// Assert that a command succeeded, showing its output otherwise
pub fn assert_success(output: &Output, what: &str) {
    assert!(
        output.status.success(),
        "{what} should succeed\nstdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Stdout as a string
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Stderr as a string
pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}
