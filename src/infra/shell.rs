//! Shell command execution
//!
//! Runs build, test and script commands through the platform shell with the
//! workspace environment overlaid, and stops them when the run is
//! cancelled.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;

use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use crate::core::orchestrator::{BuildRunner, RunOutcome};

/// Shell used for login-shell runs when `$SHELL` is unset
const FALLBACK_SHELL: &str = "/bin/sh";

/// Runs commands through `sh -c` (or `$SHELL -l -c`)
#[derive(Debug, Clone, Default)]
pub struct ShellRunner {
    env: BTreeMap<String, String>,
    login_shell: bool,
    cancel: CancellationToken,
}

impl ShellRunner {
    /// Create a runner that stops when `cancel` fires
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            env: BTreeMap::new(),
            login_shell: false,
            cancel,
        }
    }

    /// Overlay `env` on the inherited process environment
    #[must_use]
    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Run through the user's login shell so version managers are loaded
    #[must_use]
    pub fn login_shell(mut self, enabled: bool) -> Self {
        self.login_shell = enabled;
        self
    }

    fn command(&self, command: &str, working_dir: &Path) -> Command {
        let mut cmd = if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C");
            cmd
        } else if self.login_shell {
            let shell = std::env::var("SHELL").unwrap_or_else(|_| FALLBACK_SHELL.to_string());
            let mut cmd = Command::new(shell);
            cmd.args(["-l", "-c"]);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.arg("-c");
            cmd
        };
        cmd.arg(command);
        self.prepare(&mut cmd, working_dir);
        cmd
    }

    fn prepare(&self, cmd: &mut Command, working_dir: &Path) {
        cmd.current_dir(working_dir)
            .envs(&self.env)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
    }

    /// Run `program` with `args` directly, without a shell
    pub async fn run_program(
        &self,
        program: &Path,
        args: &[String],
        working_dir: &Path,
    ) -> std::io::Result<RunOutcome> {
        tracing::debug!("Running {} {:?} in {}", program.display(), args, working_dir.display());
        let mut cmd = Command::new(program);
        cmd.args(args);
        self.prepare(&mut cmd, working_dir);
        self.wait(&program.display().to_string(), cmd.spawn()?).await
    }

    async fn wait(&self, label: &str, mut child: Child) -> std::io::Result<RunOutcome> {
        let status = tokio::select! {
            status = child.wait() => Some(status?),
            () = self.cancel.cancelled() => None,
        };

        match status {
            Some(status) => Ok(RunOutcome::Exited(status.code())),
            None => {
                tracing::info!("Stopping '{}'", label);
                if let Err(e) = child.kill().await {
                    tracing::warn!("Failed to stop '{}': {}", label, e);
                }
                Ok(RunOutcome::Interrupted)
            }
        }
    }
}

impl BuildRunner for ShellRunner {
    async fn run(&self, command: &str, working_dir: &Path) -> std::io::Result<RunOutcome> {
        tracing::debug!("Running '{}' in {}", command, working_dir.display());
        let child = self.command(command, working_dir).spawn()?;
        self.wait(command, child).await
    }
}

/// Token reported by `gh auth token`, if the GitHub CLI is logged in
pub fn github_token_from_gh() -> Option<String> {
    which::which("gh").ok()?;
    let output = std::process::Command::new("gh")
        .args(["auth", "token"])
        .stderr(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!token.is_empty()).then_some(token)
}
