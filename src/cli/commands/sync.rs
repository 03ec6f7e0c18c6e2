//! Sync command implementation
//!
//! Implements `spk sync`: fetch and rebase repos onto their remote branch,
//! optionally refreshing `.env` and running `npm install` afterwards.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::WorkspaceContext;
use crate::cli::output::{self, status, OutputConfig};
use crate::config::defaults::MAX_FETCH_ATTEMPTS;
use crate::core::orchestrator::{BuildRunner, RunOutcome};
use crate::core::registry::{Registry, Repository};
use crate::core::sync::{sync_all, sync_repo, SyncOptions, SyncStatus};
use crate::error::WorkspaceError;
use crate::infra::git::GitCli;
use crate::infra::shell::ShellRunner;

/// Options for `spk sync`
#[derive(Debug, Default)]
pub struct SyncCommandOptions {
    /// Only sync this repo
    pub repo: Option<String>,
    /// Branch to sync against
    pub branch: Option<String>,
    /// Pull instead of rebase
    pub no_rebase: bool,
    /// Refresh `.env` from this parameter environment
    pub env: Option<String>,
    /// Run `npm install` in Node repos
    pub install: bool,
}

/// Execute the sync command
pub async fn execute(
    current_dir: &Path,
    options: SyncCommandOptions,
    cancel: CancellationToken,
) -> Result<()> {
    let ctx = WorkspaceContext::load(current_dir)?;
    let registry = ctx.registry();
    let git = GitCli::with_retry(MAX_FETCH_ATTEMPTS, Duration::from_secs(1));
    let sync_options = SyncOptions {
        branch: options.branch.clone(),
        no_rebase: options.no_rebase,
    };
    let workspace_branch = ctx.workspace.default_branch.as_deref();

    // Git steps block on subprocesses and retry sleeps
    let results: Vec<(String, SyncStatus)> = match &options.repo {
        Some(name) => {
            let repo = registry
                .get(name)
                .ok_or_else(|| WorkspaceError::RepoNotFound { name: name.clone() })?
                .clone();
            let workspace_branch = workspace_branch.map(str::to_string);
            let spinner = output::create_spinner(&format!("Syncing {name}..."));
            let result = tokio::task::spawn_blocking(move || {
                sync_repo(&git, &repo, workspace_branch.as_deref(), &sync_options)
            })
            .await;
            spinner.finish_and_clear();
            vec![(name.clone(), result.context("sync task failed")?)]
        }
        None => {
            let all = registry.clone();
            let workspace_branch = workspace_branch.map(str::to_string);
            let spinner = output::create_spinner(&format!("Syncing {} repos...", registry.len()));
            let results = tokio::task::spawn_blocking(move || {
                sync_all(&git, &all, workspace_branch.as_deref(), &sync_options)
            })
            .await;
            spinner.finish_and_clear();
            results.context("sync task failed")?
        }
    };

    report(&results);

    if let Some(env_name) = options.env.as_deref() {
        match super::env::refresh(&ctx, Some(env_name)) {
            Ok(summary) => output::success(&format!(
                "Refreshed {} from '{}' ({} variables)",
                summary.path.display(),
                summary.env_name,
                summary.total
            )),
            Err(e) => output::warning(&format!("Environment refresh failed: {e:#}")),
        }
    }

    if options.install {
        let runner = ShellRunner::new(cancel).with_env(ctx.subprocess_env()?);
        npm_install(&runner, &install_targets(&results, &registry)).await?;
    }

    let failed = results.iter().filter(|(_, s)| matches!(s, SyncStatus::Failed { .. })).count();
    if failed > 0 {
        bail!("{failed} repo(s) failed to sync");
    }
    Ok(())
}

/// Cloned Node repos, whether or not their sync succeeded
fn install_targets<'a>(
    results: &[(String, SyncStatus)],
    registry: &'a Registry,
) -> Vec<&'a Repository> {
    results
        .iter()
        .filter(|(_, status)| !matches!(status, SyncStatus::NotCloned))
        .filter_map(|(name, _)| registry.get(name))
        .filter(|repo| repo.location.join("package.json").is_file())
        .collect()
}

fn report(results: &[(String, SyncStatus)]) {
    if OutputConfig::current().json {
        let rows: Vec<_> = results
            .iter()
            .map(|(name, status)| {
                serde_json::json!({
                    "repo": name,
                    "synced": status.is_synced(),
                    "status": status.to_string(),
                })
            })
            .collect();
        println!("{}", serde_json::Value::Array(rows));
        return;
    }

    for (name, sync_status) in results {
        let prefix = match sync_status {
            SyncStatus::UpToDate { .. } => status::SUCCESS,
            SyncStatus::NotCloned | SyncStatus::Dirty { .. } => status::SKIP,
            SyncStatus::Failed { .. } => status::ERROR,
        };
        output::line(&format!("{prefix} {name}: {sync_status}"));
        if let SyncStatus::Dirty { status: changes } = sync_status {
            for change in changes.lines().take(5) {
                output::line(&format!("      {change}"));
            }
        }
    }
}

async fn npm_install(runner: &ShellRunner, repos: &[&Repository]) -> Result<()> {
    for repo in repos {
        output::info(&format!("npm install in {}", repo.name));
        match runner.run("npm install", &repo.location).await? {
            RunOutcome::Exited(Some(0)) => {}
            RunOutcome::Interrupted => bail!("Interrupted during npm install in {}", repo.name),
            RunOutcome::Exited(code) => output::warning(&format!(
                "npm install failed in {} (exit {})",
                repo.name,
                code.map_or_else(|| "signal".to_string(), |c| c.to_string())
            )),
        }
    }
    Ok(())
}
