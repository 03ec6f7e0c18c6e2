//! Use command implementation
//!
//! Implements `spk use <repo>`: clone a repository into the workspace (or
//! re-attach an existing checkout) and register it in the manifest.

use anyhow::{bail, Result};
use std::path::Path;

use super::WorkspaceContext;
use crate::cli::output;
use crate::core::global_config::GlobalConfig;
use crate::core::remote::{is_usable_repo_name, repo_name_from_remote, resolve_remote};
use crate::core::sync::GitClient;
use crate::core::workspace::RepoDef;
use crate::infra::dirs::SpkDirs;
use crate::infra::git::GitCli;

/// Execute the use command
pub fn execute(
    current_dir: &Path,
    repo: &str,
    build_command: Option<String>,
    deps: Vec<String>,
) -> Result<()> {
    let mut ctx = WorkspaceContext::load(current_dir)?;

    let org = GlobalConfig::load(&SpkDirs::new())
        .map(|config| config.github_org().to_string())
        .unwrap_or_else(|e| {
            tracing::warn!("Ignoring unreadable global config: {}", e);
            crate::config::defaults::DEFAULT_GITHUB_ORG.to_string()
        });
    let remote = resolve_remote(repo, &org);
    let name = repo_name_from_remote(repo);
    if !is_usable_repo_name(&name) {
        bail!("Cannot derive a repo name from '{repo}'");
    }
    let target = ctx.root.join(&name);
    let git = GitCli::new();

    if target.exists() {
        if !git.is_repo(&target) {
            bail!(
                "Directory {} exists but is not a git repository",
                target.display()
            );
        }
        output::info(&format!(
            "Repository '{name}' already exists at {}",
            target.display()
        ));
    } else {
        let spinner = output::create_spinner(&format!("Cloning {remote}..."));
        let cloned = git.clone_repo(&remote, &target);
        spinner.finish_and_clear();
        cloned?;
    }

    // Re-running `use` keeps overrides that were not given again
    let mut def: RepoDef = ctx.workspace.repos.get(&name).cloned().unwrap_or_default();
    def.remote = remote;
    def.path.clone_from(&name);
    if build_command.is_some() {
        def.build_command = build_command;
    }
    if !deps.is_empty() {
        def.dependencies = deps;
    }
    ctx.workspace.add_repo(&name, def);
    ctx.save()?;

    output::success(&format!("Repository '{name}' added to workspace"));
    Ok(())
}
