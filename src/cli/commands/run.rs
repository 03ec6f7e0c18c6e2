//! Run command implementation
//!
//! Implements `spk run`. Inside a repo the first argument names a script
//! for the repo's project type; anywhere else the arguments are run as a
//! shell command from the workspace root.

use anyhow::{bail, Context, Result};
use std::path::Path;
use tokio_util::sync::CancellationToken;

use super::WorkspaceContext;
use crate::cli::output;
use crate::core::orchestrator::{BuildRunner, RunOutcome};
use crate::core::project::{needs_npm_install, read_npm_scripts, ProjectType};
use crate::core::registry::Repository;
use crate::infra::shell::ShellRunner;

/// Execute the run command
pub async fn execute(
    current_dir: &Path,
    script: Option<String>,
    args: Vec<String>,
    cancel: CancellationToken,
) -> Result<()> {
    let ctx = WorkspaceContext::load(current_dir)?;
    let registry = ctx.registry();
    let runner = ShellRunner::new(cancel)
        .with_env(ctx.subprocess_env()?)
        .login_shell(true);

    match registry.containing(current_dir) {
        Some(repo) => run_script(&runner, repo, script.as_deref(), &args).await,
        None => {
            let Some(program) = script else {
                bail!("Nothing to run. Usage: spk run <command> [args...]");
            };
            let command = std::iter::once(program)
                .chain(args)
                .collect::<Vec<_>>()
                .join(" ");
            run_checked(&runner, &command, &ctx.root).await
        }
    }
}

async fn run_script(
    runner: &ShellRunner,
    repo: &Repository,
    script: Option<&str>,
    args: &[String],
) -> Result<()> {
    let project_type = ProjectType::detect(&repo.location);
    let scripts = match project_type {
        ProjectType::Node => read_npm_scripts(&repo.location),
        _ => None,
    };

    let Some(script) = script else {
        print_scripts(repo, project_type, project_type.suggested_scripts(scripts.as_ref()));
        return Ok(());
    };

    let Some(command) = project_type.script_command(script, args, scripts.as_ref()) else {
        let available = project_type.suggested_scripts(scripts.as_ref());
        if available.is_empty() {
            bail!("Script '{script}' not found in {} ({project_type} project)", repo.name);
        }
        bail!(
            "Script '{script}' not found in {}. Available: {}",
            repo.name,
            available.join(", ")
        );
    };

    if project_type == ProjectType::Node && needs_npm_install(&repo.location) {
        output::info(&format!("Installing dependencies in {}", repo.name));
        run_checked(runner, "npm install", &repo.location).await?;
    }

    output::info(&format!("{}: {command}", repo.name));
    run_checked(runner, &command, &repo.location).await
}

fn print_scripts(repo: &Repository, project_type: ProjectType, scripts: Vec<String>) {
    if scripts.is_empty() {
        println!("No scripts found for {} ({project_type} project)", repo.name);
        return;
    }
    println!("Scripts in {} ({project_type}):", repo.name);
    for script in scripts {
        println!("  {script}");
    }
    println!();
    println!("Usage: spk run <script> [args...]");
}

async fn run_checked(runner: &ShellRunner, command: &str, dir: &Path) -> Result<()> {
    let outcome = runner
        .run(command, dir)
        .await
        .with_context(|| format!("Failed to start '{command}'"))?;
    match outcome {
        RunOutcome::Exited(Some(0)) => Ok(()),
        RunOutcome::Exited(Some(code)) => bail!("'{command}' exited with status {code}"),
        RunOutcome::Exited(None) => bail!("'{command}' was terminated by a signal"),
        RunOutcome::Interrupted => bail!("'{command}' was interrupted"),
    }
}
