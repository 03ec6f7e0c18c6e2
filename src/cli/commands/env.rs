//! Env command implementation
//!
//! Implements `spk env` and its subcommands over the workspace `.env`.

use anyhow::{Context, Result};
use std::path::Path;

use super::WorkspaceContext;
use crate::cli::output::{self, OutputConfig};
use crate::config::defaults::{DEFAULT_AWS_REGION, ENV_DISPLAY_WIDTH};
use crate::core::env::{
    export_line, link_env_files, merge_env_file, parse_assignments, read_env_file, refresh_env,
    truncate_for_display, RefreshSummary,
};
use crate::core::workspace::env_path;
use crate::error::{SecretsError, SpkError};
use crate::infra::aws::AwsCli;
use crate::infra::filesystem::write_file;
use crate::infra::links::SymlinkFs;

/// Execute `spk env show`
pub fn execute_show(current_dir: &Path) -> Result<()> {
    let ctx = WorkspaceContext::load(current_dir)?;
    let path = env_path(&ctx.root);
    let vars = read_env_file(&path)?;

    if OutputConfig::current().json {
        println!("{}", serde_json::to_string_pretty(&vars)?);
        return Ok(());
    }

    if vars.is_empty() {
        println!("No environment variables in {}", path.display());
        println!("Run 'spk env refresh' or 'spk env set KEY=VALUE'");
        return Ok(());
    }

    println!("Environment ({}):", path.display());
    let width = vars.keys().map(String::len).max().unwrap_or(0);
    for (key, value) in &vars {
        println!("  {key:<width$} = {}", truncate_for_display(value, ENV_DISPLAY_WIDTH));
    }
    Ok(())
}

/// Execute `spk env set KEY=VALUE...`
pub fn execute_set(current_dir: &Path, assignments: &[String]) -> Result<()> {
    let ctx = WorkspaceContext::load(current_dir)?;
    let updates = parse_assignments(assignments)?;
    let path = env_path(&ctx.root);
    merge_env_file(&path, &updates)?;

    for key in updates.keys() {
        output::success(&format!("Set {key}"));
    }
    Ok(())
}

/// Execute `spk env export`
pub fn execute_export(current_dir: &Path) -> Result<()> {
    let ctx = WorkspaceContext::load(current_dir)?;
    let vars = read_env_file(&env_path(&ctx.root))?;
    for (key, value) in &vars {
        println!("{}", export_line(key, value));
    }
    Ok(())
}

/// Execute `spk env link`
pub fn execute_link(current_dir: &Path) -> Result<()> {
    let ctx = WorkspaceContext::load(current_dir)?;
    let path = env_path(&ctx.root);
    if !path.exists() {
        write_file(&path, "")?;
        output::info(&format!("Created empty {}", path.display()));
    }

    let report = link_env_files(&SymlinkFs::new(), &ctx.root, &ctx.registry());
    for name in &report.linked {
        output::success(&format!("{name}/.env -> workspace .env"));
    }
    for name in &report.kept {
        output::warning(&format!("{name}/.env is a real file, leaving it alone"));
    }
    for name in &report.missing {
        output::line(&format!("{} {name}: not cloned", output::status::SKIP));
    }
    for (name, err) in &report.failed {
        output::warning(&format!("{name}: {err}"));
    }
    Ok(())
}

/// Execute `spk env refresh`
pub fn execute_refresh(current_dir: &Path, env_name: Option<&str>) -> Result<()> {
    let ctx = WorkspaceContext::load(current_dir)?;
    let summary = refresh(&ctx, env_name)?;
    output::success(&format!(
        "Fetched {} parameters from '{}' into {} ({} variables)",
        summary.fetched,
        summary.env_name,
        summary.path.display(),
        summary.total
    ));
    Ok(())
}

/// Refresh `.env` from the parameter store
///
/// Logs in through SSO when the session is missing, and once more if the
/// store reports expired credentials mid-refresh.
pub(crate) fn refresh(ctx: &WorkspaceContext, env_name: Option<&str>) -> Result<RefreshSummary> {
    AwsCli::check_cli()?;
    let region = ctx
        .workspace
        .aws_region
        .clone()
        .unwrap_or_else(|| DEFAULT_AWS_REGION.to_string());
    let aws = AwsCli::new(ctx.workspace.aws_profile.clone(), region);

    if let Err(e) = aws.caller_identity() {
        tracing::debug!("No valid AWS session: {}", e);
        output::info("AWS session not active, logging in...");
        aws.sso_login()?;
    }

    let spinner = output::create_spinner("Fetching parameters...");
    let first = refresh_env(&aws, &ctx.root, &ctx.workspace, env_name);
    spinner.finish_and_clear();

    match first {
        Err(SpkError::Secrets(SecretsError::CredentialsExpired { profile })) => {
            output::info(&format!("Credentials expired for '{profile}', logging in again..."));
            aws.sso_login()?;
            refresh_env(&aws, &ctx.root, &ctx.workspace, env_name)
                .context("Failed to refresh environment after login")
        }
        other => other.context("Failed to refresh environment"),
    }
}
