//! List and workspace command implementations
//!
//! Implements `spk list` (repo table), `spk workspace` (settings, AWS
//! profiles and the repo table) and `spk workspace configure`.

use anyhow::{Context, Result};
use std::path::Path;

use super::WorkspaceContext;
use crate::cli::output::{self, OutputConfig};
use crate::config::defaults::{DEFAULT_AWS_REGION, DEFAULT_SSM_ENV};
use crate::core::sync::{working_copy_state, GitClient, WorkingCopyState};
use crate::infra::aws::{sso_profiles, AwsCli};
use crate::infra::git::GitCli;

/// One row of the repo table
#[derive(Debug, serde::Serialize)]
struct RepoRow {
    name: String,
    branch: String,
    status: String,
    path: String,
}

fn repo_rows(ctx: &WorkspaceContext) -> Vec<RepoRow> {
    let git = GitCli::new();
    ctx.workspace
        .repos
        .iter()
        .map(|(name, def)| {
            let dir = ctx.root.join(&def.path);
            let state = working_copy_state(&git, &dir);
            let branch = match state {
                WorkingCopyState::Clean | WorkingCopyState::Dirty => {
                    git.current_branch(&dir).unwrap_or_else(|_| "-".to_string())
                }
                _ => "-".to_string(),
            };
            RepoRow {
                name: name.clone(),
                branch,
                status: state.to_string(),
                path: def.path.clone(),
            }
        })
        .collect()
}

fn print_repo_table(rows: &[RepoRow]) {
    println!("{:<25} {:<15} {:<10} PATH", "REPO", "BRANCH", "STATUS");
    println!("{:<25} {:<15} {:<10} ----", "----", "------", "------");
    for row in rows {
        println!(
            "{:<25} {:<15} {:<10} {}",
            row.name, row.branch, row.status, row.path
        );
    }
}

/// Execute the list command
pub fn execute_list(current_dir: &Path) -> Result<()> {
    let ctx = WorkspaceContext::load(current_dir)?;
    let rows = repo_rows(&ctx);

    if OutputConfig::current().json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No repos in workspace. Run 'spk use <org/repo>' to add one");
        return Ok(());
    }

    println!("Workspace: {} ({})", ctx.workspace.name, ctx.root.display());
    println!();
    print_repo_table(&rows);
    Ok(())
}

/// Execute the workspace command
pub fn execute_workspace(current_dir: &Path, profile: Option<String>) -> Result<()> {
    let mut ctx = WorkspaceContext::load(current_dir)?;

    if let Some(profile) = profile {
        return set_profile(&mut ctx, &profile);
    }

    let ws = &ctx.workspace;
    println!(
        "{:<15} {:<30} {:<25} ENVIRONMENT",
        "WORKSPACE", "LOCATION", "AWS PROFILE"
    );
    println!(
        "{:<15} {:<30} {:<25} {}",
        ws.name,
        ctx.root.display(),
        ws.aws_profile.as_deref().unwrap_or("(not set)"),
        ws.ssm_env_path.as_deref().unwrap_or(DEFAULT_SSM_ENV)
    );
    println!();

    let profiles = sso_profiles();
    if !profiles.is_empty() {
        println!("AWS profiles (switch with: spk workspace --profile <name>):");
        for profile in &profiles {
            let mark = if ws.aws_profile.as_deref() == Some(profile.as_str()) {
                "  <- current"
            } else {
                ""
            };
            println!("  • {profile}{mark}");
        }
        println!();
    }

    let rows = repo_rows(&ctx);
    if rows.is_empty() {
        println!("No repos. Run 'spk use <repo>' to add one");
    } else {
        print_repo_table(&rows);
    }
    Ok(())
}

/// Execute `spk workspace configure --profile <name>`
pub fn execute_set_profile(current_dir: &Path, profile: &str) -> Result<()> {
    let mut ctx = WorkspaceContext::load(current_dir)?;
    set_profile(&mut ctx, profile)
}

/// Save the workspace profile; SSO profiles are logged in when their
/// credentials are missing or expired
fn set_profile(ctx: &mut WorkspaceContext, profile: &str) -> Result<()> {
    let is_sso = sso_profiles().iter().any(|p| p == profile);
    if !profile.is_empty() && !is_sso {
        output::info(&format!(
            "Profile '{profile}' is not an SSO profile in the AWS config; setting it anyway"
        ));
    }

    ctx.workspace.aws_profile = Some(profile.to_string()).filter(|p| !p.is_empty());
    ctx.save()?;
    output::success(&format!("Workspace AWS profile set to '{profile}'"));

    if !is_sso {
        return Ok(());
    }
    if AwsCli::check_cli().is_err() {
        output::warning("aws CLI not found; skipping the SSO login check");
        return Ok(());
    }
    let region = ctx
        .workspace
        .aws_region
        .clone()
        .unwrap_or_else(|| DEFAULT_AWS_REGION.to_string());
    let aws = AwsCli::new(Some(profile.to_string()), region);
    if aws.ensure_logged_in().context("SSO login for the new profile failed")? {
        output::success("Login successful");
    }
    Ok(())
}

/// Execute `spk workspace configure --list`
///
/// Works outside a workspace too; the current profile is shown when there
/// is one.
pub fn execute_list_profiles(current_dir: &Path) -> Result<()> {
    let profiles = sso_profiles();
    if profiles.is_empty() {
        println!("No AWS SSO profiles found in the AWS config");
        println!("Running aws configure sso...");
        return execute_configure_sso();
    }

    if OutputConfig::current().json {
        println!("{}", serde_json::to_string_pretty(&profiles)?);
        return Ok(());
    }

    println!("AWS SSO profiles:");
    for profile in &profiles {
        println!("  • {profile}");
    }
    println!();
    match WorkspaceContext::load(current_dir) {
        Ok(ctx) => println!(
            "Current workspace profile: {}",
            ctx.workspace.aws_profile.as_deref().unwrap_or("(not set)")
        ),
        Err(_) => println!("Not inside a workspace; run from one to set a profile"),
    }
    Ok(())
}

/// Execute `spk workspace configure sso`
pub fn execute_configure_sso() -> Result<()> {
    AwsCli::check_cli()?;
    AwsCli::configure_sso()?;
    output::success("Profile added. Select it with: spk workspace configure --profile <name>");
    Ok(())
}
