//! Login command implementation
//!
//! Implements `spk login`: AWS SSO login for the workspace profile.

use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::output;
use crate::config::defaults::DEFAULT_AWS_REGION;
use crate::core::global_config::GlobalConfig;
use crate::core::workspace::{find_root, Workspace};
use crate::infra::aws::AwsCli;
use crate::infra::dirs::SpkDirs;

/// Execute the login command
///
/// Outside a workspace the global default profile is used.
pub fn execute(current_dir: &Path, profile: Option<String>) -> Result<()> {
    AwsCli::check_cli()?;

    let workspace = find_root(current_dir)
        .ok()
        .and_then(|root| Workspace::load(&root).ok());
    let global = GlobalConfig::load(&SpkDirs::new()).unwrap_or_default();

    let profile = profile
        .or_else(|| workspace.as_ref().and_then(|ws| ws.aws_profile.clone()))
        .or_else(|| global.defaults.aws_profile.clone());
    let region = workspace
        .as_ref()
        .and_then(|ws| ws.aws_region.clone())
        .unwrap_or_else(|| DEFAULT_AWS_REGION.to_string());

    let aws = AwsCli::new(profile.clone(), region);
    aws.sso_login()?;

    let identity = aws
        .caller_identity()
        .context("Logged in, but the caller identity could not be read")?;
    output::success(&format!(
        "Logged in with profile '{}'",
        profile.as_deref().unwrap_or("default")
    ));
    tracing::info!("Caller identity: {}", identity);
    Ok(())
}
