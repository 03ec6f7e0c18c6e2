//! Config command implementation
//!
//! Implements `spk config view` and `spk config set`.

use anyhow::{bail, Context, Result};

use crate::cli::output::{self, OutputConfig};
use crate::core::global_config::GlobalConfig;
use crate::infra::dirs::SpkDirs;

/// Execute `spk config view`
pub fn execute_view() -> Result<()> {
    let dirs = SpkDirs::new();
    let config = GlobalConfig::load(&dirs)?;

    if OutputConfig::current().json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!("Config file: {}", dirs.global_config_path().display());
    println!();
    println!("  github_org:  {}", config.github_org());
    println!(
        "  aws_profile: {}",
        config.defaults.aws_profile.as_deref().unwrap_or("(not set)")
    );
    println!("  aws_region:  {}", config.aws_region());

    if !config.workspaces.paths.is_empty() {
        println!();
        println!("Workspaces:");
        for path in &config.workspaces.paths {
            println!("  {path}");
        }
    }
    Ok(())
}

/// Execute `spk config set`
pub fn execute_set(
    org: Option<String>,
    aws_profile: Option<String>,
    aws_region: Option<String>,
) -> Result<()> {
    let updates: Vec<(&str, String)> = [
        ("github_org", org),
        ("aws_profile", aws_profile),
        ("aws_region", aws_region),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.map(|v| (key, v)))
    .collect();

    if updates.is_empty() {
        bail!("Nothing to set. Pass --org, --aws-profile or --aws-region");
    }

    let dirs = SpkDirs::new();
    let mut config = GlobalConfig::load(&dirs)?;
    for (key, value) in &updates {
        config.set(key, value)?;
    }
    config
        .save(&dirs)
        .context("Failed to save global config")?;

    for (key, value) in &updates {
        output::success(&format!("{key} = {value}"));
    }
    Ok(())
}
