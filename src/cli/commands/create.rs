//! Create command implementation
//!
//! Implements `spk create <path>` to start a new workspace.

use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::output;
use crate::core::global_config::GlobalConfig;
use crate::core::workspace::Workspace;
use crate::infra::dirs::SpkDirs;

/// Execute the create command
pub fn execute(
    current_dir: &Path,
    path: &Path,
    aws_profile: Option<String>,
    aws_region: Option<String>,
) -> Result<()> {
    let root = current_dir.join(path);
    std::fs::create_dir_all(&root)
        .with_context(|| format!("Failed to create directory {}", root.display()))?;
    let root = root.canonicalize().unwrap_or(root);

    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "workspace".to_string());

    let dirs = SpkDirs::new();
    let mut global = GlobalConfig::load(&dirs).unwrap_or_else(|e| {
        tracing::warn!("Ignoring unreadable global config: {}", e);
        GlobalConfig::default()
    });

    let aws_profile = aws_profile.or_else(|| global.defaults.aws_profile.clone());
    let aws_region = aws_region.or_else(|| global.defaults.aws_region.clone());

    let workspace = Workspace::create(&root, &name, aws_profile, aws_region)?;
    let code_workspace = match workspace.write_code_workspace(&root) {
        Ok(path) => Some(path),
        Err(e) => {
            output::warning(&format!("Failed to create editor workspace file: {e}"));
            None
        }
    };

    if global.register_workspace(&root) {
        if let Err(e) = global.save(&dirs) {
            output::warning(&format!("Failed to record workspace in global config: {e}"));
        }
    }

    output::success(&format!("Workspace '{}' created at {}", workspace.name, root.display()));
    if let Some(path) = code_workspace {
        output::line(&format!("  VS Code:     {}", path.display()));
    }
    if let Some(profile) = &workspace.aws_profile {
        output::line(&format!("  AWS Profile: {profile}"));
    }
    if let Some(region) = &workspace.aws_region {
        output::line(&format!("  AWS Region:  {region}"));
    }
    output::line("");
    output::line("Next steps:");
    output::line(&format!("  cd {}", root.display()));
    output::line("  spk use <org/repo>");

    Ok(())
}
