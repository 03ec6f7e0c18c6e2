//! Remove command implementation
//!
//! Implements `spk remove <name>`: unregister a repo and delete its
//! working copy.

use anyhow::{Context, Result};
use std::path::Path;

use super::WorkspaceContext;
use crate::cli::output;
use crate::infra::filesystem::remove_working_copy;

/// Execute the remove command
pub fn execute(current_dir: &Path, name: &str) -> Result<()> {
    let mut ctx = WorkspaceContext::load(current_dir)?;

    // Fails for unknown repos and for paths outside the workspace
    let repo_dir = ctx.workspace.repo_dir(&ctx.root, name)?;

    ctx.workspace.remove_repo(name)?;
    ctx.save()?;

    let deleted = remove_working_copy(&repo_dir).with_context(|| {
        format!(
            "Removed '{name}' from the manifest but failed to delete {}",
            repo_dir.display()
        )
    })?;

    if deleted {
        output::success(&format!(
            "Removed '{name}' from workspace and deleted {}",
            repo_dir.display()
        ));
    } else {
        output::success(&format!("Removed '{name}' from workspace"));
    }
    Ok(())
}
