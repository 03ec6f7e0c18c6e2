//! Symbolic links on the real filesystem

use std::path::Path;

use crate::core::link::LinkFs;
use crate::error::LinkError;

/// [`LinkFs`] backed by `std::fs` symlinks
#[derive(Debug, Clone, Copy, Default)]
pub struct SymlinkFs;

impl SymlinkFs {
    /// Create a new symlink filesystem
    pub fn new() -> Self {
        Self
    }
}

fn failed(source: &Path, slot: &Path, error: &std::io::Error) -> LinkError {
    LinkError::Failed {
        slot: slot.to_path_buf(),
        source_dir: source.to_path_buf(),
        error: error.to_string(),
    }
}

#[cfg(unix)]
fn symlink(source: &Path, slot: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(source, slot)
}

#[cfg(windows)]
fn symlink(source: &Path, slot: &Path) -> std::io::Result<()> {
    // Relative targets resolve against the link's directory
    let resolved = match slot.parent() {
        Some(parent) if source.is_relative() => parent.join(source),
        _ => source.to_path_buf(),
    };
    if resolved.is_dir() {
        std::os::windows::fs::symlink_dir(source, slot)
    } else {
        std::os::windows::fs::symlink_file(source, slot)
    }
}

impl LinkFs for SymlinkFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_link(&self, path: &Path) -> bool {
        std::fs::symlink_metadata(path).is_ok_and(|meta| meta.file_type().is_symlink())
    }

    fn occupied(&self, path: &Path) -> bool {
        std::fs::symlink_metadata(path).is_ok()
    }

    fn attempt_link(&self, source: &Path, slot: &Path) -> Result<(), LinkError> {
        if self.occupied(slot) {
            return Err(LinkError::Conflict {
                slot: slot.to_path_buf(),
            });
        }
        if let Some(parent) = slot.parent() {
            std::fs::create_dir_all(parent).map_err(|e| failed(source, slot, &e))?;
        }
        tracing::debug!("Linking {} -> {}", slot.display(), source.display());
        symlink(source, slot).map_err(|e| failed(source, slot, &e))
    }

    fn remove_if_link(&self, slot: &Path) -> Result<bool, LinkError> {
        if !self.is_link(slot) {
            return Ok(false);
        }
        // Directory symlinks on Windows need remove_dir
        std::fs::remove_file(slot)
            .or_else(|_| std::fs::remove_dir(slot))
            .map_err(|e| failed(slot, slot, &e))?;
        Ok(true)
    }
}
