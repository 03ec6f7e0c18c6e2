//! Filesystem operations
//!
//! Write and delete helpers that map `std::io` failures onto
//! [`FilesystemError`].

use std::path::Path;

use crate::error::FilesystemError;

/// Write `content` to `path`, creating parent directories
pub fn write_file(path: &Path, content: &str) -> Result<(), FilesystemError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| FilesystemError::CreateDir {
            path: parent.to_path_buf(),
            error: e.to_string(),
        })?;
    }
    std::fs::write(path, content).map_err(|e| FilesystemError::WriteFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Delete a repo working copy
///
/// A symlinked working copy only loses the link, never the directory it
/// points at. Returns `false` if nothing was there.
pub fn remove_working_copy(path: &Path) -> Result<bool, FilesystemError> {
    let remove_error = |e: std::io::Error| FilesystemError::RemoveDir {
        path: path.to_path_buf(),
        error: e.to_string(),
    };

    let Ok(meta) = std::fs::symlink_metadata(path) else {
        return Ok(false);
    };
    if meta.file_type().is_symlink() || meta.is_file() {
        std::fs::remove_file(path).map_err(remove_error)?;
    } else {
        std::fs::remove_dir_all(path).map_err(remove_error)?;
    }
    tracing::debug!("Removed {}", path.display());
    Ok(true)
}
