//! Link state
//!
//! Answers "has the producer produced a usable package?" and "does the
//! consumer already resolve the package to the local build?", and swaps a
//! consumer's package slot over to a link when it is safe to do so.
//!
//! All filesystem access goes through [`LinkFs`], so the policy here is
//! testable without touching disk.

use std::path::Path;

use crate::core::edges::{package_slot, ProducerConsumerEdge, COMPILED_MARKER, PACKAGE_DESCRIPTOR};
use crate::core::registry::Repository;
use crate::error::LinkError;

/// Filesystem operations needed for link inspection and mutation
pub trait LinkFs {
    /// True if `path` exists, following links
    fn exists(&self, path: &Path) -> bool;

    /// True if `path` itself is a symbolic link (dangling or not)
    fn is_link(&self, path: &Path) -> bool;

    /// True if anything at all sits at `path`, without following links
    fn occupied(&self, path: &Path) -> bool;

    /// Create a link at `slot` pointing to `source`
    ///
    /// Creates missing parent directories. Fails with
    /// [`LinkError::Conflict`] if `slot` is occupied.
    fn attempt_link(&self, source: &Path, slot: &Path) -> Result<(), LinkError>;

    /// Remove `slot` if it is a link; returns whether anything was removed
    ///
    /// Never removes real files or directories.
    fn remove_if_link(&self, slot: &Path) -> Result<bool, LinkError>;
}

/// Read-only view of producer build outputs and consumer link slots
pub struct LinkInspector<'a, F: LinkFs> {
    fs: &'a F,
}

impl<'a, F: LinkFs> LinkInspector<'a, F> {
    /// Create an inspector over `fs`
    pub fn new(fs: &'a F) -> Self {
        Self { fs }
    }

    /// True if the producer's output directory holds a complete build
    ///
    /// Both the package descriptor and the compiled-output marker must be
    /// present; a partial build is not linkable.
    pub fn is_built(&self, producer: &Repository, edge: &ProducerConsumerEdge) -> bool {
        let output = edge.output_dir(&producer.location);
        self.fs.exists(&output.join(PACKAGE_DESCRIPTOR)) && self.fs.exists(&output.join(COMPILED_MARKER))
    }

    /// True if the consumer's slot for `package` is a link
    ///
    /// A link pointing somewhere unexpected still counts; callers never
    /// replace a link just because it points elsewhere.
    pub fn is_linked(&self, consumer_location: &Path, package: &str) -> bool {
        self.fs.is_link(&package_slot(consumer_location, package))
    }
}

/// Point `<consumer>/node_modules/<package>` at `source`
///
/// An existing link is replaced. A real file or directory in the slot is
/// left alone and reported as [`LinkError::Conflict`].
pub fn link_package<F: LinkFs>(
    fs: &F,
    source: &Path,
    consumer_location: &Path,
    package: &str,
) -> Result<(), LinkError> {
    replace_link(fs, source, &package_slot(consumer_location, package))
}

/// Create or replace the link at `slot`, refusing to touch real entries
pub fn replace_link<F: LinkFs>(fs: &F, source: &Path, slot: &Path) -> Result<(), LinkError> {
    if fs.is_link(slot) {
        fs.remove_if_link(slot)?;
    } else if fs.occupied(slot) {
        return Err(LinkError::Conflict {
            slot: slot.to_path_buf(),
        });
    }
    fs.attempt_link(source, slot)
}
