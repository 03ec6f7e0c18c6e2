//! Infrastructure layer
//!
//! Handles I/O against the outside world: git, the AWS CLI, shell
//! processes and symlinks.

pub mod aws;
pub mod dirs;
pub mod filesystem;
pub mod git;
pub mod links;
pub mod shell;
