//! spk - multi-repo workspace manager
//!
//! Manages a set of git repositories as one workspace: clones and syncs
//! them, builds them in dependency order, and links locally built model
//! packages into the APIs that consume them.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Business logic
//! - [`infra`] - Infrastructure layer (git, AWS, processes, symlinks)
//! - [`config`] - Configuration and constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;

#[cfg(test)]
pub mod test_utils;
