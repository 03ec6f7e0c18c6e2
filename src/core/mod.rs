//! Core business logic module
//!
//! Subprocess and filesystem effects are reached through traits
//! ([`link::LinkFs`], [`orchestrator::BuildRunner`], [`sync::GitClient`],
//! [`env::ParameterStore`]) whose real implementations live in
//! [`crate::infra`]. Manifest persistence uses `std::fs` directly.
//!
//! # Submodules
//!
//! - [`registry`] - Registered repositories
//! - [`edges`] - Producer/consumer package edges
//! - [`link`] - Build output and link slot inspection
//! - [`planner`] - Dependency-ordered build planning
//! - [`orchestrator`] - Three-phase build and link
//! - [`project`] - Project type detection and command mapping
//! - [`workspace`] - Workspace manifest (`.spk/workspace.json`)
//! - [`global_config`] - Per-user configuration
//! - [`env`] - Workspace environment and secrets refresh
//! - [`sync`] - Fetch and rebase policy
//! - [`remote`] - Remote URL helpers

pub mod edges;
pub mod env;
pub mod global_config;
pub mod link;
pub mod orchestrator;
pub mod planner;
pub mod project;
pub mod registry;
pub mod remote;
pub mod sync;
pub mod workspace;
