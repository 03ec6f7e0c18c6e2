//! Configuration and constants
//!
//! - [`defaults`] - Default values and well-known file names
//! - [`urls`] - Remote URL templates

pub mod defaults;
pub mod urls;
