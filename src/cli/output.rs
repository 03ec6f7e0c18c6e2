//! Output formatting and progress indicators
//!
//! Spinners, status-prefixed messages and error display. Everything here
//! honours the global `--quiet` and `--json` flags.

use std::sync::OnceLock;

use indicatif::{ProgressBar, ProgressStyle};

static OUTPUT: OnceLock<OutputConfig> = OnceLock::new();

/// Global output settings taken from the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputConfig {
    /// Suppress everything but errors
    pub quiet: bool,
    /// Machine-readable output
    pub json: bool,
    /// `-v` count
    pub verbose: u8,
}

impl OutputConfig {
    /// Create an output configuration
    pub fn new(quiet: bool, json: bool, verbose: u8) -> Self {
        Self {
            quiet,
            json,
            verbose,
        }
    }

    /// Install as the process-wide configuration
    ///
    /// Only the first call has an effect.
    pub fn apply_global(self) {
        let _ = OUTPUT.set(self);
    }

    /// The process-wide configuration, or the default if none was applied
    pub fn current() -> Self {
        OUTPUT.get().copied().unwrap_or_default()
    }

    /// Tracing directive for the verbosity level
    pub fn log_level(self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            _ => tracing::Level::DEBUG,
        }
    }

    /// True if human-oriented progress and status lines should print
    pub fn shows_status(self) -> bool {
        !self.quiet && !self.json
    }
}

/// Create a spinner for operations with unknown duration
///
/// Hidden in quiet or JSON mode.
pub fn create_spinner(message: &str) -> ProgressBar {
    if !OutputConfig::current().shows_status() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.blue} {msg}")
            .expect("Invalid spinner template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// Print a success line
pub fn success(message: &str) {
    if OutputConfig::current().shows_status() {
        println!("{} {message}", status::SUCCESS);
    }
}

/// Print an informational line
pub fn info(message: &str) {
    if OutputConfig::current().shows_status() {
        println!("{} {message}", status::INFO);
    }
}

/// Print a warning to stderr
pub fn warning(message: &str) {
    if !OutputConfig::current().quiet {
        eprintln!("{} {message}", status::WARNING);
    }
}

/// Print a plain line unless quiet
pub fn line(message: &str) {
    if OutputConfig::current().shows_status() {
        println!("{message}");
    }
}

/// Print an error and its causes to stderr
pub fn display_error(error: &anyhow::Error) {
    if OutputConfig::current().json {
        let causes: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
        eprintln!(
            "{}",
            serde_json::json!({ "error": error.to_string(), "causes": causes })
        );
        return;
    }
    eprintln!("{} Error: {error}", status::ERROR);
    for cause in error.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }
}

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";

    /// Info prefix (blue circle)
    pub const INFO: &str = "ℹ";

    /// Skipped item prefix
    pub const SKIP: &str = "-";
}
