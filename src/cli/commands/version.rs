//! Version command implementation

use crate::cli::output::OutputConfig;

/// Build information embedded at compile time
#[derive(Debug, serde::Serialize)]
pub struct VersionInfo {
    pub version: &'static str,
    pub git_sha: Option<&'static str>,
    pub build_timestamp: Option<&'static str>,
    pub target: Option<&'static str>,
}

impl VersionInfo {
    /// Information for this binary
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            git_sha: option_env!("VERGEN_GIT_SHA"),
            build_timestamp: option_env!("VERGEN_BUILD_TIMESTAMP"),
            target: option_env!("VERGEN_CARGO_TARGET_TRIPLE"),
        }
    }
}

/// Execute the version command
pub fn execute() {
    let info = VersionInfo::current();
    if OutputConfig::current().json {
        println!("{}", serde_json::json!(info));
        return;
    }

    println!("spk {}", info.version);
    if let Some(sha) = info.git_sha {
        println!("  commit: {sha}");
    }
    if let Some(timestamp) = info.build_timestamp {
        println!("  built:  {timestamp}");
    }
    if let Some(target) = info.target {
        println!("  target: {target}");
    }
}
