//! Remote URL templates

/// SSH host prefix for GitHub remotes
pub const GITHUB_SSH: &str = "git@github.com:";

/// HTTPS prefix accepted as an already-complete remote
pub const HTTPS_PREFIX: &str = "https://";

/// SSM parameter path prefix; the environment name follows
pub const SSM_APP_PREFIX: &str = "/app";
