//! Default configuration values

/// Per-workspace metadata directory
pub const SPK_DIR: &str = ".spk";

/// Workspace manifest file name inside [`SPK_DIR`]
pub const MANIFEST_FILE: &str = "workspace.json";

/// Shared environment file at the workspace root
pub const ENV_FILE: &str = ".env";

/// Per-repo file declaring consumed producer packages
pub const REPO_CONFIG_FILE: &str = "spk.config.json";

/// GitHub organization used when `spk use` gets a bare repo name
pub const DEFAULT_GITHUB_ORG: &str = "Spark-Rewards";

/// AWS region used when neither the workspace nor the user sets one
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// SSM environment used when neither `--env` nor the manifest sets one
pub const DEFAULT_SSM_ENV: &str = "beta";

/// Branch assumed when the remote HEAD cannot be resolved
pub const DEFAULT_BRANCH: &str = "main";

/// Number of attempts for network git operations
pub const MAX_FETCH_ATTEMPTS: u32 = 3;

/// Longest env value shown by `spk env` before truncation
pub const ENV_DISPLAY_WIDTH: usize = 50;

/// Minimum proptest iterations
pub const MIN_PROPTEST_ITERATIONS: u32 = 100;
