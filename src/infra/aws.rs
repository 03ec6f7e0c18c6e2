//! AWS CLI integration
//!
//! Parameter Store reads, SSO login and profile discovery all go through
//! the `aws` executable so the user's SSO session and profiles apply.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::{Command, Stdio};

use regex::Regex;
use serde::Deserialize;

use crate::core::env::ParameterStore;
use crate::error::SecretsError;
use crate::infra::dirs::SpkDirs;

/// Most names `aws ssm get-parameters` accepts in one call
pub const SSM_BATCH_LIMIT: usize = 10;

/// stderr fragments that mean the SSO session has lapsed
const EXPIRED_MARKERS: &[&str] = &[
    "ExpiredToken",
    "Token has expired",
    "token has expired",
    "Error loading SSO Token",
    "The SSO session associated with this profile has expired",
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetParametersResponse {
    #[serde(default)]
    parameters: Vec<Parameter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Parameter {
    name: String,
    value: String,
}

/// [`ParameterStore`] backed by `aws ssm get-parameters`
#[derive(Debug, Clone)]
pub struct AwsCli {
    profile: Option<String>,
    region: String,
}

impl AwsCli {
    /// Create a client for `region`, using `profile` when given
    pub fn new(profile: Option<String>, region: impl Into<String>) -> Self {
        Self {
            profile: profile.filter(|p| !p.is_empty()),
            region: region.into(),
        }
    }

    /// Fail unless the aws CLI is on `PATH`
    pub fn check_cli() -> Result<(), SecretsError> {
        which::which("aws").map(drop).map_err(|_| SecretsError::CliNotFound)
    }

    fn profile_args(&self) -> Vec<String> {
        self.profile
            .iter()
            .flat_map(|p| ["--profile".to_string(), p.clone()])
            .collect()
    }

    fn profile_name(&self) -> String {
        self.profile.clone().unwrap_or_else(|| "default".to_string())
    }

    fn fetch_batch(&self, names: &[String]) -> Result<BTreeMap<String, String>, SecretsError> {
        let output = Command::new("aws")
            .args(["ssm", "get-parameters", "--names"])
            .args(names)
            .args(["--with-decryption", "--output", "json", "--region", &self.region])
            .args(self.profile_args())
            .output()
            .map_err(|e| SecretsError::FetchFailed { error: e.to_string() })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if EXPIRED_MARKERS.iter().any(|m| stderr.contains(m)) {
                return Err(SecretsError::CredentialsExpired {
                    profile: self.profile_name(),
                });
            }
            return Err(SecretsError::FetchFailed { error: stderr });
        }

        parse_parameters(&String::from_utf8_lossy(&output.stdout))
    }

    /// Print the caller identity for the configured profile
    pub fn caller_identity(&self) -> Result<String, SecretsError> {
        let output = Command::new("aws")
            .args(["sts", "get-caller-identity", "--output", "json"])
            .args(self.profile_args())
            .output()
            .map_err(|e| SecretsError::FetchFailed { error: e.to_string() })?;
        if !output.status.success() {
            return Err(SecretsError::FetchFailed {
                error: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Run `aws sso login` interactively
    pub fn sso_login(&self) -> Result<(), SecretsError> {
        tracing::info!("Starting AWS SSO login for profile '{}'", self.profile_name());
        let status = Command::new("aws")
            .args(["sso", "login"])
            .args(self.profile_args())
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| SecretsError::FetchFailed { error: e.to_string() })?;
        if status.success() {
            Ok(())
        } else {
            Err(SecretsError::LoginFailed {
                profile: self.profile_name(),
            })
        }
    }
}

impl AwsCli {
    /// Run `aws configure sso` interactively to add a profile
    pub fn configure_sso() -> Result<(), SecretsError> {
        tracing::info!("Running aws configure sso");
        let status = Command::new("aws")
            .args(["configure", "sso"])
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| SecretsError::FetchFailed { error: e.to_string() })?;
        if status.success() {
            Ok(())
        } else {
            Err(SecretsError::ConfigureFailed)
        }
    }

    /// Make sure the profile has live credentials, logging in if needed
    pub fn ensure_logged_in(&self) -> Result<bool, SecretsError> {
        if self.caller_identity().is_ok() {
            return Ok(false);
        }
        self.sso_login()?;
        self.caller_identity()?;
        Ok(true)
    }
}

impl ParameterStore for AwsCli {
    fn fetch_parameters(&self, names: &[String]) -> Result<BTreeMap<String, String>, SecretsError> {
        let mut values = BTreeMap::new();
        for batch in names.chunks(SSM_BATCH_LIMIT) {
            tracing::debug!("Fetching {} parameters", batch.len());
            values.extend(self.fetch_batch(batch)?);
        }
        Ok(values)
    }
}

/// Parse `aws ssm get-parameters` JSON into name -> value
fn parse_parameters(json: &str) -> Result<BTreeMap<String, String>, SecretsError> {
    let response: GetParametersResponse =
        serde_json::from_str(json).map_err(|e| SecretsError::ParseError { error: e.to_string() })?;
    Ok(response
        .parameters
        .into_iter()
        .map(|p| (p.name, p.value))
        .collect())
}

/// Names of SSO-enabled profiles in an AWS config document
pub fn parse_sso_profiles(config: &str) -> Vec<String> {
    let Ok(header) = Regex::new(r"(?m)^\s*\[(?:profile\s+)?([^\]]+?)\s*\]\s*$") else {
        return Vec::new();
    };

    let headers: Vec<_> = header.captures_iter(config).collect();
    headers
        .iter()
        .enumerate()
        .filter_map(|(i, caps)| {
            let whole = caps.get(0)?;
            let end = headers
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(config.len(), |m| m.start());
            let body = &config[whole.end()..end];
            let name = caps.get(1)?.as_str();
            let is_sso = body.contains("sso_start_url") || body.contains("sso_session");
            (is_sso && !whole.as_str().contains("sso-session")).then(|| name.to_string())
        })
        .collect()
}

/// SSO profiles from the user's AWS config file
pub fn sso_profiles() -> Vec<String> {
    SpkDirs::aws_config_path()
        .as_deref()
        .map(read_profiles)
        .unwrap_or_default()
}

fn read_profiles(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .map(|content| parse_sso_profiles(&content))
        .unwrap_or_default()
}
