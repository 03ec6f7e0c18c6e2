//! Workspace environment
//!
//! The workspace keeps one `.env` at its root. It is refreshed from the
//! parameter store, overlaid with manifest `env` entries, injected into
//! every command spk runs, and linked into each repo.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use crate::config::defaults::{DEFAULT_AWS_REGION, DEFAULT_SSM_ENV, ENV_FILE};
use crate::config::urls::SSM_APP_PREFIX;
use crate::core::link::{replace_link, LinkFs};
use crate::core::registry::Registry;
use crate::core::workspace::{env_path, Workspace};
use crate::error::{FilesystemError, LinkError, SecretsError, SpkError};
use crate::infra::filesystem::write_file;

/// Parameter suffixes fetched on refresh, with the env key each maps to
pub const PARAMETERS: &[(&str, &str)] = &[
    ("customerUserPoolId", "USERPOOL_ID"),
    ("customerWebClientId", "WEB_CLIENT_ID"),
    ("identityPoolIdCustomer", "IDENTITY_POOL_ID"),
    ("businessUserPoolId", "BUSINESS_USERPOOL_ID"),
    ("businessWebClientId", "BUSINESS_WEB_CLIENT_ID"),
    ("identityPoolIdBusiness", "BUSINESS_IDENTITY_POOL_ID"),
    ("squareClientId", "SQUARE_CLIENT_ID"),
    ("cloverAppId", "CLOVER_APP_ID"),
    ("appConfig", "APP_CONFIG_VALUES"),
    ("googleApiKey_Android", "GOOGLE_API_KEY_ANDROID"),
    ("googleMapsKey", "GOOGLE_MAPS_KEY"),
    ("githubToken", "GITHUB_TOKEN"),
    ("stripePublicKey", "STRIPE_PUBLIC_KEY"),
];

/// Public aliases: (alias, preferred source, fallback source)
const PUBLIC_ALIASES: &[(&str, &str, Option<&str>)] = &[
    ("NEXT_PUBLIC_USERPOOL_ID", "BUSINESS_USERPOOL_ID", Some("USERPOOL_ID")),
    ("NEXT_PUBLIC_WEB_CLIENT_ID", "BUSINESS_WEB_CLIENT_ID", Some("WEB_CLIENT_ID")),
    (
        "NEXT_PUBLIC_IDENTITY_POOL_ID",
        "BUSINESS_IDENTITY_POOL_ID",
        Some("IDENTITY_POOL_ID"),
    ),
    ("NEXT_PUBLIC_SQUARE_CLIENT", "SQUARE_CLIENT_ID", None),
    ("NEXT_PUBLIC_CLOVER_APP_ID", "CLOVER_APP_ID", None),
    ("NEXT_PUBLIC_GOOGLE_MAPS_API_KEY", "GOOGLE_MAPS_KEY", None),
    ("NEXT_PUBLIC_STRIPE_KEY", "STRIPE_PUBLIC_KEY", None),
];

/// Key of the GitHub token in the environment
pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";

/// Remote source of secret parameters
pub trait ParameterStore {
    /// Fetch parameters by full name; missing parameters are simply absent
    fn fetch_parameters(&self, names: &[String]) -> Result<BTreeMap<String, String>, SecretsError>;
}

/// Full parameter name for `suffix` in `env_name`
pub fn parameter_name(env_name: &str, suffix: &str) -> String {
    format!("{SSM_APP_PREFIX}/{env_name}/{suffix}")
}

/// Turn fetched parameters (keyed by suffix) into env entries
///
/// Unknown suffixes are kept under their own name.
pub fn derive_env(
    by_suffix: &BTreeMap<String, String>,
    region: &str,
    env_name: &str,
) -> BTreeMap<String, String> {
    let mut vars: BTreeMap<String, String> = by_suffix
        .iter()
        .map(|(suffix, value)| {
            let key = PARAMETERS
                .iter()
                .find(|(s, _)| s == suffix)
                .map_or_else(|| suffix.clone(), |(_, key)| (*key).to_string());
            (key, value.clone())
        })
        .collect();

    for (alias, preferred, fallback) in PUBLIC_ALIASES {
        let value = non_empty(&vars, preferred).or_else(|| fallback.and_then(|f| non_empty(&vars, f)));
        if let Some(value) = value {
            vars.insert((*alias).to_string(), value);
        }
    }

    vars.insert("AWS_REGION".to_string(), region.to_string());
    vars.insert("NEXT_PUBLIC_AWS_REGION".to_string(), region.to_string());
    vars.insert("APP_ENV".to_string(), env_name.to_string());
    vars.insert("NEXT_PUBLIC_APP_ENV".to_string(), env_name.to_string());
    vars
}

fn non_empty(vars: &BTreeMap<String, String>, key: &str) -> Option<String> {
    vars.get(key).filter(|v| !v.is_empty()).cloned()
}

/// What a refresh wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Parameter environment that was read
    pub env_name: String,
    /// Number of parameters the store returned
    pub fetched: usize,
    /// Path of the updated `.env`
    pub path: PathBuf,
    /// Number of variables now in `.env`
    pub total: usize,
}

/// Parameter environment to read: explicit, then manifest, then default
pub fn resolve_env_name(workspace: &Workspace, requested: Option<&str>) -> String {
    requested
        .filter(|e| !e.is_empty())
        .or(workspace.ssm_env_path.as_deref())
        .unwrap_or(DEFAULT_SSM_ENV)
        .to_string()
}

/// Fetch parameters and merge them into the workspace `.env`
pub fn refresh_env<S: ParameterStore>(
    store: &S,
    root: &Path,
    workspace: &Workspace,
    requested_env: Option<&str>,
) -> Result<RefreshSummary, SpkError> {
    let env_name = resolve_env_name(workspace, requested_env);
    let region = workspace.aws_region.as_deref().unwrap_or(DEFAULT_AWS_REGION);

    let names: Vec<String> = PARAMETERS
        .iter()
        .map(|(suffix, _)| parameter_name(&env_name, suffix))
        .collect();
    tracing::info!(
        "Fetching environment from {}/{}/ ({} parameters)",
        SSM_APP_PREFIX,
        env_name,
        names.len()
    );
    let fetched = store.fetch_parameters(&names)?;

    let prefix = format!("{SSM_APP_PREFIX}/{env_name}/");
    let by_suffix: BTreeMap<String, String> = fetched
        .iter()
        .map(|(name, value)| {
            let suffix = name.strip_prefix(&prefix).unwrap_or(name);
            (suffix.to_string(), value.trim().to_string())
        })
        .collect();

    let mut vars = derive_env(&by_suffix, region, &env_name);
    vars.extend(workspace.env.clone());

    let path = env_path(root);
    let merged = merge_env_file(&path, &vars)?;
    Ok(RefreshSummary {
        env_name,
        fetched: fetched.len(),
        path,
        total: merged.len(),
    })
}

/// Read a `.env` file; a missing file is empty
pub fn read_env_file(path: &Path) -> Result<BTreeMap<String, String>, FilesystemError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let read_error = |e: &dyn std::fmt::Display| FilesystemError::ReadFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    };

    let mut vars = BTreeMap::new();
    for item in dotenvy::from_path_iter(path).map_err(|e| read_error(&e))? {
        let (key, value) = item.map_err(|e| read_error(&e))?;
        vars.insert(key, value);
    }
    Ok(vars)
}

/// Write `vars` as a `.env` file, one `KEY=value` line per entry in key order
pub fn write_env_file(path: &Path, vars: &BTreeMap<String, String>) -> Result<(), FilesystemError> {
    let content: String = vars
        .iter()
        .map(|(key, value)| format!("{key}={}\n", quote_value(value)))
        .collect();
    write_file(path, &content)
}

/// Overlay `updates` on the existing file and write it back
pub fn merge_env_file(
    path: &Path,
    updates: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>, FilesystemError> {
    let mut vars = read_env_file(path)?;
    vars.extend(updates.iter().map(|(k, v)| (k.clone(), v.clone())));
    write_env_file(path, &vars)?;
    Ok(vars)
}

/// Quote a value so it reads back unchanged
fn quote_value(value: &str) -> String {
    let plain = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "-_./:,@+%".contains(c));
    if plain {
        value.to_string()
    } else if !value.contains('\'') && !value.contains('\n') {
        format!("'{value}'")
    } else {
        let escaped = value
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('$', "\\$")
            .replace('\n', "\\n");
        format!("\"{escaped}\"")
    }
}

/// Parse `KEY=VALUE` arguments
pub fn parse_assignments(args: &[String]) -> Result<BTreeMap<String, String>, SpkError> {
    args.iter()
        .map(|arg| match arg.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.to_string()))
            }
            _ => Err(SpkError::Generic(format!(
                "Invalid assignment '{arg}', expected KEY=VALUE"
            ))),
        })
        .collect()
}

/// Environment for commands run inside the workspace
///
/// `.env` entries overlaid by the manifest `env`.
pub fn workspace_env(root: &Path, workspace: &Workspace) -> Result<BTreeMap<String, String>, FilesystemError> {
    let mut vars = read_env_file(&env_path(root))?;
    vars.extend(workspace.env.clone());
    Ok(vars)
}

/// Fill in `GITHUB_TOKEN` from `lookup` when nothing provides it yet
///
/// Returns true if a token was added.
pub fn ensure_github_token(
    vars: &mut BTreeMap<String, String>,
    process_has_token: bool,
    lookup: impl FnOnce() -> Option<String>,
) -> bool {
    if process_has_token || vars.contains_key(GITHUB_TOKEN) {
        return false;
    }
    match lookup().map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
        Some(token) => {
            vars.insert(GITHUB_TOKEN.to_string(), token);
            true
        }
        None => false,
    }
}

/// Shorten a value for display
pub fn truncate_for_display(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let kept: String = value.chars().take(width.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Shell `export` statement for one variable
pub fn export_line(key: &str, value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('$', "\\$")
        .replace('`', "\\`");
    format!("export {key}=\"{escaped}\"")
}

/// Outcome of linking repo `.env` files to the workspace one
#[derive(Debug, Default)]
pub struct EnvLinkReport {
    /// Repos that now link to the workspace `.env`
    pub linked: Vec<String>,
    /// Repos that keep a real `.env` of their own
    pub kept: Vec<String>,
    /// Repos that are not cloned
    pub missing: Vec<String>,
    /// Repos where linking failed
    pub failed: Vec<(String, LinkError)>,
}

/// Link `<repo>/.env` to the workspace `.env` for every cloned repo
///
/// Links are relative so the workspace can be moved. A real `.env` in a
/// repo is never replaced.
pub fn link_env_files<F: LinkFs>(fs: &F, root: &Path, registry: &Registry) -> EnvLinkReport {
    let mut report = EnvLinkReport::default();
    for repo in registry.all() {
        if !fs.exists(&repo.location) {
            report.missing.push(repo.name.clone());
            continue;
        }
        let slot = repo.location.join(ENV_FILE);
        let target = relative_to_root(root, &repo.location).join(ENV_FILE);
        match replace_link(fs, &target, &slot) {
            Ok(()) => report.linked.push(repo.name.clone()),
            Err(LinkError::Conflict { .. }) => report.kept.push(repo.name.clone()),
            Err(err) => report.failed.push((repo.name.clone(), err)),
        }
    }
    report
}

/// `../` repeated once per directory between `root` and `dir`
fn relative_to_root(root: &Path, dir: &Path) -> PathBuf {
    let depth = dir
        .strip_prefix(root)
        .map(|rel| {
            rel.components()
                .filter(|c| matches!(c, Component::Normal(_)))
                .count()
        })
        .unwrap_or(0);
    (0..depth).map(|_| Component::ParentDir).collect()
}
