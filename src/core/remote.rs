//! Remote URL helpers
//!
//! Users name repos as a full URL, `org/repo`, or a bare repo name that
//! lives in the configured GitHub organization.

use crate::config::urls::{GITHUB_SSH, HTTPS_PREFIX};

/// Expand a user-supplied remote into a clonable URL
pub fn resolve_remote(remote: &str, default_org: &str) -> String {
    let remote = remote.trim();
    if remote.starts_with("git@") || remote.starts_with(HTTPS_PREFIX) {
        return remote.to_string();
    }
    let org_repo = if remote.contains('/') {
        remote.to_string()
    } else {
        format!("{default_org}/{remote}")
    };
    let org_repo = org_repo.trim_end_matches(".git");
    format!("{GITHUB_SSH}{org_repo}.git")
}

/// Repo name a remote clones into
pub fn repo_name_from_remote(remote: &str) -> String {
    let remote = remote.trim().trim_end_matches('/');
    let last = remote
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(remote);
    last.trim_end_matches(".git").to_string()
}

/// True if `name` can be a working copy directory directly under the root
pub fn is_usable_repo_name(name: &str) -> bool {
    !matches!(name, "" | "." | "..")
}
