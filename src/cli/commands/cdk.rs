//! CDK command implementation
//!
//! Implements `spk cdk [args...]`: run the AWS CDK CLI in the repo that
//! holds the workspace's CDK app, passing every argument through.

use anyhow::{bail, Context, Result};
use std::path::Path;
use tokio_util::sync::CancellationToken;

use super::WorkspaceContext;
use crate::core::orchestrator::RunOutcome;
use crate::core::registry::{Registry, Repository};
use crate::infra::shell::ShellRunner;

/// File that marks a CDK app
const CDK_CONFIG_FILE: &str = "cdk.json";

/// Execute the cdk command
pub async fn execute(current_dir: &Path, args: Vec<String>, cancel: CancellationToken) -> Result<()> {
    let ctx = WorkspaceContext::load(current_dir)?;
    let registry = ctx.registry();

    let Some(repo) = find_cdk_repo(&registry, current_dir) else {
        bail!(
            "No CDK app ({CDK_CONFIG_FILE}) found in the workspace. \
             Run from the CDK repo or add {CDK_CONFIG_FILE} to one"
        );
    };
    let cdk = which::which("cdk")
        .map_err(|_| anyhow::anyhow!("cdk not found in PATH. Install it with: npm install -g aws-cdk"))?;
    tracing::info!("Running cdk in {}", repo.name);

    let runner = ShellRunner::new(cancel).with_env(ctx.subprocess_env()?);
    let outcome = runner
        .run_program(&cdk, &args, &repo.location)
        .await
        .with_context(|| format!("Failed to start {}", cdk.display()))?;
    match outcome {
        RunOutcome::Exited(Some(0)) => Ok(()),
        RunOutcome::Exited(Some(code)) => bail!("cdk exited with status {code}"),
        RunOutcome::Exited(None) => bail!("cdk was terminated by a signal"),
        RunOutcome::Interrupted => bail!("cdk was interrupted"),
    }
}

/// The CDK repo: the one holding `current_dir` if it has a CDK app,
/// otherwise the first repo by name that does
fn find_cdk_repo<'a>(registry: &'a Registry, current_dir: &Path) -> Option<&'a Repository> {
    let has_app = |repo: &&Repository| repo.location.join(CDK_CONFIG_FILE).is_file();
    registry
        .containing(current_dir)
        .filter(has_app)
        .or_else(|| registry.all().find(has_app))
}
