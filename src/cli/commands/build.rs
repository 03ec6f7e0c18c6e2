//! Build command implementation
//!
//! Implements `spk build`: build one repo or the whole workspace in
//! dependency order, linking local producer packages into consumers.

use anyhow::{Context, Result};
use std::path::Path;
use tokio_util::sync::CancellationToken;

use super::WorkspaceContext;
use crate::cli::output::{self, status, OutputConfig};
use crate::core::orchestrator::{
    BuildAllResult, BuildMode, BuildOrchestrator, BuildResult, LinkRecord, LinkWarning,
};
use crate::core::planner::BuildOrder;
use crate::infra::links::SymlinkFs;
use crate::infra::shell::ShellRunner;

/// Options for `spk build`
#[derive(Debug, Default)]
pub struct BuildOptions {
    /// Repo to build
    pub repo: Option<String>,
    /// Build every repo
    pub all: bool,
    /// Skip linking
    pub no_link: bool,
    /// Force published packages
    pub published: bool,
    /// Only print the order
    pub plan: bool,
}

impl BuildOptions {
    /// Linking mode selected by the flags
    pub fn mode(&self) -> BuildMode {
        if self.published {
            BuildMode::ForcePublished
        } else if self.no_link {
            BuildMode::NoLink
        } else {
            BuildMode::Default
        }
    }
}

/// Execute the build command
pub async fn execute(
    current_dir: &Path,
    options: BuildOptions,
    cancel: CancellationToken,
) -> Result<()> {
    let ctx = WorkspaceContext::load(current_dir)?;
    let registry = ctx.registry();
    let edges = ctx.edges(&registry)?;
    let fs = SymlinkFs::new();
    let runner = ShellRunner::new(cancel).with_env(ctx.subprocess_env()?);
    let orchestrator = BuildOrchestrator::new(&registry, &edges, &fs, &runner);

    if options.plan {
        let order = orchestrator.plan()?;
        print_plan(&order);
        return Ok(());
    }

    let mode = options.mode();
    if mode != BuildMode::Default {
        output::info("Linking disabled, consumers keep their installed packages");
    }

    if options.all {
        if registry.is_empty() {
            output::info("No repos in workspace");
            return Ok(());
        }
        let result = orchestrator.build_all(mode).await?;
        return report_all(result);
    }

    let target = match options.repo {
        Some(name) => name,
        None => registry
            .containing(current_dir)
            .map(|repo| repo.name.clone())
            .context("Not inside a repo. Pass a repo name or use --all")?,
    };

    output::info(&format!("Building {target}"));
    let result = orchestrator.build_one(&target, mode).await?;
    report_one(&result);
    Ok(())
}

fn print_plan(order: &BuildOrder) {
    if OutputConfig::current().json {
        println!("{}", serde_json::json!({ "order": order.names() }));
        return;
    }
    println!("Build order:");
    for (i, name) in order.iter().enumerate() {
        println!("  {}. {name}", i + 1);
    }
}

fn print_links(linked: &[LinkRecord], warnings: &[LinkWarning]) {
    for record in linked {
        output::line(&format!("  {} linked {record}", status::SUCCESS));
    }
    for warning in warnings {
        output::warning(&warning.to_string());
    }
}

fn report_one(result: &BuildResult) {
    if OutputConfig::current().json {
        println!(
            "{}",
            serde_json::json!({
                "repo": result.repo,
                "command": result.command,
                "linked": result.linked.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "warnings": result.link_warnings.iter().map(ToString::to_string).collect::<Vec<_>>(),
            })
        );
        return;
    }
    print_links(&result.linked, &result.link_warnings);
    match &result.command {
        Some(_) => output::success(&format!("Built {}", result.repo)),
        None => output::line(&format!(
            "{} {}: no build command, skipped",
            status::SKIP,
            result.repo
        )),
    }
}

fn report_all(result: BuildAllResult) -> Result<()> {
    if OutputConfig::current().json {
        println!(
            "{}",
            serde_json::json!({
                "order": result.order.names(),
                "built": result.built,
                "skipped": result.skipped,
                "failed": result.failed_at,
                "not_attempted": result.not_attempted(),
                "linked": result.linked.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "warnings": result.link_warnings.iter().map(ToString::to_string).collect::<Vec<_>>(),
            })
        );
    } else {
        print_links(&result.linked, &result.link_warnings);
        for name in &result.built {
            output::line(&format!("{} {name}", status::SUCCESS));
        }
        for name in &result.skipped {
            output::line(&format!("{} {name}: not cloned", status::SKIP));
        }
        if let Some(name) = &result.failed_at {
            output::line(&format!("{} {name}", status::ERROR));
        }
        for name in result.not_attempted() {
            output::line(&format!("{} {name}: not attempted", status::SKIP));
        }
    }

    match result.failure {
        Some(failure) => Err(failure).context("Workspace build stopped"),
        None => {
            output::success(&format!(
                "Built {} of {} repos",
                result.built.len(),
                result.order.len()
            ));
            Ok(())
        }
    }
}
