//! Build orchestration logic
//!
//! Builds one repository at a time in three phases:
//!
//! 1. Link the target to locally built producers, where available.
//! 2. Run the target's build command.
//! 3. Link the fresh output into consumers that are present on disk.
//!
//! Link problems in phases 1 and 3 are collected as warnings and never fail
//! a build. A failed build command is fatal and stops a build-all run.
//! Built and linked state is re-read from the filesystem on every check.

use std::fmt;
use std::path::Path;

use crate::core::edges::{EdgeTable, ProducerConsumerEdge};
use crate::core::link::{link_package, LinkFs, LinkInspector};
use crate::core::planner::{plan_order, BuildOrder};
use crate::core::project::{resolve_build_command, ProjectType};
use crate::core::registry::{Registry, Repository};
use crate::error::{BuildError, LinkError, ResolverError};

/// How producer packages are resolved during a build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BuildMode {
    /// Link local producer builds when available
    #[default]
    Default,
    /// Only build; consumers keep whatever they resolve today
    ForcePublished,
    /// Same as `ForcePublished`
    NoLink,
}

impl BuildMode {
    /// Whether phases 1 and 3 run
    pub fn links_enabled(self) -> bool {
        matches!(self, Self::Default)
    }
}

/// How a build process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The process exited; `None` means it was killed by a signal
    Exited(Option<i32>),
    /// The run was cancelled before the process exited
    Interrupted,
}

/// Runs a build command in a working directory
#[allow(async_fn_in_trait)]
pub trait BuildRunner {
    /// Run `command` in `working_dir` and wait for it to finish
    async fn run(&self, command: &str, working_dir: &Path) -> std::io::Result<RunOutcome>;
}

/// Which linking phase produced a warning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPhase {
    /// Linking producers into the target before its build
    PreBuild,
    /// Linking the target's output into its consumers
    PostBuild,
}

impl fmt::Display for LinkPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreBuild => f.write_str("pre-build"),
            Self::PostBuild => f.write_str("post-build"),
        }
    }
}

/// What went wrong with one link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkIssue {
    /// The link mutation failed or was refused
    Link(LinkError),
    /// The producer built successfully but left no usable output
    MissingOutput,
}

/// A non-fatal linking problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkWarning {
    pub phase: LinkPhase,
    pub producer: String,
    pub consumer: String,
    pub package: String,
    pub issue: LinkIssue,
}

impl LinkWarning {
    /// True if a real file or directory blocked the link
    pub fn is_conflict(&self) -> bool {
        matches!(self.issue, LinkIssue::Link(LinkError::Conflict { .. }))
    }

    fn new(phase: LinkPhase, edge: &ProducerConsumerEdge, issue: LinkIssue) -> Self {
        Self {
            phase,
            producer: edge.producer.clone(),
            consumer: edge.consumer.clone(),
            package: edge.package.clone(),
            issue,
        }
    }
}

impl fmt::Display for LinkWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} link {} -> {} ({}): ",
            self.phase, self.producer, self.consumer, self.package
        )?;
        match &self.issue {
            LinkIssue::Link(err) => write!(f, "{err}"),
            LinkIssue::MissingOutput => f.write_str("build succeeded but left no package output"),
        }
    }
}

/// A link that was created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    pub producer: String,
    pub consumer: String,
    pub package: String,
}

impl fmt::Display for LinkRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} now uses local {} ({})",
            self.consumer, self.producer, self.package
        )
    }
}

/// Outcome of a successful single-repo build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildResult {
    /// Target name
    pub repo: String,
    /// Command that ran, or `None` when no build command applies
    pub command: Option<String>,
    /// Links created in either phase
    pub linked: Vec<LinkRecord>,
    /// Non-fatal link problems
    pub link_warnings: Vec<LinkWarning>,
}

/// Outcome of a build-all run
#[derive(Debug, Clone, Default)]
pub struct BuildAllResult {
    /// Planned order
    pub order: BuildOrder,
    /// Repos built successfully, in order
    pub built: Vec<String>,
    /// Repos skipped because their working copy is missing
    pub skipped: Vec<String>,
    /// First repo whose build failed
    pub failed_at: Option<String>,
    /// Why it failed
    pub failure: Option<BuildError>,
    /// Links created across all builds
    pub linked: Vec<LinkRecord>,
    /// Link warnings across all builds
    pub link_warnings: Vec<LinkWarning>,
}

impl BuildAllResult {
    /// True if nothing failed
    pub fn succeeded(&self) -> bool {
        self.failed_at.is_none()
    }

    /// Repos after the failure point that were never attempted
    pub fn not_attempted(&self) -> &[String] {
        let names = self.order.names();
        match self.failed_at.as_deref().and_then(|f| self.order.position(f)) {
            Some(pos) => &names[pos + 1..],
            None => &[],
        }
    }
}

/// Builds repositories and keeps producer links in step with the builds
pub struct BuildOrchestrator<'a, F: LinkFs, R: BuildRunner> {
    registry: &'a Registry,
    edges: &'a EdgeTable,
    fs: &'a F,
    runner: &'a R,
}

impl<'a, F: LinkFs, R: BuildRunner> BuildOrchestrator<'a, F, R> {
    /// Create an orchestrator over the given registry and edge table
    pub fn new(registry: &'a Registry, edges: &'a EdgeTable, fs: &'a F, runner: &'a R) -> Self {
        Self {
            registry,
            edges,
            fs,
            runner,
        }
    }

    /// Plan the build-all order
    pub fn plan(&self) -> Result<BuildOrder, ResolverError> {
        plan_order(self.registry, self.edges)
    }

    /// Build one repository
    pub async fn build_one(&self, target: &str, mode: BuildMode) -> Result<BuildResult, BuildError> {
        let repo = self
            .registry
            .get(target)
            .ok_or_else(|| BuildError::NotRegistered {
                name: target.to_string(),
            })?;
        if !self.fs.exists(&repo.location) {
            return Err(BuildError::NotCloned {
                name: repo.name.clone(),
                path: repo.location.clone(),
            });
        }

        let mut result = BuildResult {
            repo: repo.name.clone(),
            ..BuildResult::default()
        };

        if mode.links_enabled() {
            self.link_producers(repo, &mut result);
        } else {
            tracing::info!("Using published packages for {} ({:?})", repo.name, mode);
        }

        result.command = self.run_build(repo).await?;

        if mode.links_enabled() {
            self.propagate(repo, &mut result);
        }

        Ok(result)
    }

    /// Build every registered repository in dependency order
    ///
    /// Stops at the first failed build. Planning errors are returned before
    /// anything runs.
    pub async fn build_all(&self, mode: BuildMode) -> Result<BuildAllResult, ResolverError> {
        let order = self.plan()?;
        let mut summary = BuildAllResult {
            order: order.clone(),
            ..BuildAllResult::default()
        };

        for name in order.iter() {
            let present = self
                .registry
                .get(name)
                .is_some_and(|repo| self.fs.exists(&repo.location));
            if !present {
                tracing::warn!("Skipping {}: not cloned", name);
                summary.skipped.push(name.to_string());
                continue;
            }

            match self.build_one(name, mode).await {
                Ok(result) => {
                    summary.built.push(result.repo);
                    summary.linked.extend(result.linked);
                    summary.link_warnings.extend(result.link_warnings);
                }
                Err(err) => {
                    tracing::error!("{}", err);
                    summary.failed_at = Some(name.to_string());
                    summary.failure = Some(err);
                    break;
                }
            }
        }

        Ok(summary)
    }

    /// Phase 1: point the target at locally built producers
    fn link_producers(&self, target: &Repository, result: &mut BuildResult) {
        let inspector = LinkInspector::new(self.fs);

        for edge in self.edges.producers_for(&target.name) {
            let Some(producer) = self.registry.get(&edge.producer) else {
                tracing::debug!("{} not in workspace, {} stays published", edge.producer, edge.package);
                continue;
            };
            if !inspector.is_built(producer, edge) {
                tracing::info!(
                    "Using published {} (local {} not built)",
                    edge.package,
                    edge.producer
                );
                continue;
            }
            if inspector.is_linked(&target.location, &edge.package) {
                tracing::debug!("{} already linked in {}", edge.package, target.name);
                continue;
            }
            self.link(LinkPhase::PreBuild, edge, producer, target, result);
        }
    }

    /// Phase 3: push the target's fresh output into its consumers
    fn propagate(&self, target: &Repository, result: &mut BuildResult) {
        let inspector = LinkInspector::new(self.fs);

        for edge in self.edges.consumers_of(&target.name) {
            let Some(consumer) = self.registry.get(&edge.consumer) else {
                continue;
            };
            if !self.fs.exists(&consumer.location) {
                tracing::debug!("{} not cloned, not linking {}", consumer.name, edge.package);
                continue;
            }
            if !inspector.is_built(target, edge) {
                tracing::warn!(
                    "{} built but {} has no package output, not linking into {}",
                    target.name,
                    edge.codegen,
                    consumer.name
                );
                result.link_warnings.push(LinkWarning::new(
                    LinkPhase::PostBuild,
                    edge,
                    LinkIssue::MissingOutput,
                ));
                continue;
            }
            if inspector.is_linked(&consumer.location, &edge.package) {
                continue;
            }
            self.link(LinkPhase::PostBuild, edge, target, consumer, result);
        }
    }

    fn link(
        &self,
        phase: LinkPhase,
        edge: &ProducerConsumerEdge,
        producer: &Repository,
        consumer: &Repository,
        result: &mut BuildResult,
    ) {
        let source = edge.output_dir(&producer.location);
        match link_package(self.fs, &source, &consumer.location, &edge.package) {
            Ok(()) => {
                let record = LinkRecord {
                    producer: producer.name.clone(),
                    consumer: consumer.name.clone(),
                    package: edge.package.clone(),
                };
                tracing::info!("Linked: {}", record);
                result.linked.push(record);
            }
            Err(err) => {
                let warning = LinkWarning::new(phase, edge, LinkIssue::Link(err));
                tracing::warn!("{}", warning);
                result.link_warnings.push(warning);
            }
        }
    }

    /// Phase 2: run the build command, if the repo has one
    async fn run_build(&self, repo: &Repository) -> Result<Option<String>, BuildError> {
        let project_type = ProjectType::classify(|marker| self.fs.exists(&repo.location.join(marker)));
        let Some(command) = resolve_build_command(repo, project_type) else {
            tracing::warn!("No build command for {} ({}), skipping build", repo.name, project_type);
            return Ok(None);
        };

        tracing::info!("Building {}: {}", repo.name, command);
        let outcome = self
            .runner
            .run(&command, &repo.location)
            .await
            .map_err(|e| BuildError::Spawn {
                repo: repo.name.clone(),
                error: e.to_string(),
            })?;

        match outcome {
            RunOutcome::Exited(Some(0)) => Ok(Some(command)),
            RunOutcome::Exited(code) => Err(BuildError::BuildFailed {
                repo: repo.name.clone(),
                code,
            }),
            RunOutcome::Interrupted => Err(BuildError::Interrupted {
                repo: repo.name.clone(),
            }),
        }
    }
}
