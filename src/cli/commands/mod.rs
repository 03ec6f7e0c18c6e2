//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod build;
pub mod cdk;
pub mod config;
pub mod create;
pub mod env;
pub mod list;
pub mod login;
pub mod remove;
pub mod run;
pub mod sync;
pub mod use_repo;
pub mod version;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use tokio_util::sync::CancellationToken;

use crate::core::edges::{workspace_edges, EdgeTable};
use crate::core::env::{ensure_github_token, workspace_env, GITHUB_TOKEN};
use crate::core::registry::Registry;
use crate::core::workspace::{find_root, Workspace};
use crate::infra::shell::github_token_from_gh;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new workspace
    Create {
        /// Workspace directory (created if missing)
        path: PathBuf,

        /// AWS SSO profile used for secrets
        #[arg(long)]
        aws_profile: Option<String>,

        /// AWS region used for secrets
        #[arg(long)]
        aws_region: Option<String>,
    },

    /// Clone a repository into the workspace and register it
    Use {
        /// Repo name, org/repo, or full git URL
        repo: String,

        /// Build command for this repo
        #[arg(long = "build")]
        build: Option<String>,

        /// Repos that must build first (comma separated)
        #[arg(long, value_delimiter = ',')]
        deps: Vec<String>,
    },

    /// List repos with branch and status
    #[command(alias = "ls")]
    List,

    /// Show workspace settings, AWS profiles and repos
    Workspace {
        /// Set the workspace AWS profile, logging in to SSO if needed
        #[arg(long)]
        profile: Option<String>,

        #[command(subcommand)]
        command: Option<WorkspaceCommands>,
    },

    /// Unregister a repo and delete its working copy
    Remove {
        /// Repo name
        name: String,
    },

    /// Fetch and rebase repos onto their remote branch
    Sync {
        /// Only sync this repo
        repo: Option<String>,

        /// Branch to sync against
        #[arg(long)]
        branch: Option<String>,

        /// Use git pull instead of rebase
        #[arg(long)]
        no_rebase: bool,

        /// Refresh .env from this parameter environment (e.g. beta, prod)
        #[arg(long)]
        env: Option<String>,

        /// Run npm install in Node repos afterwards
        #[arg(short, long)]
        install: bool,
    },

    /// Build repos, linking local model packages into consumers
    Build {
        /// Repo to build (defaults to the repo containing the current directory)
        repo: Option<String>,

        /// Build every repo in dependency order
        #[arg(long)]
        all: bool,

        /// Do not link local packages
        #[arg(long)]
        no_link: bool,

        /// Force use of published packages
        #[arg(long)]
        published: bool,

        /// Print the build order without building
        #[arg(long)]
        plan: bool,
    },

    /// Run repo tests
    Test {
        /// Repo to test
        repo: Option<String>,

        /// Test every repo
        #[arg(long)]
        all: bool,

        /// Run tests in watch mode
        #[arg(long)]
        watch: bool,
    },

    /// Run the AWS CDK CLI in the workspace's CDK app repo
    #[command(disable_help_flag = true)]
    Cdk {
        /// Arguments passed through to cdk
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Run a script or command with the workspace environment
    Run {
        /// Script name inside a repo, or a command outside one
        script: Option<String>,

        /// Extra arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Show or manage the workspace environment
    Env {
        #[command(subcommand)]
        command: Option<EnvCommands>,
    },

    /// View or change global defaults
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Log in to AWS SSO
    Login {
        /// AWS profile (overrides the workspace setting)
        #[arg(long)]
        profile: Option<String>,
    },

    /// Show version and build information
    Version,
}

/// Environment subcommands
#[derive(Subcommand, Debug)]
pub enum EnvCommands {
    /// Show variables (values truncated)
    Show,

    /// Set variables in the workspace .env
    Set {
        /// KEY=VALUE pairs
        #[arg(required = true)]
        assignments: Vec<String>,
    },

    /// Print shell export statements
    Export,

    /// Symlink each repo's .env to the workspace .env
    Link,

    /// Refresh .env from the parameter store
    Refresh {
        /// Parameter environment (e.g. beta, prod)
        #[arg(long)]
        env: Option<String>,
    },
}

/// Workspace subcommands
#[derive(Subcommand, Debug)]
pub enum WorkspaceCommands {
    /// Set or list the AWS profile for this workspace
    Configure {
        /// List SSO profiles, running aws configure sso if there are none
        #[arg(long)]
        list: bool,

        /// Set the workspace AWS profile
        #[arg(long)]
        profile: Option<String>,

        #[command(subcommand)]
        command: Option<ConfigureCommands>,
    },
}

/// `spk workspace configure` subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigureCommands {
    /// Add a new AWS SSO profile (runs aws configure sso)
    Sso,
}

/// Global config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show global defaults and known workspaces
    View,

    /// Set global defaults
    Set {
        /// Default GitHub organization
        #[arg(long)]
        org: Option<String>,

        /// Default AWS profile
        #[arg(long)]
        aws_profile: Option<String>,

        /// Default AWS region
        #[arg(long)]
        aws_region: Option<String>,
    },
}

impl Commands {
    /// Execute the command
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let current_dir = std::env::current_dir()?;
        match self {
            Self::Create {
                path,
                aws_profile,
                aws_region,
            } => create::execute(&current_dir, &path, aws_profile, aws_region),
            Self::Use { repo, build, deps } => use_repo::execute(&current_dir, &repo, build, deps),
            Self::List => list::execute_list(&current_dir),
            Self::Workspace { profile, command } => match command {
                None => list::execute_workspace(&current_dir, profile),
                Some(WorkspaceCommands::Configure {
                    command: Some(ConfigureCommands::Sso),
                    ..
                }) => list::execute_configure_sso(),
                Some(WorkspaceCommands::Configure { profile: Some(profile), .. }) => {
                    list::execute_set_profile(&current_dir, &profile)
                }
                Some(WorkspaceCommands::Configure { list: true, .. }) => {
                    list::execute_list_profiles(&current_dir)
                }
                Some(WorkspaceCommands::Configure { .. }) => {
                    bail!("Nothing to configure. Use --list, --profile <name> or 'sso'")
                }
            },
            Self::Remove { name } => remove::execute(&current_dir, &name),
            Self::Sync {
                repo,
                branch,
                no_rebase,
                env,
                install,
            } => {
                let options = sync::SyncCommandOptions {
                    repo,
                    branch,
                    no_rebase,
                    env,
                    install,
                };
                sync::execute(&current_dir, options, cancel).await
            }
            Self::Build {
                repo,
                all,
                no_link,
                published,
                plan,
            } => {
                let options = build::BuildOptions {
                    repo,
                    all,
                    no_link,
                    published,
                    plan,
                };
                build::execute(&current_dir, options, cancel).await
            }
            Self::Test { repo, all, watch } => {
                test::execute(&current_dir, repo, all, watch, cancel).await
            }
            Self::Cdk { args } => cdk::execute(&current_dir, args, cancel).await,
            Self::Run { script, args } => run::execute(&current_dir, script, args, cancel).await,
            Self::Env { command } => match command.unwrap_or(EnvCommands::Show) {
                EnvCommands::Show => env::execute_show(&current_dir),
                EnvCommands::Set { assignments } => env::execute_set(&current_dir, &assignments),
                EnvCommands::Export => env::execute_export(&current_dir),
                EnvCommands::Link => env::execute_link(&current_dir),
                EnvCommands::Refresh { env: env_name } => {
                    env::execute_refresh(&current_dir, env_name.as_deref())
                }
            },
            Self::Config { command } => match command {
                ConfigCommands::View => config::execute_view(),
                ConfigCommands::Set {
                    org,
                    aws_profile,
                    aws_region,
                } => config::execute_set(org, aws_profile, aws_region),
            },
            Self::Login { profile } => login::execute(&current_dir, profile),
            Self::Version => {
                version::execute();
                Ok(())
            }
        }
    }
}

/// A loaded workspace: its root and manifest
pub struct WorkspaceContext {
    /// Workspace root directory
    pub root: PathBuf,
    /// Parsed manifest
    pub workspace: Workspace,
}

impl WorkspaceContext {
    /// Find and load the workspace containing `start`
    pub fn load(start: &Path) -> Result<Self> {
        let root = find_root(start)?;
        let workspace = Workspace::load(&root)?;
        tracing::debug!("Loaded workspace '{}' from {}", workspace.name, root.display());
        Ok(Self { root, workspace })
    }

    /// Registry of the workspace's repos
    pub fn registry(&self) -> Registry {
        self.workspace.registry(&self.root)
    }

    /// Edge table for `registry`
    pub fn edges(&self, registry: &Registry) -> Result<EdgeTable> {
        workspace_edges(registry).context("Failed to load producer/consumer edges")
    }

    /// Save the manifest and regenerate the editor workspace file
    pub fn save(&self) -> Result<()> {
        self.workspace.save(&self.root)?;
        if let Err(e) = self.workspace.write_code_workspace(&self.root) {
            tracing::warn!("Failed to update editor workspace file: {}", e);
        }
        Ok(())
    }

    /// Environment for child processes: `.env`, manifest env and a
    /// `GITHUB_TOKEN` from `gh` when nothing else provides one
    pub fn subprocess_env(&self) -> Result<BTreeMap<String, String>> {
        let mut vars = workspace_env(&self.root, &self.workspace)?;
        let process_has_token = std::env::var_os(GITHUB_TOKEN).is_some_and(|t| !t.is_empty());
        if ensure_github_token(&mut vars, process_has_token, github_token_from_gh) {
            tracing::info!("Using GITHUB_TOKEN from gh auth");
        }
        Ok(vars)
    }
}
