//! Command-line interface module
//!
//! This module handles argument parsing and output formatting.
//! It contains no business logic - that belongs in the [`crate::core`] module.

pub mod commands;
pub mod output;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use commands::Commands;

/// spk - multi-repo workspace manager
///
/// Clone, sync and build a workspace of repositories, linking locally built
/// model packages into the APIs that consume them.
#[derive(Parser, Debug)]
#[command(name = "spk")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format for scripting
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Execute the CLI command
    ///
    /// Long-running child processes stop when `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        if let Some(cmd) = self.command {
            cmd.run(cancel).await
        } else {
            // No subcommand provided, show help
            use clap::CommandFactory;
            let mut cmd = Self::command();
            cmd.print_help()?;
            Ok(())
        }
    }
}
