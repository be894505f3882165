//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod event;
mod execution;
mod pipeline;

pub use event::EventCommands;
pub use execution::ExecutionCommands;
pub use pipeline::PipelineCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Pipeline definitions and manual starts
    Pipeline {
        #[command(subcommand)]
        command: PipelineCommands,
    },
    /// Execution inspection and step signals
    Execution {
        #[command(subcommand)]
        command: ExecutionCommands,
    },
    /// Deliver events as the upstream bus would
    Event {
        #[command(subcommand)]
        command: EventCommands,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Pipeline { command } => pipeline::handle_pipeline_command(command, config).await,
        Commands::Execution { command } => {
            execution::handle_execution_command(command, config).await
        }
        Commands::Event { command } => event::handle_event_command(command, config).await,
    }
}
