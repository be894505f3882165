//! Event command handlers
//!
//! Sends a model package state-change event to the orchestrator, the way
//! the upstream bus would deliver it.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use tripwire_client::TripwireClient;
use tripwire_core::domain::event::Event;

use crate::config::Config;

/// Event subcommands
#[derive(Subcommand)]
pub enum EventCommands {
    /// Send an event read from a JSON file
    Send {
        /// Path to the event file
        file: String,
    },
}

/// Handle event commands
pub async fn handle_event_command(command: EventCommands, config: &Config) -> Result<()> {
    let client = TripwireClient::new(&config.orchestrator_url);

    match command {
        EventCommands::Send { file } => send_event(&client, &file).await,
    }
}

async fn send_event(client: &TripwireClient, path: &str) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read event file: {}", path))?;
    let event: Event = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse event: {}", path))?;

    let report = client.send_event(&event).await?;

    if !report.matched() {
        println!("{}", "Event matched no trigger rule.".yellow());
        return Ok(());
    }

    println!("{}", "✓ Event delivered".green().bold());
    for trigger in &report.triggers {
        match (&trigger.execution_id, &trigger.error) {
            (Some(id), _) => println!(
                "  {} {} → {} {}",
                "▸".cyan(),
                trigger.rule.bold(),
                trigger.pipeline_name,
                id.to_string().cyan()
            ),
            (None, error) => println!(
                "  {} {} → {} {}",
                "▸".cyan(),
                trigger.rule.bold(),
                trigger.pipeline_name,
                error.as_deref().unwrap_or("failed").red()
            ),
        }
    }

    if let Some(notification) = &report.notification {
        if notification.delivered {
            println!("  Notification sent to {}", notification.topic.cyan());
        } else {
            println!(
                "  Notification to {} failed: {}",
                notification.topic.cyan(),
                notification.error.as_deref().unwrap_or("unknown error").red()
            );
        }
    }

    Ok(())
}
