//! Pipeline command handlers
//!
//! Handles registration, listing, viewing and manual starts.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use tripwire_client::TripwireClient;
use tripwire_core::domain::execution::Parameter;
use tripwire_core::domain::pipeline::PipelineDefinition;
use tripwire_core::dto::pipeline::PipelineSummary;

use crate::commands::execution::print_execution_details;
use crate::config::Config;

/// Pipeline subcommands
#[derive(Subcommand)]
pub enum PipelineCommands {
    /// Register a pipeline definition from a JSON file
    Register {
        /// Path to the definition file
        file: String,
    },
    /// List all pipelines
    List,
    /// Get a pipeline definition
    Get {
        /// Pipeline name
        name: String,
    },
    /// Start an execution manually
    Start {
        /// Pipeline name
        name: String,

        /// Parameters as key=value pairs (e.g., ModelPackageArn=arn:...)
        #[arg(short, long, value_parser = parse_key_val)]
        param: Vec<(String, String)>,
    },
}

/// Parse a single key=value pair
fn parse_key_val(s: &str) -> Result<(String, String)> {
    let pos = s
        .find('=')
        .ok_or_else(|| anyhow::anyhow!("invalid KEY=value: no `=` found in `{}`", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

/// Handle pipeline commands
pub async fn handle_pipeline_command(command: PipelineCommands, config: &Config) -> Result<()> {
    let client = TripwireClient::new(&config.orchestrator_url);

    match command {
        PipelineCommands::Register { file } => register_pipeline(&client, &file).await,
        PipelineCommands::List => list_pipelines(&client).await,
        PipelineCommands::Get { name } => get_pipeline(&client, &name).await,
        PipelineCommands::Start { name, param } => start_pipeline(&client, &name, param).await,
    }
}

/// Read and validate a definition file
fn load_definition(path: &str) -> Result<PipelineDefinition> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read definition file: {}", path))?;
    let definition: PipelineDefinition = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse pipeline definition: {}", path))?;

    definition
        .validate()
        .with_context(|| format!("Pipeline '{}' is invalid", definition.name))?;

    Ok(definition)
}

/// Validate locally, then register
async fn register_pipeline(client: &TripwireClient, path: &str) -> Result<()> {
    let definition = load_definition(path)?;

    let summary = client.register_pipeline(&definition).await?;

    println!("{}", "✓ Pipeline registered successfully!".green().bold());
    println!("  Name:    {}", summary.name.bold());
    println!("  Version: {}", summary.version.cyan());
    println!(
        "  Steps:   {}",
        definition
            .steps
            .iter()
            .map(|s| format!("{} ({})", s.name, s.step_type()))
            .collect::<Vec<_>>()
            .join(", ")
            .dimmed()
    );

    let referenced = definition.referenced_parameters();
    if !referenced.is_empty() {
        let defaults = definition.defaults();
        println!("  Parameters:");
        for name in referenced {
            match defaults.get(&name) {
                Some(value) => println!("    - {} {}", name.cyan(), format!("= {}", value).dimmed()),
                None => println!("    - {}", name.cyan()),
            }
        }
    }

    Ok(())
}

/// List all pipelines
async fn list_pipelines(client: &TripwireClient) -> Result<()> {
    let pipelines = client.list_pipelines().await?;

    if pipelines.is_empty() {
        println!("{}", "No pipelines found.".yellow());
    } else {
        println!(
            "{}",
            format!("Found {} pipeline(s):", pipelines.len()).bold()
        );
        println!();
        for pipeline in pipelines {
            print_pipeline_summary(&pipeline);
        }
    }

    Ok(())
}

/// Get and display a single pipeline definition
async fn get_pipeline(client: &TripwireClient, name: &str) -> Result<()> {
    let definition = client.get_pipeline(name).await?;

    println!("{}", "Pipeline Details:".bold());
    println!("  Name:        {}", definition.name.bold());
    println!("  Version:     {}", definition.version);
    if let Some(desc) = &definition.description {
        println!("  Description: {}", desc);
    }

    println!("\n{}", "Definition:".bold());
    println!("{}", "─".repeat(80).dimmed());
    println!("{}", serde_json::to_string_pretty(&definition)?);
    println!("{}", "─".repeat(80).dimmed());

    Ok(())
}

/// Start an execution
async fn start_pipeline(
    client: &TripwireClient,
    name: &str,
    params: Vec<(String, String)>,
) -> Result<()> {
    let parameters = params
        .into_iter()
        .map(|(k, v)| Parameter::new(k, v))
        .collect();

    let execution = client.start_pipeline(name, parameters).await?;

    println!("{}", "✓ Execution started!".green().bold());
    print_execution_details(&execution);

    Ok(())
}

/// Print a pipeline summary
fn print_pipeline_summary(pipeline: &PipelineSummary) {
    println!("  {} {}", "▸".cyan(), pipeline.name.bold());
    println!("    Version:    {}", pipeline.version.dimmed());
    println!("    Steps:      {}", pipeline.step_count.to_string().dimmed());
    println!(
        "    Registered: {}",
        pipeline
            .registered_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    if let Some(desc) = &pipeline.description {
        println!("    Description: {}", desc.dimmed());
    }
    println!();
}
