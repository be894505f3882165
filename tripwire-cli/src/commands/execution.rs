//! Execution command handlers
//!
//! Inspect executions and send the signals workers and approvers would.

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use tripwire_client::TripwireClient;
use tripwire_core::domain::execution::{
    ApprovalDecision, ExecutionStatus, PipelineExecution, StepStatus,
};
use tripwire_core::dto::execution::{CompleteStep, ExecutionSummary};

use crate::config::Config;
use crate::id_resolver::resolve_execution_id;

/// Execution subcommands
#[derive(Subcommand)]
pub enum ExecutionCommands {
    /// List executions, newest first
    List {
        /// Only executions of this pipeline
        #[arg(short, long)]
        pipeline: Option<String>,
    },
    /// Get execution details
    Get {
        /// Execution ID or unambiguous prefix
        id: String,
    },
    /// Stop a running execution
    Stop {
        /// Execution ID or unambiguous prefix
        id: String,
    },
    /// Approve a pending Approval or Callback step
    Approve {
        /// Execution ID or unambiguous prefix
        id: String,
        /// Step name
        step: String,
        /// Where the decision payload was deposited (Callback steps)
        #[arg(long)]
        payload: Option<String>,
    },
    /// Reject a pending Approval or Callback step
    Reject {
        /// Execution ID or unambiguous prefix
        id: String,
        /// Step name
        step: String,
        /// Reason recorded on the failed step
        #[arg(short, long)]
        reason: Option<String>,
    },
    /// Report the outcome of a Training step
    Complete {
        /// Execution ID or unambiguous prefix
        id: String,
        /// Step name
        step: String,
        /// Report a failure instead of success
        #[arg(long)]
        failed: bool,
        /// Message recorded with a failure
        #[arg(short, long)]
        message: Option<String>,
    },
}

/// Handle execution commands
pub async fn handle_execution_command(command: ExecutionCommands, config: &Config) -> Result<()> {
    let client = TripwireClient::new(&config.orchestrator_url);

    match command {
        ExecutionCommands::List { pipeline } => list_executions(&client, pipeline.as_deref()).await,
        ExecutionCommands::Get { id } => {
            let handle = resolve_execution_id(&client, &id).await?;
            let execution = client.get_execution(handle).await?;
            print_execution_details(&execution);
            Ok(())
        }
        ExecutionCommands::Stop { id } => {
            let handle = resolve_execution_id(&client, &id).await?;
            let execution = client.stop_execution(handle).await?;
            println!("{}", format!("✓ Execution {} stopped", handle).green().bold());
            print_execution_details(&execution);
            Ok(())
        }
        ExecutionCommands::Approve { id, step, payload } => {
            let decision = ApprovalDecision {
                approved: true,
                reason: None,
                payload_location: payload,
            };
            signal_approval(&client, &id, &step, decision).await
        }
        ExecutionCommands::Reject { id, step, reason } => {
            let decision = ApprovalDecision {
                approved: false,
                reason,
                payload_location: None,
            };
            signal_approval(&client, &id, &step, decision).await
        }
        ExecutionCommands::Complete {
            id,
            step,
            failed,
            message,
        } => {
            let handle = resolve_execution_id(&client, &id).await?;
            let req = CompleteStep {
                success: !failed,
                message,
            };
            let execution = client.complete_step(handle, &step, req).await?;
            println!("{}", format!("✓ Step {} reported", step).green().bold());
            print_execution_details(&execution);
            Ok(())
        }
    }
}

async fn signal_approval(
    client: &TripwireClient,
    id: &str,
    step: &str,
    decision: ApprovalDecision,
) -> Result<()> {
    let handle = resolve_execution_id(client, id).await?;
    let approved = decision.approved;

    let execution = client.approve_step(handle, step, decision).await?;

    if approved {
        println!("{}", format!("✓ Step {} approved", step).green().bold());
    } else {
        println!("{}", format!("✗ Step {} rejected", step).red().bold());
    }
    print_execution_details(&execution);

    Ok(())
}

/// List executions
async fn list_executions(client: &TripwireClient, pipeline: Option<&str>) -> Result<()> {
    let executions = client.list_executions(pipeline).await?;

    if executions.is_empty() {
        println!("{}", "No executions found.".yellow());
    } else {
        println!(
            "{}",
            format!("Found {} execution(s):", executions.len()).bold()
        );
        println!();
        for execution in executions {
            print_execution_summary(&execution);
        }
    }

    Ok(())
}

fn colored_status(status: ExecutionStatus) -> ColoredString {
    let text = status.to_string();
    match status {
        ExecutionStatus::Executing => text.yellow(),
        ExecutionStatus::Succeeded => text.green(),
        ExecutionStatus::Failed => text.red(),
        ExecutionStatus::Stopped => text.dimmed(),
    }
}

fn colored_step_status(status: StepStatus) -> ColoredString {
    let text = status.to_string();
    match status {
        StepStatus::Waiting => text.dimmed(),
        StepStatus::Pending => text.yellow(),
        StepStatus::Succeeded => text.green(),
        StepStatus::Failed => text.red(),
    }
}

/// Print an execution summary
fn print_execution_summary(execution: &ExecutionSummary) {
    println!(
        "  {} {} {}",
        "▸".cyan(),
        execution.id.to_string().bold(),
        colored_status(execution.status)
    );
    println!("    Pipeline: {}", execution.pipeline_name.dimmed());
    println!(
        "    Created:  {}",
        execution
            .created_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}

/// Print detailed execution information
pub fn print_execution_details(execution: &PipelineExecution) {
    println!("{}", "Execution Details:".bold());
    println!("  ID:       {}", execution.id.to_string().cyan());
    println!(
        "  Pipeline: {} (v{})",
        execution.pipeline_name.bold(),
        execution.pipeline_version
    );
    println!("  Status:   {}", colored_status(execution.status));
    println!(
        "  Created:  {}",
        execution.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(completed) = execution.completed_at {
        println!("  Finished: {}", completed.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(reason) = &execution.failure_reason {
        println!("  Reason:   {}", reason.red());
    }

    if !execution.parameters.is_empty() {
        println!("\n{}", "Parameters:".bold());
        for (name, value) in &execution.parameters {
            println!("  {} = {}", name.cyan(), value);
        }
    }

    println!("\n{}", "Steps:".bold());
    for step in &execution.steps {
        println!(
            "  {} {} [{}] {}",
            "▸".cyan(),
            step.name.bold(),
            step.step_type.to_string().dimmed(),
            colored_step_status(step.status)
        );
        if let Some(location) = &step.callback_location {
            println!("      Callback: {}", location.dimmed());
        }
        if let Some(failure) = &step.failure {
            println!("      Failure:  {}", failure.message.red());
        }
    }
}
