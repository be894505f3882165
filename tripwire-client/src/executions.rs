//! Execution-related API endpoints

use crate::TripwireClient;
use crate::error::Result;
use tripwire_core::domain::execution::{ApprovalDecision, ExecutionHandle, PipelineExecution};
use tripwire_core::dto::execution::{CompleteStep, ExecutionSummary};

impl TripwireClient {
    // =============================================================================
    // Execution Inspection
    // =============================================================================

    /// List executions, optionally restricted to one pipeline
    pub async fn list_executions(&self, pipeline: Option<&str>) -> Result<Vec<ExecutionSummary>> {
        let url = format!("{}/execution/list", self.base_url);
        let mut request = self.client.get(&url);
        if let Some(pipeline) = pipeline {
            request = request.query(&[("pipeline", pipeline)]);
        }
        let response = request.send().await?;

        self.handle_response(response).await
    }

    /// Get the full state of an execution
    pub async fn get_execution(&self, id: ExecutionHandle) -> Result<PipelineExecution> {
        let url = format!("{}/execution/{}", self.base_url, id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Step Signals
    // =============================================================================

    /// Stop a running execution
    pub async fn stop_execution(&self, id: ExecutionHandle) -> Result<PipelineExecution> {
        let url = format!("{}/execution/{}/stop", self.base_url, id);
        let response = self.client.post(&url).send().await?;

        self.handle_response(response).await
    }

    /// Report the outcome of a Training step
    ///
    /// Used by training workers once the job has finished.
    pub async fn complete_step(
        &self,
        id: ExecutionHandle,
        step: &str,
        req: CompleteStep,
    ) -> Result<PipelineExecution> {
        let url = format!("{}/execution/{}/step/{}/complete", self.base_url, id, step);
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    /// Approve or reject an Approval or Callback step
    pub async fn approve_step(
        &self,
        id: ExecutionHandle,
        step: &str,
        decision: ApprovalDecision,
    ) -> Result<PipelineExecution> {
        let url = format!("{}/execution/{}/step/{}/approve", self.base_url, id, step);
        let response = self.client.post(&url).json(&decision).send().await?;

        self.handle_response(response).await
    }
}
