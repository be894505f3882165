//! Pipeline-related API endpoints

use crate::TripwireClient;
use crate::error::Result;
use tripwire_core::domain::execution::{Parameter, PipelineExecution};
use tripwire_core::domain::pipeline::PipelineDefinition;
use tripwire_core::dto::pipeline::{PipelineSummary, StartPipeline};

impl TripwireClient {
    // =============================================================================
    // Pipeline Management
    // =============================================================================

    /// Register (or replace) a pipeline definition
    ///
    /// The orchestrator validates the definition and answers 400 with the
    /// reason when it is rejected.
    pub async fn register_pipeline(&self, definition: &PipelineDefinition) -> Result<PipelineSummary> {
        let url = format!("{}/pipeline/register", self.base_url);
        let response = self.client.post(&url).json(definition).send().await?;

        self.handle_response(response).await
    }

    /// List all registered pipelines
    pub async fn list_pipelines(&self) -> Result<Vec<PipelineSummary>> {
        let url = format!("{}/pipeline/list", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Get a pipeline definition by name
    pub async fn get_pipeline(&self, name: &str) -> Result<PipelineDefinition> {
        let url = format!("{}/pipeline/{}", self.base_url, name);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Start an execution manually
    ///
    /// # Example
    /// ```no_run
    /// # use tripwire_client::TripwireClient;
    /// # use tripwire_core::domain::execution::Parameter;
    /// # async fn example() -> anyhow::Result<()> {
    /// let client = TripwireClient::new("http://localhost:8080");
    /// let execution = client
    ///     .start_pipeline("retrain", vec![Parameter::new("ModelPackageArn", "arn:1")])
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn start_pipeline(
        &self,
        name: &str,
        parameters: Vec<Parameter>,
    ) -> Result<PipelineExecution> {
        let url = format!("{}/pipeline/{}/start", self.base_url, name);
        let response = self
            .client
            .post(&url)
            .json(&StartPipeline { parameters })
            .send()
            .await?;

        self.handle_response(response).await
    }
}
