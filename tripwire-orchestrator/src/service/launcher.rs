//! Training launcher
//!
//! The training algorithm is opaque to the orchestrator. When a Training
//! step becomes eligible the engine hands a [`TrainingJob`] to a launcher;
//! the worker that actually runs it reports back through
//! `POST /execution/{id}/step/{step}/complete`.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;
use tripwire_core::domain::execution::ExecutionHandle;
use tripwire_core::domain::pipeline::TrainingConfig;

/// Training work handed to an out-of-band worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingJob {
    pub execution_id: ExecutionHandle,
    pub pipeline_name: String,
    pub step_name: String,

    /// Step configuration with parameters substituted
    pub config: TrainingConfig,
}

/// Hands training jobs to whatever runs them
#[async_trait]
pub trait TrainingLauncher: Send + Sync {
    /// Submits a job; returning an error fails the step immediately
    async fn launch(&self, job: TrainingJob) -> Result<()>;
}

/// Launcher that only records the job
///
/// Used when no worker endpoint is configured; an operator or external
/// scheduler picks the job up from the log or the execution listing.
pub struct LogLauncher;

#[async_trait]
impl TrainingLauncher for LogLauncher {
    async fn launch(&self, job: TrainingJob) -> Result<()> {
        info!(
            execution = %job.execution_id,
            step = %job.step_name,
            image = job.config.image.as_deref().unwrap_or("<default>"),
            output = job.config.output_location.as_deref().unwrap_or_default(),
            "Training job ready for worker"
        );
        Ok(())
    }
}

/// Bound on a single job submission; a worker that accepts slower than this fails the step
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Launcher that POSTs the job to a worker endpoint
pub struct HttpLauncher {
    worker_url: String,
    client: Client,
}

impl HttpLauncher {
    pub fn new(worker_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            worker_url: worker_url.into(),
            client,
        })
    }
}

#[async_trait]
impl TrainingLauncher for HttpLauncher {
    async fn launch(&self, job: TrainingJob) -> Result<()> {
        let response = self
            .client
            .post(&self.worker_url)
            .json(&job)
            .send()
            .await
            .with_context(|| format!("Failed to reach training worker at {}", self.worker_url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Training worker rejected job with status {}", status);
        }

        info!(
            execution = %job.execution_id,
            step = %job.step_name,
            "Training job submitted to worker"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_http_launcher_unreachable_worker() {
        let launcher = HttpLauncher::new("http://127.0.0.1:9/jobs", Duration::from_secs(2)).unwrap();
        let job = TrainingJob {
            execution_id: ExecutionHandle::new(),
            pipeline_name: "pipeline-x".to_string(),
            step_name: "Training".to_string(),
            config: TrainingConfig::default(),
        };

        let err = launcher.launch(job).await.unwrap_err();
        assert!(format!("{err:#}").contains("Failed to reach training worker"));
    }
}
