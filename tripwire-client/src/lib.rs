//! Tripwire HTTP Client
//!
//! A simple, type-safe HTTP client for the Tripwire orchestrator API, shared
//! by the CLI, training workers and approval tooling.
//!
//! # Example
//!
//! ```no_run
//! use tripwire_client::TripwireClient;
//! use tripwire_core::domain::execution::Parameter;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = TripwireClient::new("http://localhost:8080");
//!
//!     let execution = client
//!         .start_pipeline("retrain", vec![Parameter::new("ModelPackageArn", "arn:1")])
//!         .await?;
//!
//!     println!("Started execution: {}", execution.id);
//!     Ok(())
//! }
//! ```

pub mod error;
mod events;
mod executions;
mod pipelines;

// Re-export commonly used types
pub use error::{ClientError, Result};

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for the Tripwire orchestrator API
///
/// Methods are organized into logical groups:
/// - Pipeline registration and manual starts
/// - Execution inspection and step signals
/// - Event ingestion
#[derive(Debug, Clone)]
pub struct TripwireClient {
    /// Base URL of the orchestrator (e.g., "http://localhost:8080")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl TripwireClient {
    /// Create a new orchestrator client
    ///
    /// # Example
    /// ```
    /// use tripwire_client::TripwireClient;
    ///
    /// let client = TripwireClient::new("http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new orchestrator client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the orchestrator
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check that the orchestrator is up
    pub async fn health(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_empty_response(response).await
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::debug!("Orchestrator answered {}: {}", status, error_text);
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response whose body is not needed
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(())
    }
}
