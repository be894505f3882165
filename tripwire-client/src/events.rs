//! Event ingestion endpoint

use crate::TripwireClient;
use crate::error::Result;
use tripwire_core::domain::event::Event;
use tripwire_core::dto::event::DispatchReport;

impl TripwireClient {
    /// Deliver one event as the upstream bus would
    ///
    /// Returns what the orchestrator did with it: the execution each matched
    /// rule started (or why it could not) and the notification outcome.
    pub async fn send_event(&self, event: &Event) -> Result<DispatchReport> {
        let url = format!("{}/events", self.base_url);
        tracing::debug!("Sending event {:?} to {}", event.id, url);
        let response = self.client.post(&url).json(event).send().await?;

        self.handle_response(response).await
    }
}
