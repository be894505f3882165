//! Event dispatch DTOs

use serde::{Deserialize, Serialize};

use crate::domain::execution::ExecutionHandle;

/// What the orchestrator did with one delivered event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    pub event_id: Option<String>,

    /// Outcome of every rule whose pattern matched
    pub triggers: Vec<TriggerOutcome>,

    /// Present when at least one rule matched
    pub notification: Option<DeliveryOutcome>,
}

impl DispatchReport {
    pub fn matched(&self) -> bool {
        !self.triggers.is_empty()
    }
}

/// Result of one trigger path
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerOutcome {
    pub rule: String,
    pub pipeline_name: String,
    pub execution_id: Option<ExecutionHandle>,
    pub error: Option<String>,
}

/// Result of the notification path
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOutcome {
    pub topic: String,
    pub delivered: bool,
    pub error: Option<String>,
}
