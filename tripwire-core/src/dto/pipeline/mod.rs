//! Pipeline DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::execution::Parameter;
use crate::domain::pipeline::RegisteredPipeline;

/// Lightweight pipeline summary for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub step_count: usize,
    pub registered_at: DateTime<Utc>,
}

impl From<&RegisteredPipeline> for PipelineSummary {
    fn from(registered: &RegisteredPipeline) -> Self {
        Self {
            name: registered.definition.name.clone(),
            version: registered.definition.version.clone(),
            description: registered.definition.description.clone(),
            step_count: registered.definition.steps.len(),
            registered_at: registered.registered_at,
        }
    }
}

/// Request to start a pipeline manually
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartPipeline {
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}
