//! Execution DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::execution::{
    ExecutionHandle, ExecutionStatus, FailureKind, PipelineExecution, StepOutcome,
};

/// Execution summary for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSummary {
    pub id: ExecutionHandle,
    pub pipeline_name: String,
    pub status: ExecutionStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&PipelineExecution> for ExecutionSummary {
    fn from(execution: &PipelineExecution) -> Self {
        Self {
            id: execution.id,
            pipeline_name: execution.pipeline_name.clone(),
            status: execution.status,
            created_at: execution.created_at,
            completed_at: execution.completed_at,
        }
    }
}

/// Step completion reported by a training worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteStep {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CompleteStep {
    pub fn into_outcome(self) -> StepOutcome {
        if self.success {
            StepOutcome::Succeeded
        } else {
            StepOutcome::failed(
                FailureKind::Reported,
                self.message
                    .unwrap_or_else(|| "worker reported failure".to_string()),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_step_outcome() {
        let ok = CompleteStep {
            success: true,
            message: None,
        };
        assert_eq!(ok.into_outcome(), StepOutcome::Succeeded);

        let failed = CompleteStep {
            success: false,
            message: Some("out of memory".to_string()),
        };
        assert_eq!(
            failed.into_outcome(),
            StepOutcome::failed(FailureKind::Reported, "out of memory")
        );
    }
}
