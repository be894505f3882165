//! Execution domain types
//!
//! A [`PipelineExecution`] is one run of a registered pipeline. It carries
//! the state machine for the run and for each of its steps:
//!
//! - run: `Executing -> {Succeeded, Failed, Stopped}`, terminal states never reopen
//! - step: `Waiting -> Pending -> {Succeeded, Failed}`
//!
//! `Waiting` steps have unmet dependencies and were never scheduled. The
//! orchestrator engine owns the scheduling side effects; this module only
//! decides which transitions are legal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

use super::event::ApprovalStatus;
use super::pipeline::{PipelineDefinition, StepType};

/// Opaque reference to an execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionHandle(pub Uuid);

impl ExecutionHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExecutionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ExecutionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deduplication key for trigger-initiated starts
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdempotencyKey {
    pub pipeline_name: String,
    pub model_identifier: String,
    pub approval_status: ApprovalStatus,
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.pipeline_name, self.model_identifier, self.approval_status
        )
    }
}

/// Named parameter value as it appears on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Overall run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Executing,
    Succeeded,
    Failed,
    Stopped,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionStatus::Executing)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Executing => write!(f, "Executing"),
            ExecutionStatus::Succeeded => write!(f, "Succeeded"),
            ExecutionStatus::Failed => write!(f, "Failed"),
            ExecutionStatus::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Per-step status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    /// Dependencies not met; never scheduled
    Waiting,
    /// Scheduled, awaiting the worker or an approval signal
    Pending,
    Succeeded,
    Failed,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepStatus::Waiting => write!(f, "Waiting"),
            StepStatus::Pending => write!(f, "Pending"),
            StepStatus::Succeeded => write!(f, "Succeeded"),
            StepStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// Why a step failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The worker reported a failure
    Reported,
    /// A training step exceeded its configured timeout
    StepTimeout,
    /// An approver rejected the step
    Rejected,
    /// The training job could not be handed to the launcher
    LaunchFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// Reported outcome of a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    Succeeded,
    Failed(StepFailure),
}

impl StepOutcome {
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        StepOutcome::Failed(StepFailure {
            kind,
            message: message.into(),
        })
    }
}

/// External decision for an approval or callback step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalDecision {
    pub approved: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Where the approver deposited the decision payload (callback steps)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_location: Option<String>,
}

/// Runtime state of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepState {
    pub name: String,
    pub step_type: StepType,
    pub depends_on: Vec<String>,
    pub status: StepStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failure: Option<StepFailure>,

    /// Allocated for callback steps when they are scheduled
    pub callback_location: Option<String>,

    /// Reported by the approver of a callback step
    pub decision_payload: Option<String>,
}

/// One run of a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineExecution {
    pub id: ExecutionHandle,
    pub pipeline_name: String,
    pub pipeline_version: String,
    pub parameters: BTreeMap<String, String>,
    pub status: ExecutionStatus,
    pub steps: Vec<StepState>,
    pub failure_reason: Option<String>,
    pub idempotency_key: Option<IdempotencyKey>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Illegal state transitions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("execution has no step named '{0}'")]
    UnknownStep(String),

    #[error("execution is already {0}")]
    ExecutionTerminal(ExecutionStatus),

    #[error("step '{step}' is {status}, expected Pending")]
    StepNotPending { step: String, status: StepStatus },

    #[error("step '{step}' is a {step_type} step and cannot be approved")]
    NotAnApprovalStep { step: String, step_type: StepType },

    #[error("step '{step}' is an approval gate and only settles through an approval signal")]
    RequiresApproval { step: String },
}

impl PipelineExecution {
    /// Creates a fresh execution with every step `Waiting`
    pub fn new(
        definition: &PipelineDefinition,
        parameters: BTreeMap<String, String>,
        idempotency_key: Option<IdempotencyKey>,
    ) -> Self {
        let now = Utc::now();
        let steps = definition
            .steps
            .iter()
            .map(|step| StepState {
                name: step.name.clone(),
                step_type: step.step_type(),
                depends_on: step.depends_on.clone(),
                status: StepStatus::Waiting,
                scheduled_at: None,
                completed_at: None,
                failure: None,
                callback_location: None,
                decision_payload: None,
            })
            .collect();

        Self {
            id: ExecutionHandle::new(),
            pipeline_name: definition.name.clone(),
            pipeline_version: definition.version.clone(),
            parameters,
            status: ExecutionStatus::Executing,
            steps,
            failure_reason: None,
            idempotency_key,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn step(&self, name: &str) -> Option<&StepState> {
        self.steps.iter().find(|s| s.name == name)
    }

    fn step_mut(&mut self, name: &str) -> Result<&mut StepState, TransitionError> {
        self.steps
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| TransitionError::UnknownStep(name.to_string()))
    }

    /// Waiting steps whose dependencies have all succeeded
    ///
    /// Empty once the execution is terminal.
    pub fn eligible_steps(&self) -> Vec<String> {
        if self.status.is_terminal() {
            return Vec::new();
        }

        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Waiting)
            .filter(|s| {
                s.depends_on.iter().all(|dep| {
                    self.step(dep)
                        .is_some_and(|d| d.status == StepStatus::Succeeded)
                })
            })
            .map(|s| s.name.clone())
            .collect()
    }

    /// Moves a waiting step to `Pending`
    pub fn mark_scheduled(
        &mut self,
        step: &str,
        callback_location: Option<String>,
    ) -> Result<(), TransitionError> {
        self.ensure_executing()?;
        let now = Utc::now();
        let state = self.step_mut(step)?;

        if state.status != StepStatus::Waiting {
            return Err(TransitionError::StepNotPending {
                step: step.to_string(),
                status: state.status,
            });
        }

        state.status = StepStatus::Pending;
        state.scheduled_at = Some(now);
        state.callback_location = callback_location;
        self.updated_at = now;
        Ok(())
    }

    /// Records a worker-reported outcome for a pending non-approval step
    pub fn complete_step(&mut self, step: &str, outcome: StepOutcome) -> Result<(), TransitionError> {
        let state = self
            .step(step)
            .ok_or_else(|| TransitionError::UnknownStep(step.to_string()))?;

        if matches!(state.step_type, StepType::Approval | StepType::Callback) {
            return Err(TransitionError::RequiresApproval {
                step: step.to_string(),
            });
        }

        self.settle(step, outcome)
    }

    /// Records an approval decision for a pending approval or callback step
    pub fn approve_step(
        &mut self,
        step: &str,
        decision: &ApprovalDecision,
    ) -> Result<(), TransitionError> {
        let state = self
            .step(step)
            .ok_or_else(|| TransitionError::UnknownStep(step.to_string()))?;

        if state.step_type == StepType::Training {
            return Err(TransitionError::NotAnApprovalStep {
                step: step.to_string(),
                step_type: state.step_type,
            });
        }

        let outcome = if decision.approved {
            StepOutcome::Succeeded
        } else {
            StepOutcome::failed(
                FailureKind::Rejected,
                decision
                    .reason
                    .clone()
                    .unwrap_or_else(|| "rejected by approver".to_string()),
            )
        };

        self.settle(step, outcome)?;

        if let Some(location) = &decision.payload_location {
            self.step_mut(step)?.decision_payload = Some(location.clone());
        }

        Ok(())
    }

    /// Settles a pending step and rolls the run status forward
    ///
    /// Any failure fails the run; waiting steps are then never scheduled.
    pub fn settle(&mut self, step: &str, outcome: StepOutcome) -> Result<(), TransitionError> {
        self.ensure_executing()?;
        let now = Utc::now();
        let state = self.step_mut(step)?;

        if state.status != StepStatus::Pending {
            return Err(TransitionError::StepNotPending {
                step: step.to_string(),
                status: state.status,
            });
        }

        state.completed_at = Some(now);
        match outcome {
            StepOutcome::Succeeded => {
                state.status = StepStatus::Succeeded;
            }
            StepOutcome::Failed(failure) => {
                state.status = StepStatus::Failed;
                let reason = format!("step '{}' failed: {}", step, failure.message);
                state.failure = Some(failure);
                self.finish(ExecutionStatus::Failed, Some(reason), now);
            }
        }

        if self.status == ExecutionStatus::Executing
            && self.steps.iter().all(|s| s.status == StepStatus::Succeeded)
        {
            self.finish(ExecutionStatus::Succeeded, None, now);
        }

        self.updated_at = now;
        Ok(())
    }

    /// Stops a running execution; settled steps keep their state
    pub fn stop(&mut self) -> Result<(), TransitionError> {
        self.ensure_executing()?;
        self.finish(ExecutionStatus::Stopped, None, Utc::now());
        Ok(())
    }

    fn finish(&mut self, status: ExecutionStatus, reason: Option<String>, at: DateTime<Utc>) {
        self.status = status;
        self.failure_reason = reason;
        self.completed_at = Some(at);
        self.updated_at = at;
    }

    fn ensure_executing(&self) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::ExecutionTerminal(self.status));
        }
        Ok(())
    }

    /// Parameters in wire form, sorted by name
    pub fn parameter_list(&self) -> Vec<Parameter> {
        self.parameters
            .iter()
            .map(|(name, value)| Parameter::new(name, value))
            .collect()
    }
}
