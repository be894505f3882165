//! Pipeline Execution Engine
//!
//! Starts executions of registered pipelines and drives them forward as
//! workers and approvers report back. `start` returns as soon as the root
//! steps are scheduled; callers poll `describe` for progress.
//!
//! Scheduling happens at step boundaries only:
//! - Training steps are handed to the [`TrainingLauncher`] and guarded by a timer
//! - Approval steps wait for an explicit approval signal
//! - Callback steps additionally get a callback location for the decision payload

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};
use tripwire_core::domain::execution::{
    ApprovalDecision, ExecutionHandle, ExecutionStatus, FailureKind, IdempotencyKey, Parameter,
    PipelineExecution, StepOutcome, StepStatus, TransitionError,
};
use tripwire_core::domain::pipeline::{
    CallbackConfig, DefinitionError, PipelineDefinition, RegisteredPipeline, StepKind,
};
use tripwire_core::domain::template::TemplateError;

use crate::repository::{ExecutionRecord, ExecutionRepository, PipelineRepository, SharedRecord};
use crate::service::launcher::{TrainingJob, TrainingLauncher};

/// Fallback for training steps without a timeout; validation normally rejects those
const DEFAULT_TRAINING_TIMEOUT_SECS: u64 = 3600;

/// Start request could not be satisfied; no execution was created
#[derive(Debug, Error)]
pub enum StartError {
    #[error("pipeline '{0}' is not registered")]
    UnknownDefinition(String),

    #[error("no value supplied for parameter '{0}'")]
    MissingParameter(String),

    #[error("pipeline configuration cannot be rendered: {0}")]
    Template(TemplateError),
}

impl From<TemplateError> for StartError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::Missing(name) => StartError::MissingParameter(name),
            other => StartError::Template(other),
        }
    }
}

#[derive(Debug, Error)]
#[error("execution {0} not found")]
pub struct NotFound(pub ExecutionHandle);

/// A worker report, approval or stop that could not be applied
#[derive(Debug, Error)]
pub enum SignalError {
    #[error(transparent)]
    NotFound(#[from] NotFound),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Request to start an execution
#[derive(Debug, Clone)]
pub struct StartRequest {
    pub pipeline_name: String,
    pub parameters: Vec<Parameter>,

    /// When set, a second start with the same key returns the first handle
    pub idempotency_key: Option<IdempotencyKey>,
}

impl StartRequest {
    pub fn new(pipeline_name: impl Into<String>, parameters: Vec<Parameter>) -> Self {
        Self {
            pipeline_name: pipeline_name.into(),
            parameters,
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: IdempotencyKey) -> Self {
        self.idempotency_key = Some(key);
        self
    }
}

/// Execution engine; cheap to clone, all clones share one registry
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    pipelines: PipelineRepository,
    executions: ExecutionRepository,
    launcher: Arc<dyn TrainingLauncher>,

    /// Lowest-precedence parameters (storage locations from configuration)
    defaults: BTreeMap<String, String>,
}

impl Engine {
    pub fn new(launcher: Arc<dyn TrainingLauncher>, defaults: BTreeMap<String, String>) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                pipelines: PipelineRepository::new(),
                executions: ExecutionRepository::new(),
                launcher,
                defaults,
            }),
        }
    }

    // =========================================================================
    // Definitions
    // =========================================================================

    /// Validate and register a pipeline definition
    ///
    /// Re-registering a name replaces the definition for future starts;
    /// running executions keep the steps they were started with.
    pub fn register(
        &self,
        definition: PipelineDefinition,
    ) -> Result<Arc<RegisteredPipeline>, DefinitionError> {
        if let Err(e) = definition.validate() {
            warn!(pipeline = %definition.name, error = %e, "Rejected pipeline definition");
            return Err(e);
        }

        let (registered, replaced) = self.inner.pipelines.upsert(definition);
        info!(
            pipeline = %registered.definition.name,
            version = %registered.definition.version,
            replaced,
            "Pipeline registered"
        );

        Ok(registered)
    }

    pub fn pipeline(&self, name: &str) -> Option<Arc<RegisteredPipeline>> {
        self.inner.pipelines.find_by_name(name)
    }

    pub fn pipelines(&self) -> Vec<Arc<RegisteredPipeline>> {
        self.inner.pipelines.list_all()
    }

    // =========================================================================
    // Executions
    // =========================================================================

    /// Start an execution and schedule its root steps
    pub async fn start(&self, request: StartRequest) -> Result<ExecutionHandle, StartError> {
        let registered = self
            .inner
            .pipelines
            .find_by_name(&request.pipeline_name)
            .ok_or_else(|| StartError::UnknownDefinition(request.pipeline_name.clone()))?;

        if let Some(key) = &request.idempotency_key {
            if let Some(existing) = self.inner.executions.find_by_key(key) {
                info!(execution = %existing, key = %key, "Duplicate start, returning existing execution");
                return Ok(existing);
            }
        }

        let definition = &registered.definition;
        let parameters = self.resolve_parameters(definition, request.parameters);
        let steps = definition
            .steps
            .iter()
            .map(|step| step.render(&parameters))
            .collect::<Result<Vec<_>, _>>()?;

        let execution = PipelineExecution::new(definition, parameters, request.idempotency_key);
        let (handle, created) = self
            .inner
            .executions
            .insert(ExecutionRecord { execution, steps });

        if !created {
            info!(execution = %handle, "Concurrent duplicate start, returning existing execution");
            return Ok(handle);
        }

        info!(
            execution = %handle,
            pipeline = %definition.name,
            tracked = self.inner.executions.len(),
            "Execution started"
        );
        self.schedule(handle);

        Ok(handle)
    }

    /// Engine defaults, then declared defaults, then supplied values
    fn resolve_parameters(
        &self,
        definition: &PipelineDefinition,
        supplied: Vec<Parameter>,
    ) -> BTreeMap<String, String> {
        let mut resolved = self.inner.defaults.clone();
        resolved.extend(definition.defaults());
        resolved.extend(supplied.into_iter().map(|p| (p.name, p.value)));
        resolved
    }

    /// Read-only snapshot of an execution
    pub fn describe(&self, handle: ExecutionHandle) -> Result<PipelineExecution, NotFound> {
        Ok(self.record(handle)?.lock().execution.clone())
    }

    /// Snapshots of all executions, optionally for one pipeline, newest first
    pub fn list(&self, pipeline_name: Option<&str>) -> Vec<PipelineExecution> {
        self.inner.executions.list(pipeline_name)
    }

    /// Record a worker-reported outcome and schedule newly eligible steps
    pub async fn advance(
        &self,
        handle: ExecutionHandle,
        step: &str,
        outcome: StepOutcome,
    ) -> Result<PipelineExecution, SignalError> {
        debug!(execution = %handle, step, ?outcome, "Step outcome reported");
        self.transition(handle, |exec| exec.complete_step(step, outcome))?;
        self.schedule(handle);
        Ok(self.describe(handle)?)
    }

    /// Apply an approval decision and schedule newly eligible steps
    pub async fn approve(
        &self,
        handle: ExecutionHandle,
        step: &str,
        decision: ApprovalDecision,
    ) -> Result<PipelineExecution, SignalError> {
        info!(execution = %handle, step, approved = decision.approved, "Approval signal received");
        self.transition(handle, |exec| exec.approve_step(step, &decision))?;
        self.schedule(handle);
        Ok(self.describe(handle)?)
    }

    /// Stop a running execution
    pub fn stop(&self, handle: ExecutionHandle) -> Result<PipelineExecution, SignalError> {
        self.transition(handle, |exec| exec.stop())?;
        Ok(self.describe(handle)?)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn record(&self, handle: ExecutionHandle) -> Result<SharedRecord, NotFound> {
        self.inner.executions.find(handle).ok_or(NotFound(handle))
    }

    /// Apply `f` under the execution's lock
    fn transition<T, F>(&self, handle: ExecutionHandle, f: F) -> Result<T, SignalError>
    where
        F: FnOnce(&mut PipelineExecution) -> Result<T, TransitionError>,
    {
        let record = self.record(handle)?;
        let mut guard = record.lock();
        let before = guard.execution.status;

        let result = f(&mut guard.execution)?;

        let execution = &guard.execution;
        if execution.status != before {
            match execution.status {
                ExecutionStatus::Failed => warn!(
                    execution = %handle,
                    reason = execution.failure_reason.as_deref().unwrap_or_default(),
                    "Execution failed"
                ),
                status => info!(execution = %handle, %status, "Execution finished"),
            }
        }

        Ok(result)
    }

    /// Schedule every eligible step and launch the training ones
    ///
    /// Launches run on their own tasks; the caller never waits on a worker.
    fn schedule(&self, handle: ExecutionHandle) {
        let Ok(record) = self.record(handle) else {
            return;
        };

        let jobs = Self::mark_eligible(handle, &record);

        for (job, timeout) in jobs {
            self.arm_timeout(handle, job.step_name.clone(), timeout);
            self.spawn_launch(handle, job);
        }
    }

    fn spawn_launch(&self, handle: ExecutionHandle, job: TrainingJob) {
        let engine = self.clone();
        tokio::spawn(async move {
            let step = job.step_name.clone();
            let Err(e) = engine.inner.launcher.launch(job).await else {
                return;
            };

            warn!(execution = %handle, step = %step, error = %e, "Failed to launch training job");
            let outcome = StepOutcome::failed(FailureKind::LaunchFailed, format!("{e:#}"));
            if let Err(err) = engine.transition(handle, |exec| exec.settle(&step, outcome)) {
                debug!(execution = %handle, step = %step, error = %err, "Launch failure not recorded");
            }
        });
    }

    /// Move eligible steps to `Pending`; returns the training jobs to launch
    fn mark_eligible(handle: ExecutionHandle, record: &SharedRecord) -> Vec<(TrainingJob, Duration)> {
        let mut guard = record.lock();
        let record = &mut *guard;
        let mut jobs = Vec::new();

        for name in record.execution.eligible_steps() {
            let Some(kind) = record.step(&name).map(|s| s.kind.clone()) else {
                continue;
            };

            let scheduled = match &kind {
                StepKind::Training(cfg) => {
                    let result = record.execution.mark_scheduled(&name, None);
                    if result.is_ok() {
                        let timeout = cfg.timeout_seconds.unwrap_or(DEFAULT_TRAINING_TIMEOUT_SECS);
                        jobs.push((
                            TrainingJob {
                                execution_id: handle,
                                pipeline_name: record.execution.pipeline_name.clone(),
                                step_name: name.clone(),
                                config: cfg.clone(),
                            },
                            Duration::from_secs(timeout),
                        ));
                    }
                    result
                }
                StepKind::Approval => {
                    let result = record.execution.mark_scheduled(&name, None);
                    if result.is_ok() {
                        info!(execution = %handle, step = %name, "Awaiting approval");
                    }
                    result
                }
                StepKind::Callback(cfg) => {
                    let location = callback_location(cfg, handle, &name);
                    let result = record.execution.mark_scheduled(&name, Some(location.clone()));
                    if result.is_ok() {
                        info!(
                            execution = %handle,
                            step = %name,
                            callback_location = %location,
                            "Awaiting callback decision"
                        );
                    }
                    result
                }
            };

            if let Err(e) = scheduled {
                warn!(execution = %handle, step = %name, error = %e, "Could not schedule step");
            }
        }

        jobs
    }

    fn arm_timeout(&self, handle: ExecutionHandle, step: String, timeout: Duration) {
        let engine = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            engine.expire(handle, &step, timeout);
        });
    }

    /// Fail a training step that is still pending when its timer fires
    fn expire(&self, handle: ExecutionHandle, step: &str, timeout: Duration) {
        let result = self.transition(handle, |exec| {
            let still_pending = exec.status == ExecutionStatus::Executing
                && exec.step(step).is_some_and(|s| s.status == StepStatus::Pending);
            if !still_pending {
                return Ok(false);
            }

            let outcome = StepOutcome::failed(
                FailureKind::StepTimeout,
                format!("exceeded timeout of {}s", timeout.as_secs()),
            );
            exec.settle(step, outcome).map(|()| true)
        });

        match result {
            Ok(true) => warn!(execution = %handle, step, "Training step timed out"),
            Ok(false) => {}
            Err(e) => debug!(execution = %handle, step, error = %e, "Timeout not applied"),
        }
    }
}

fn callback_location(cfg: &CallbackConfig, handle: ExecutionHandle, step: &str) -> String {
    let prefix = cfg.output_location.as_deref().unwrap_or_default();
    format!("{}/{}/{}", prefix.trim_end_matches('/'), handle, step)
}
