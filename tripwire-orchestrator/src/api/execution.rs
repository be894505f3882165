//! Execution API Handlers
//!
//! HTTP endpoints for inspecting executions and signalling steps.
//! Training workers report through `complete`; approvers through `approve`.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tripwire_core::domain::execution::{ApprovalDecision, ExecutionHandle, PipelineExecution};
use tripwire_core::dto::execution::{CompleteStep, ExecutionSummary};
use uuid::Uuid;

use crate::api::AppState;
use crate::api::error::ApiResult;

#[derive(Debug, Deserialize)]
pub struct ListExecutions {
    pub pipeline: Option<String>,
}

/// GET /execution/list?pipeline=
/// List executions, newest first
pub async fn list_executions(
    State(state): State<AppState>,
    Query(query): Query<ListExecutions>,
) -> Json<Vec<ExecutionSummary>> {
    tracing::debug!("Listing executions (pipeline: {:?})", query.pipeline);

    let executions = state
        .engine
        .list(query.pipeline.as_deref())
        .iter()
        .map(ExecutionSummary::from)
        .collect();

    Json(executions)
}

/// GET /execution/{id}
/// Describe an execution
pub async fn get_execution(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PipelineExecution>> {
    tracing::debug!("Getting execution: {}", id);

    Ok(Json(state.engine.describe(ExecutionHandle(id))?))
}

/// POST /execution/{id}/stop
/// Stop a running execution
pub async fn stop_execution(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PipelineExecution>> {
    tracing::info!("Stopping execution: {}", id);

    Ok(Json(state.engine.stop(ExecutionHandle(id))?))
}

/// POST /execution/{id}/step/{step}/complete
/// Worker reports the outcome of a Training step
pub async fn complete_step(
    State(state): State<AppState>,
    Path((id, step)): Path<(Uuid, String)>,
    Json(req): Json<CompleteStep>,
) -> ApiResult<Json<PipelineExecution>> {
    tracing::info!(
        "Step {} of execution {} reported (success: {})",
        step,
        id,
        req.success
    );

    let execution = state
        .engine
        .advance(ExecutionHandle(id), &step, req.into_outcome())
        .await?;

    Ok(Json(execution))
}

/// POST /execution/{id}/step/{step}/approve
/// Approver decision for an Approval or Callback step
pub async fn approve_step(
    State(state): State<AppState>,
    Path((id, step)): Path<(Uuid, String)>,
    Json(decision): Json<ApprovalDecision>,
) -> ApiResult<Json<PipelineExecution>> {
    let execution = state
        .engine
        .approve(ExecutionHandle(id), &step, decision)
        .await?;

    Ok(Json(execution))
}
