//! Pipeline API Handlers
//!
//! HTTP endpoints for pipeline registration and manual starts.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tripwire_core::domain::execution::PipelineExecution;
use tripwire_core::domain::pipeline::PipelineDefinition;
use tripwire_core::dto::pipeline::{PipelineSummary, StartPipeline};

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::service::engine::StartRequest;

/// POST /pipeline/register
/// Validate and register a pipeline definition
pub async fn register_pipeline(
    State(state): State<AppState>,
    Json(definition): Json<PipelineDefinition>,
) -> ApiResult<(StatusCode, Json<PipelineSummary>)> {
    tracing::info!("Registering pipeline: {}", definition.name);

    let registered = state.engine.register(definition)?;

    Ok((StatusCode::CREATED, Json(PipelineSummary::from(registered.as_ref()))))
}

/// GET /pipeline/list
/// List all registered pipelines
pub async fn list_pipelines(State(state): State<AppState>) -> Json<Vec<PipelineSummary>> {
    tracing::debug!("Listing all pipelines");

    let pipelines = state
        .engine
        .pipelines()
        .iter()
        .map(|p| PipelineSummary::from(p.as_ref()))
        .collect();

    Json(pipelines)
}

/// GET /pipeline/{name}
/// Get a pipeline definition by name
pub async fn get_pipeline(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<PipelineDefinition>> {
    tracing::debug!("Getting pipeline: {}", name);

    let registered = state
        .engine
        .pipeline(&name)
        .ok_or_else(|| ApiError::NotFound(format!("Pipeline '{}' not found", name)))?;

    Ok(Json(registered.definition.clone()))
}

/// POST /pipeline/{name}/start
/// Start an execution manually
///
/// Manual starts carry no idempotency key; each call creates an execution.
pub async fn start_pipeline(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<StartPipeline>,
) -> ApiResult<(StatusCode, Json<PipelineExecution>)> {
    tracing::info!("Starting pipeline: {}", name);

    let handle = state
        .engine
        .start(StartRequest::new(name, req.parameters))
        .await?;
    let execution = state.engine.describe(handle)?;

    Ok((StatusCode::ACCEPTED, Json(execution)))
}
