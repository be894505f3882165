//! Event API Handler
//!
//! Ingestion endpoint for the upstream event bus.

use axum::{Json, extract::State};
use tripwire_core::domain::event::Event;
use tripwire_core::dto::event::DispatchReport;

use crate::api::AppState;

/// POST /events
/// Route one delivered event through the trigger rules
///
/// Always answers 200 with the per-rule outcome; trigger and notification
/// failures are reported in the body.
pub async fn ingest_event(
    State(state): State<AppState>,
    Json(event): Json<Event>,
) -> Json<DispatchReport> {
    tracing::debug!("Received event {:?} from {}", event.id, event.source);

    Json(state.orchestrator.dispatch(event).await)
}
