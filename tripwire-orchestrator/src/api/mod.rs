//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod event;
pub mod execution;
pub mod health;
pub mod pipeline;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::service::{Engine, Orchestrator};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    pub orchestrator: Arc<Orchestrator>,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Event ingestion
        .route("/events", post(event::ingest_event))
        // Pipeline endpoints
        .route("/pipeline/register", post(pipeline::register_pipeline))
        .route("/pipeline/list", get(pipeline::list_pipelines))
        .route("/pipeline/{name}", get(pipeline::get_pipeline))
        .route("/pipeline/{name}/start", post(pipeline::start_pipeline))
        // Execution endpoints
        .route("/execution/list", get(execution::list_executions))
        .route("/execution/{id}", get(execution::get_execution))
        .route("/execution/{id}/stop", post(execution::stop_execution))
        .route(
            "/execution/{id}/step/{step}/complete",
            post(execution::complete_step),
        )
        .route(
            "/execution/{id}/step/{step}/approve",
            post(execution::approve_step),
        )
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::notification::NotificationDispatcher;
    use crate::service::testing::{
        RecordingLauncher, RecordingPublisher, approved_event, storage_defaults, training_pipeline,
    };
    use crate::service::trigger::TriggerRule;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use tripwire_core::domain::pattern::EventPattern;

    fn app() -> Router {
        let engine = Engine::new(Arc::new(RecordingLauncher::default()), storage_defaults());
        engine.register(training_pipeline()).unwrap();

        let rule = TriggerRule {
            name: "approved-packages".to_string(),
            pattern: EventPattern::new().detail_field("ModelApprovalStatus", ["Approved"]),
            pipeline_name: "pipeline-x".to_string(),
            require_group_name: false,
            static_parameters: vec![],
        };
        let orchestrator = Orchestrator::new(
            engine.clone(),
            &[rule],
            NotificationDispatcher::new("model-approvals", Arc::new(RecordingPublisher::default())),
        );

        create_router(AppState {
            engine,
            orchestrator: Arc::new(orchestrator),
        })
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let body = match body {
            Some(value) => Body::from(value.to_string()),
            None => Body::empty(),
        };

        app.clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = send(&app(), "GET", "/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_event_to_approval_flow() {
        let app = app();
        let event = serde_json::to_value(approved_event("arn:1")).unwrap();

        let response = send(&app, "POST", "/events", Some(event.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let report = json_body(response).await;
        let id = report["triggers"][0]["executionId"].as_str().unwrap().to_string();
        assert_eq!(report["notification"]["delivered"], json!(true));

        // duplicate delivery lands on the same execution
        let report = json_body(send(&app, "POST", "/events", Some(event)).await).await;
        assert_eq!(report["triggers"][0]["executionId"].as_str().unwrap(), id);

        let response = send(
            &app,
            "POST",
            &format!("/execution/{}/step/Training/complete", id),
            Some(json!({"success": true})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        // worker reports cannot settle the gate
        let response = send(
            &app,
            "POST",
            &format!("/execution/{}/step/Gate/complete", id),
            Some(json!({"success": true})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = send(
            &app,
            "POST",
            &format!("/execution/{}/step/Gate/approve", id),
            Some(json!({"approved": true})),
        )
        .await;
        let execution = json_body(response).await;
        assert_eq!(execution["steps"][2]["status"], json!("Pending"));

        let listed = json_body(send(&app, "GET", "/execution/list?pipeline=pipeline-x", None).await).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_register_invalid_definition() {
        let response = send(
            &app(),
            "POST",
            "/pipeline/register",
            Some(json!({
                "name": "broken",
                "steps": [
                    {"name": "A", "type": "Approval", "dependsOn": ["B"]},
                    {"name": "B", "type": "Approval", "dependsOn": ["A"]}
                ]
            })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_register_undeclared_placeholder() {
        let response = send(
            &app(),
            "POST",
            "/pipeline/register",
            Some(json!({
                "name": "review-only",
                "steps": [
                    {"name": "Review", "type": "Callback", "outputLocation": "s3://{{NeverDeclared}}"}
                ]
            })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("NeverDeclared"));
    }

    #[tokio::test]
    async fn test_register_and_get_pipeline() {
        let app = app();
        let response = send(
            &app,
            "POST",
            "/pipeline/register",
            Some(json!({"name": "gate-only", "steps": [{"name": "Gate", "type": "Approval"}]})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let definition = json_body(send(&app, "GET", "/pipeline/gate-only", None).await).await;
        assert_eq!(definition["steps"][0]["type"], json!("Approval"));

        let listed = json_body(send(&app, "GET", "/pipeline/list", None).await).await;
        assert_eq!(listed.as_array().unwrap().len(), 2);

        let response = send(&app, "GET", "/pipeline/unknown", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_manual_start_missing_parameter() {
        let app = app();
        let response = send(
            &app,
            "POST",
            "/pipeline/pipeline-x/start",
            Some(json!({"parameters": []})),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let listed = json_body(send(&app, "GET", "/execution/list", None).await).await;
        assert!(listed.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_manual_start_and_stop() {
        let app = app();
        let response = send(
            &app,
            "POST",
            "/pipeline/pipeline-x/start",
            Some(json!({"parameters": [{"name": "ModelPackageArn", "value": "arn:2"}]})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let id = json_body(response).await["id"].as_str().unwrap().to_string();

        let execution = json_body(send(&app, "POST", &format!("/execution/{}/stop", id), None).await).await;
        assert_eq!(execution["status"], json!("Stopped"));

        let response = send(&app, "POST", &format!("/execution/{}/stop", id), None).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_unknown_execution() {
        let response = send(
            &app(),
            "GET",
            &format!("/execution/{}", uuid::Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
