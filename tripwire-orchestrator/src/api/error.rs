//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tripwire_core::domain::execution::TransitionError;
use tripwire_core::domain::pipeline::DefinitionError;

use crate::service::engine::{NotFound, SignalError, StartError};

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<DefinitionError> for ApiError {
    fn from(err: DefinitionError) -> Self {
        ApiError::BadRequest(format!("Invalid pipeline definition: {}", err))
    }
}

impl From<StartError> for ApiError {
    fn from(err: StartError) -> Self {
        match err {
            StartError::UnknownDefinition(_) => ApiError::NotFound(err.to_string()),
            StartError::MissingParameter(_) | StartError::Template(_) => {
                ApiError::BadRequest(err.to_string())
            }
        }
    }
}

impl From<NotFound> for ApiError {
    fn from(err: NotFound) -> Self {
        ApiError::NotFound(err.to_string())
    }
}

impl From<SignalError> for ApiError {
    fn from(err: SignalError) -> Self {
        match err {
            SignalError::NotFound(e) => e.into(),
            SignalError::Transition(e @ TransitionError::UnknownStep(_)) => {
                ApiError::NotFound(e.to_string())
            }
            SignalError::Transition(e) => ApiError::Conflict(e.to_string()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
