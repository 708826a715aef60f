//! Router assembly and error-to-status mapping.
//!
//! SYSTEM CONTEXT
//! ==============
//! Everything under `/api` requires the shared key in `x-api-key`; the
//! liveness probe at `/health` does not. Service errors reach the wire
//! through [`ApiError`], which maps each `ErrorKind` to one status code and
//! hides internal details.

pub mod auth;
pub mod dispatch;
pub mod services;

use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::error::{ErrorCode, ErrorKind};
use crate::state::AppState;

const INTERNAL_MESSAGE: &str = "Internal server error";

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/dispatch", post(dispatch::dispatch))
        .route("/api/dispatch/select", post(dispatch::select))
        .route("/api/services", get(services::list_services))
        .route("/api/services/register", post(services::register_service))
        .route(
            "/api/services/{id}",
            get(services::get_service).delete(services::unregister_service),
        )
        .route("/api/requests", get(services::list_requests))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// `GET /health` — unauthenticated liveness probe.
async fn health() -> Json<Value> {
    let timestamp = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
    Json(json!({ "status": "ok", "timestamp": timestamp }))
}

/// Request bodies are read leniently: a missing or unparseable body becomes
/// `null` so field validation reports the specific problem.
pub(crate) fn json_body(body: Result<Json<Value>, JsonRejection>) -> Value {
    body.map(|Json(value)| value).unwrap_or(Value::Null)
}

// =============================================================================
// ERRORS
// =============================================================================

/// Error response body: `{"error": message, "code": "E_..."}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self { status, code, message: message.into() }
    }

    /// Classify a service error. Internal errors are logged in full and
    /// returned with a generic message.
    #[must_use]
    pub fn from_error<E: ErrorCode>(err: E) -> Self {
        let kind = err.kind();
        let status = status_for_kind(kind);
        match kind {
            ErrorKind::Internal => {
                error!(code = err.error_code(), error = %err, "internal error");
                Self::new(status, err.error_code(), INTERNAL_MESSAGE)
            }
            ErrorKind::Upstream | ErrorKind::Unavailable => {
                warn!(code = err.error_code(), error = %err, retryable = err.retryable(), "request failed");
                Self::new(status, err.error_code(), err.to_string())
            }
            _ => Self::new(status, err.error_code(), err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message, "code": self.code }))).into_response()
    }
}

#[must_use]
pub fn status_for_kind(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
