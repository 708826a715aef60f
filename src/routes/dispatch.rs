//! Dispatch routes — transcript routing and manual selection.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::Json;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::model::ServiceSummary;
use crate::routes::auth::ApiKey;
use crate::routes::{ApiError, json_body};
use crate::services::dispatcher::{self, DispatchOutcome};
use crate::services::router::{self, RoutingDecision};
use crate::services::validation;
use crate::state::AppState;

const UNCERTAIN_MESSAGE: &str = "I'm not sure which service to use. Please clarify or select one.";

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DispatchResponse {
    Success { service: String, url: Option<String>, message: String, data: Value },
    Uncertain { explanation: String, options: Vec<ServiceSummary>, message: &'static str },
}

impl From<DispatchOutcome> for DispatchResponse {
    fn from(outcome: DispatchOutcome) -> Self {
        Self::Success { service: outcome.service, url: outcome.url, message: outcome.message, data: outcome.data }
    }
}

/// `POST /api/dispatch` — route a transcript and, if confident, call the service.
pub async fn dispatch(
    State(state): State<AppState>,
    _auth: ApiKey,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<DispatchResponse>, ApiError> {
    let transcript = validation::transcript(&json_body(body)).map_err(ApiError::from_error)?;
    info!(%transcript, "dispatch request");

    let decision = router::route_request(&state, &transcript)
        .await
        .map_err(ApiError::from_error)?;

    match decision {
        RoutingDecision::Uncertain { explanation, available_services } => {
            info!(options = available_services.len(), "routing uncertain");
            Ok(Json(DispatchResponse::Uncertain { explanation, options: available_services, message: UNCERTAIN_MESSAGE }))
        }
        RoutingDecision::Confident(route) => {
            let outcome = dispatcher::dispatch(&state, &route, &transcript)
                .await
                .map_err(ApiError::from_error)?;
            Ok(Json(outcome.into()))
        }
    }
}

/// `POST /api/dispatch/select` — dispatch to an explicitly chosen endpoint.
pub async fn select(
    State(state): State<AppState>,
    _auth: ApiKey,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<DispatchResponse>, ApiError> {
    let selection = validation::selection(&json_body(body)).map_err(ApiError::from_error)?;

    let route = dispatcher::manual_route(&state, &selection.service_id, selection.endpoint_index)
        .await
        .map_err(ApiError::from_error)?;
    info!(service = %route.service_name, endpoint = selection.endpoint_index, "manual selection");

    let outcome = dispatcher::dispatch(&state, &route, &selection.transcript)
        .await
        .map_err(ApiError::from_error)?;
    Ok(Json(outcome.into()))
}

#[cfg(test)]
#[path = "dispatch_test.rs"]
mod tests;
