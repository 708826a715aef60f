//! Dispatcher — execute a confident route against the real service.
//!
//! DESIGN
//! ======
//! Exactly one outbound call per dispatch, no retry. GET and HEAD carry the
//! parameters in the query string; every other method sends them as a JSON
//! body. The service's stored credential travels as `x-api-key`.
//!
//! Success and failure both become a [`RequestOutcome`] and go through the
//! same `record` path, so every attempt leaves exactly one log entry. On the
//! failure path a logging error is reported but never replaces the upstream
//! failure the caller sees.

use serde_json::Value;
use time::OffsetDateTime;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::db::StoreError;
use crate::error::{ErrorCode, ErrorKind};
use crate::model::{Parameters, RequestLog, RequestOutcome, Service};
use crate::services::router::ConfidentRoute;
use crate::state::AppState;

/// Confidence is binary: a dispatched route was always selected outright.
const DISPATCH_CONFIDENCE: f64 = 1.0;
const DEFAULT_MESSAGE: &str = "Success";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Service not found")]
    ServiceNotFound(String),
    #[error("Endpoint not found")]
    EndpointNotFound { service: String, index: u64 },
    #[error("Request to {service} failed: {reason}")]
    Upstream { service: String, reason: String },
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ErrorCode for DispatchError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ServiceNotFound(_) => "E_SERVICE_NOT_FOUND",
            Self::EndpointNotFound { .. } => "E_ENDPOINT_NOT_FOUND",
            Self::Upstream { .. } => "E_UPSTREAM",
            Self::Store(e) => e.error_code(),
        }
    }

    fn kind(&self) -> ErrorKind {
        match self {
            Self::ServiceNotFound(_) | Self::EndpointNotFound { .. } => ErrorKind::NotFound,
            Self::Upstream { .. } => ErrorKind::Upstream,
            Self::Store(e) => e.kind(),
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Upstream { .. })
    }
}

/// What the caller gets back from a successful dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub service: String,
    pub url: Option<String>,
    pub message: String,
    pub data: Value,
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Build a route from an explicit service and endpoint choice, with empty
/// parameters. `service_id` that is not a UUID matches no service.
///
/// # Errors
///
/// [`DispatchError::ServiceNotFound`] or [`DispatchError::EndpointNotFound`].
pub async fn manual_route(
    state: &AppState,
    service_id: &str,
    endpoint_index: u64,
) -> Result<ConfidentRoute, DispatchError> {
    let not_found = || DispatchError::ServiceNotFound(service_id.to_owned());
    let id = Uuid::parse_str(service_id).map_err(|_| not_found())?;
    let service = state.store.get_service(id).await?.ok_or_else(not_found)?;

    let endpoint = usize::try_from(endpoint_index)
        .ok()
        .and_then(|idx| service.endpoints.get(idx))
        .cloned()
        .ok_or_else(|| DispatchError::EndpointNotFound { service: service.name.clone(), index: endpoint_index })?;

    Ok(ConfidentRoute { service_id: service.id, service_name: service.name, endpoint, parameters: Parameters::new() })
}

/// Call the routed endpoint once and log the outcome.
///
/// # Errors
///
/// [`DispatchError::ServiceNotFound`] if the service is gone (nothing is
/// logged), [`DispatchError::Upstream`] on network error, timeout, or a
/// non-2xx status (logged first), or a store error writing a success entry.
pub async fn dispatch(state: &AppState, route: &ConfidentRoute, transcript: &str) -> Result<DispatchOutcome, DispatchError> {
    let service = state
        .store
        .get_service(route.service_id)
        .await?
        .ok_or_else(|| DispatchError::ServiceNotFound(route.service_id.to_string()))?;

    let url = format!("{}{}", service.base_url, route.endpoint.path);
    info!(service = %service.name, method = %route.endpoint.method, %url, "dispatching");

    let result = send(state, &service, route, &url).await;
    let outcome = match &result {
        Ok(data) => RequestOutcome::Success { callback_url: string_field(data, "url"), response: data.clone() },
        Err(reason) => RequestOutcome::Error { error: reason.clone() },
    };
    let logged = record(state, &service, route, transcript, outcome).await;

    match result {
        Ok(data) => {
            logged?;
            Ok(DispatchOutcome {
                service: service.name,
                url: string_field(&data, "url"),
                message: string_field(&data, "message").unwrap_or_else(|| DEFAULT_MESSAGE.to_owned()),
                data,
            })
        }
        Err(reason) => {
            warn!(service = %service.name, %reason, "dispatch failed");
            if let Err(e) = logged {
                error!(service = %service.name, error = %e, "failed to log dispatch failure");
            }
            Err(DispatchError::Upstream { service: service.name, reason })
        }
    }
}

/// Query-string pairs for read-only methods: strings verbatim, everything
/// else as its JSON text.
#[must_use]
pub fn query_pairs(parameters: &Parameters) -> Vec<(String, String)> {
    parameters
        .iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), text)
        })
        .collect()
}

async fn send(state: &AppState, service: &Service, route: &ConfidentRoute, url: &str) -> Result<Value, String> {
    let method = reqwest::Method::from_bytes(route.endpoint.method.to_ascii_uppercase().as_bytes())
        .map_err(|e| format!("invalid method '{}': {e}", route.endpoint.method))?;

    let request = state
        .http
        .request(method, url)
        .header("x-api-key", &service.api_key)
        .timeout(state.config.timing.dispatch_timeout);
    let request = if route.endpoint.is_read_only() {
        request.query(&query_pairs(&route.parameters))
    } else {
        request.json(&route.parameters)
    };

    let response = request.send().await.map_err(|e| e.to_string())?;
    let status = response.status();
    let body = response.text().await.map_err(|e| e.to_string())?;
    if !status.is_success() {
        return Err(format!("{url} returned {status}"));
    }

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
}

async fn record(
    state: &AppState,
    service: &Service,
    route: &ConfidentRoute,
    transcript: &str,
    outcome: RequestOutcome,
) -> Result<(), StoreError> {
    let entry = RequestLog {
        id: Uuid::new_v4(),
        transcript: transcript.to_owned(),
        selected_service: service.name.clone(),
        endpoint: route.endpoint.clone(),
        arguments: route.parameters.clone(),
        confidence: DISPATCH_CONFIDENCE,
        timestamp: OffsetDateTime::now_utc(),
        outcome,
    };
    state.store.append_request(&entry).await
}

fn string_field(data: &Value, key: &str) -> Option<String> {
    data.get(key).and_then(Value::as_str).map(str::to_owned)
}

#[cfg(test)]
#[path = "dispatcher_test.rs"]
mod tests;
