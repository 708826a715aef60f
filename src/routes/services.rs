//! Service registry routes and the read-only request log.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::routes::auth::ApiKey;
use crate::routes::{ApiError, json_body};
use crate::services::registry;
use crate::services::validation;
use crate::state::AppState;

fn service_not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "E_SERVICE_NOT_FOUND", "Service not found")
}

/// Ids that are not UUIDs cannot name a service.
fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| service_not_found())
}

/// `GET /api/services` — every registered service, healthy or not.
pub async fn list_services(State(state): State<AppState>, _auth: ApiKey) -> Result<Json<Value>, ApiError> {
    let services = registry::list(&state).await.map_err(ApiError::from_error)?;
    Ok(Json(json!({ "services": services })))
}

/// `GET /api/services/{id}`
pub async fn get_service(
    State(state): State<AppState>,
    _auth: ApiKey,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let service = registry::get(&state, parse_id(&id)?)
        .await
        .map_err(ApiError::from_error)?
        .ok_or_else(service_not_found)?;
    Ok(Json(json!({ "service": service })))
}

/// `POST /api/services/register` — fetch a service's docs and register it.
pub async fn register_service(
    State(state): State<AppState>,
    _auth: ApiKey,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let registration = validation::registration(&json_body(body)).map_err(ApiError::from_error)?;
    let service = registry::register(&state, &registration)
        .await
        .map_err(ApiError::from_error)?;
    Ok((StatusCode::CREATED, Json(json!({ "service": service }))))
}

/// `DELETE /api/services/{id}`
pub async fn unregister_service(
    State(state): State<AppState>,
    _auth: ApiKey,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let service = registry::unregister(&state, parse_id(&id)?)
        .await
        .map_err(ApiError::from_error)?;
    Ok(Json(json!({ "message": "Service unregistered", "service": service })))
}

/// `GET /api/requests` — the request log, oldest first.
pub async fn list_requests(State(state): State<AppState>, _auth: ApiKey) -> Result<Json<Value>, ApiError> {
    let requests = state
        .store
        .list_requests()
        .await
        .map_err(ApiError::from_error)?;
    Ok(Json(json!({ "requests": requests })))
}

#[cfg(test)]
#[path = "services_test.rs"]
mod tests;
