//! Service registry — register, unregister, list, and look up services.
//!
//! DESIGN
//! ======
//! Registration pulls the service's self-description from
//! `GET {baseUrl}/dispatch/docs` using the caller-supplied credential, then
//! persists a new healthy record. The registry is the only writer of
//! service records apart from the health monitor's status updates.
//!
//! ERROR HANDLING
//! ==============
//! Name uniqueness is checked against the current list and again by the
//! store's atomic insert, so two concurrent registrations of the same name
//! both surface as [`RegistryError::DuplicateName`].

use serde::Deserialize;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::db::StoreError;
use crate::error::{ErrorCode, ErrorKind};
use crate::model::{Endpoint, Service, ServiceStatus};
use crate::services::validation::{Registration, ValidationError};
use crate::state::AppState;

const DOCS_PATH: &str = "/dispatch/docs";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Invalid service documentation: {0}")]
    InvalidDocument(String),
    #[error("Service {0} already registered")]
    DuplicateName(String),
    #[error("Service not found")]
    NotFound(Uuid),
    #[error("Failed to fetch service documentation: {0}")]
    DocsFetch(String),
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for RegistryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateName(name) => Self::DuplicateName(name),
            other => Self::Store(other),
        }
    }
}

impl ErrorCode for RegistryError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.error_code(),
            Self::InvalidDocument(_) => "E_INVALID_SERVICE_DOC",
            Self::DuplicateName(_) => "E_DUPLICATE_NAME",
            Self::NotFound(_) => "E_SERVICE_NOT_FOUND",
            Self::DocsFetch(_) => "E_DOCS_FETCH",
            Self::Store(e) => e.error_code(),
        }
    }

    fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::InvalidDocument(_) => ErrorKind::Validation,
            Self::DuplicateName(_) => ErrorKind::Conflict,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::DocsFetch(_) => ErrorKind::Upstream,
            Self::Store(e) => e.kind(),
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::DocsFetch(_))
    }
}

/// Self-description document served at `/dispatch/docs`.
#[derive(Debug, Deserialize)]
struct ServiceDoc {
    name: String,
    description: String,
    endpoints: Vec<Endpoint>,
}

impl ServiceDoc {
    fn validate(mut self) -> Result<Self, RegistryError> {
        if self.name.trim().is_empty() {
            return Err(RegistryError::InvalidDocument("name is empty".into()));
        }
        if self.description.trim().is_empty() {
            return Err(RegistryError::InvalidDocument("description is empty".into()));
        }
        if self.endpoints.is_empty() {
            return Err(RegistryError::InvalidDocument("no endpoints".into()));
        }
        for endpoint in &mut self.endpoints {
            if reqwest::Method::from_bytes(endpoint.method.as_bytes()).is_err() {
                return Err(RegistryError::InvalidDocument(format!("invalid method '{}'", endpoint.method)));
            }
            endpoint.method = endpoint.method.to_ascii_uppercase();
        }
        Ok(self)
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Fetch the service's self-description and persist a new healthy record.
///
/// # Errors
///
/// [`RegistryError::DocsFetch`] if the docs endpoint is unreachable or not
/// 2xx, [`RegistryError::InvalidDocument`] if the body has the wrong shape,
/// [`RegistryError::DuplicateName`] if the name is taken.
pub async fn register(state: &AppState, registration: &Registration) -> Result<Service, RegistryError> {
    let doc = fetch_service_doc(state, registration).await?.validate()?;

    let existing = state.store.list_services().await?;
    if existing.iter().any(|s| s.name == doc.name) {
        return Err(RegistryError::DuplicateName(doc.name));
    }

    let now = OffsetDateTime::now_utc();
    let service = Service {
        id: Uuid::new_v4(),
        name: doc.name,
        description: doc.description,
        base_url: registration.base_url().to_owned(),
        api_key: registration.api_key().to_owned(),
        endpoints: doc.endpoints,
        registered_at: now,
        last_health_check: now,
        status: ServiceStatus::Healthy,
    };
    state.store.insert_service(&service).await?;

    info!(service = %service.name, id = %service.id, endpoints = service.endpoints.len(), "service registered");
    Ok(service)
}

/// Remove a service and return the removed record.
///
/// # Errors
///
/// [`RegistryError::NotFound`] if no service has this id.
pub async fn unregister(state: &AppState, service_id: Uuid) -> Result<Service, RegistryError> {
    let service = state
        .store
        .delete_service(service_id)
        .await?
        .ok_or(RegistryError::NotFound(service_id))?;
    info!(service = %service.name, id = %service.id, "service unregistered");
    Ok(service)
}

/// All services, healthy and unhealthy, in registration order.
///
/// # Errors
///
/// Returns an error if the store read fails.
pub async fn list(state: &AppState) -> Result<Vec<Service>, RegistryError> {
    Ok(state.store.list_services().await?)
}

/// Look up one service. Absence is `Ok(None)`.
///
/// # Errors
///
/// Returns an error if the store read fails.
pub async fn get(state: &AppState, service_id: Uuid) -> Result<Option<Service>, RegistryError> {
    Ok(state.store.get_service(service_id).await?)
}

async fn fetch_service_doc(state: &AppState, registration: &Registration) -> Result<ServiceDoc, RegistryError> {
    let url = format!("{}{DOCS_PATH}", registration.base_url());
    let response = state
        .http
        .get(&url)
        .header("x-api-key", registration.api_key())
        .timeout(state.config.timing.docs_timeout)
        .send()
        .await
        .map_err(|e| RegistryError::DocsFetch(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(RegistryError::DocsFetch(format!("{url} returned {status}")));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| RegistryError::DocsFetch(e.to_string()))?;
    serde_json::from_slice(&body).map_err(|e| RegistryError::InvalidDocument(e.to_string()))
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
