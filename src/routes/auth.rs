//! Static API-key authentication for `/api` routes.

use axum::extract::FromRef;
use axum::http::StatusCode;
use axum::http::request::Parts;
use tracing::warn;

use crate::routes::ApiError;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Proof that the request carried the shared dispatcher key. Use as a
/// handler parameter to require authentication.
pub struct ApiKey;

impl<S> axum::extract::FromRequestParts<S> for ApiKey
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(API_KEY_HEADER)
            .map(|v| v.as_bytes())
            .unwrap_or_default();
        if presented.is_empty() {
            warn!(path = %parts.uri.path(), "missing API key");
            return Err(ApiError::new(StatusCode::UNAUTHORIZED, "E_API_KEY_REQUIRED", "API key required"));
        }

        let app_state = AppState::from_ref(state);
        if presented != app_state.config.api_key.as_bytes() {
            warn!(path = %parts.uri.path(), "invalid API key");
            return Err(ApiError::new(StatusCode::FORBIDDEN, "E_API_KEY_INVALID", "Invalid API key"));
        }
        Ok(Self)
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
