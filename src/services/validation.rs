//! Request body shape checks that run before any core logic.

use serde_json::Value;

use crate::error::{ErrorCode, ErrorKind};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub &'static str);

impl ErrorCode for ValidationError {
    fn error_code(&self) -> &'static str {
        "E_VALIDATION"
    }

    fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

const BAD_TRANSCRIPT: ValidationError = ValidationError("Invalid or missing transcript");
const BAD_REGISTRATION: ValidationError = ValidationError("Invalid baseUrl or apiKey");
const BAD_SELECTION: ValidationError = ValidationError("Invalid serviceId or endpointIndex");

/// A registration request that passed shape checks. `base_url` has no
/// trailing `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    base_url: String,
    api_key: String,
}

impl Registration {
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

/// A manual selection request. `service_id` is kept raw: an id that is not a
/// UUID simply matches no service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub transcript: String,
    pub service_id: String,
    pub endpoint_index: u64,
}

/// `transcript` must be a string with non-whitespace content.
///
/// # Errors
///
/// Returns [`ValidationError`] otherwise.
pub fn transcript(body: &Value) -> Result<String, ValidationError> {
    body.get("transcript")
        .and_then(Value::as_str)
        .filter(|t| !t.trim().is_empty())
        .map(str::to_owned)
        .ok_or(BAD_TRANSCRIPT)
}

/// `baseUrl` and `apiKey` from a registration body.
///
/// # Errors
///
/// Returns [`ValidationError`] if either is missing or not a string, or the
/// pair fails [`check_registration`].
pub fn registration(body: &Value) -> Result<Registration, ValidationError> {
    let base_url = body.get("baseUrl").and_then(Value::as_str).ok_or(BAD_REGISTRATION)?;
    let api_key = body.get("apiKey").and_then(Value::as_str).ok_or(BAD_REGISTRATION)?;
    check_registration(base_url, api_key)
}

/// `base_url` must be an absolute http(s) URL with a host; `api_key` must be
/// non-empty.
///
/// # Errors
///
/// Returns [`ValidationError`] otherwise.
pub fn check_registration(base_url: &str, api_key: &str) -> Result<Registration, ValidationError> {
    if api_key.is_empty() {
        return Err(BAD_REGISTRATION);
    }
    let url = reqwest::Url::parse(base_url.trim()).map_err(|_| BAD_REGISTRATION)?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(BAD_REGISTRATION);
    }
    Ok(Registration { base_url: base_url.trim().trim_end_matches('/').to_owned(), api_key: api_key.to_owned() })
}

/// `transcript`, `serviceId`, and a non-negative integer `endpointIndex`.
///
/// # Errors
///
/// Returns [`ValidationError`] if any field is missing or mistyped.
pub fn selection(body: &Value) -> Result<Selection, ValidationError> {
    let transcript = transcript(body)?;
    let service_id = body.get("serviceId").and_then(Value::as_str).ok_or(BAD_SELECTION)?;
    let endpoint_index = body.get("endpointIndex").and_then(Value::as_u64).ok_or(BAD_SELECTION)?;
    Ok(Selection { transcript, service_id: service_id.to_owned(), endpoint_index })
}

#[cfg(test)]
#[path = "validation_test.rs"]
mod tests;
