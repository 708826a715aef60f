//! Persisted records: registered services and the request log.
//!
//! DESIGN
//! ======
//! These types mirror the two store collections (`services`, `requests`)
//! and serialize with the camelCase keys the HTTP API returns. Timestamps
//! are RFC 3339 on the wire.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

/// Structured call parameters extracted from a transcript.
pub type Parameters = Map<String, Value>;

// =============================================================================
// SERVICE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Unhealthy,
}

impl ServiceStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "healthy" => Some(Self::Healthy),
            "unhealthy" => Some(Self::Unhealthy),
            _ => None,
        }
    }
}

/// One callable operation advertised by a service's self-description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub description: String,
    /// JSON Schema for the call parameters. `None` when the service declares none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

impl Endpoint {
    /// Read-only endpoints carry parameters in the query string.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET") || self.method.eq_ignore_ascii_case("HEAD")
    }
}

/// A registered backend service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub base_url: String,
    pub api_key: String,
    pub endpoints: Vec<Endpoint>,
    #[serde(with = "time::serde::rfc3339")]
    pub registered_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_health_check: OffsetDateTime,
    pub status: ServiceStatus,
}

impl Service {
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status == ServiceStatus::Healthy
    }

    #[must_use]
    pub fn summary(&self) -> ServiceSummary {
        ServiceSummary { id: self.id, name: self.name.clone(), description: self.description.clone() }
    }
}

/// Candidate shown to a caller when routing is uncertain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSummary {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

// =============================================================================
// REQUEST LOG
// =============================================================================

/// Result of one dispatch attempt, flattened into its [`RequestLog`] entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum RequestOutcome {
    Success {
        #[serde(rename = "callbackUrl")]
        callback_url: Option<String>,
        response: Value,
    },
    Error {
        error: String,
    },
}

impl RequestOutcome {
    #[must_use]
    pub fn result_str(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Error { .. } => "error",
        }
    }
}

/// Append-only record of one dispatch attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestLog {
    pub id: Uuid,
    pub transcript: String,
    pub selected_service: String,
    pub endpoint: Endpoint,
    pub arguments: Parameters,
    pub confidence: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(flatten)]
    pub outcome: RequestOutcome,
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;
