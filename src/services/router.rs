//! Intent resolver — one LLM tool-selection call per transcript.
//!
//! DESIGN
//! ======
//! The model sees a fixed dispatcher instruction, the transcript as the only
//! user turn, and one tool per endpoint of every healthy service. Selecting
//! a tool is a confident decision; answering in text is an uncertain one.
//! Only the first tool selection is honored.
//!
//! ERROR HANDLING
//! ==============
//! Argument payloads are checked explicitly: the provider may hand back a
//! raw string, a non-object, or unparseable JSON, and each of those is a
//! [`RouteError::InvalidArguments`] rather than a parse fault.

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::StoreError;
use crate::error::{ErrorCode, ErrorKind};
use crate::llm::types::{ChatRequest, LlmError, Message};
use crate::model::{Endpoint, Parameters, Service, ServiceSummary};
use crate::services::capability::ToolCatalog;
use crate::state::AppState;

pub const SYSTEM_PROMPT: &str = "You are a service dispatcher. Based on the user's voice command, select the most \
appropriate service and endpoint to handle the request. Extract relevant parameters from the voice command. If \
uncertain, do not call a tool; explain why instead.";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("Language model not configured")]
    LlmNotConfigured,
    #[error("No healthy services available")]
    NoHealthyServices,
    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
    #[error("model selected unknown tool: {0}")]
    UnknownTool(String),
    #[error("LLM service error: {0}")]
    Llm(#[from] LlmError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ErrorCode for RouteError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::LlmNotConfigured => "E_LLM_NOT_CONFIGURED",
            Self::NoHealthyServices => "E_NO_HEALTHY_SERVICES",
            Self::InvalidArguments(_) => "E_INVALID_ARGUMENTS",
            Self::UnknownTool(_) => "E_UNKNOWN_TOOL",
            Self::Llm(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
        }
    }

    fn kind(&self) -> ErrorKind {
        match self {
            Self::LlmNotConfigured | Self::NoHealthyServices => ErrorKind::Unavailable,
            Self::InvalidArguments(_) => ErrorKind::Validation,
            Self::UnknownTool(_) => ErrorKind::Internal,
            Self::Llm(e) => e.kind(),
            Self::Store(e) => e.kind(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Llm(e) => e.retryable(),
            _ => false,
        }
    }
}

/// A resolved endpoint plus the parameters to send it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidentRoute {
    pub service_id: Uuid,
    pub service_name: String,
    pub endpoint: Endpoint,
    pub parameters: Parameters,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoutingDecision {
    Confident(ConfidentRoute),
    Uncertain { explanation: String, available_services: Vec<ServiceSummary> },
}

// =============================================================================
// ROUTING
// =============================================================================

/// Ask the model to pick a healthy service endpoint for `transcript`.
///
/// # Errors
///
/// [`RouteError::LlmNotConfigured`] without an LLM,
/// [`RouteError::NoHealthyServices`] when nothing is eligible,
/// [`RouteError::Llm`] on model transport or API failure, and
/// [`RouteError::InvalidArguments`] for a malformed argument payload.
pub async fn route_request(state: &AppState, transcript: &str) -> Result<RoutingDecision, RouteError> {
    let Some(llm) = &state.llm else {
        return Err(RouteError::LlmNotConfigured);
    };

    let healthy: Vec<_> = state
        .store
        .list_services()
        .await?
        .into_iter()
        .filter(Service::is_healthy)
        .collect();
    let catalog = ToolCatalog::build(&healthy);
    if catalog.is_empty() {
        return Err(RouteError::NoHealthyServices);
    }
    info!(services = healthy.len(), tools = catalog.len(), "routing request");

    let messages = [Message::user(transcript)];
    let response = llm
        .chat(ChatRequest {
            max_tokens: state.llm_max_tokens,
            system: SYSTEM_PROMPT,
            messages: &messages,
            tools: catalog.tools(),
        })
        .await?;
    info!(
        model = %response.model,
        stop_reason = %response.stop_reason,
        input_tokens = response.input_tokens,
        output_tokens = response.output_tokens,
        "routing model responded"
    );

    let Some((name, input)) = response.first_tool_use() else {
        return Ok(RoutingDecision::Uncertain {
            explanation: response.text().unwrap_or_default(),
            available_services: healthy.iter().map(Service::summary).collect(),
        });
    };
    if response.tool_use_count() > 1 {
        warn!(count = response.tool_use_count(), "model selected several tools; using the first");
    }

    let target = catalog.resolve(name).ok_or_else(|| RouteError::UnknownTool(name.to_owned()))?;
    let parameters = parse_arguments(input)?;
    info!(service = %target.service_name, endpoint = target.endpoint_index, tool = name, "route selected");

    Ok(RoutingDecision::Confident(ConfidentRoute {
        service_id: target.service_id,
        service_name: target.service_name.clone(),
        endpoint: target.endpoint.clone(),
        parameters,
    }))
}

/// Coerce a tool-call argument payload into a parameter map.
///
/// # Errors
///
/// [`RouteError::InvalidArguments`] unless the payload is an object, a string
/// holding a JSON object, or null.
pub fn parse_arguments(input: &Value) -> Result<Parameters, RouteError> {
    match input {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(Parameters::new()),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(RouteError::InvalidArguments(format!("expected an object, got {other}"))),
            Err(e) => Err(RouteError::InvalidArguments(e.to_string())),
        },
        other => Err(RouteError::InvalidArguments(format!("expected an object, got {other}"))),
    }
}

#[cfg(test)]
#[path = "router_test.rs"]
mod tests;
