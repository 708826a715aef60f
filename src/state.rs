//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor and
//! passed by reference into every service function. The store is the only
//! shared mutable resource; everything else is read-only after startup.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::Store;
use crate::llm::types::LlmChat;

/// Shared application state. Clone is required by Axum; all inner fields are
/// Arc-wrapped or cheaply cloneable.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    /// Optional LLM client. `None` if LLM env vars are not configured.
    pub llm: Option<Arc<dyn LlmChat>>,
    /// Output budget for one routing call.
    pub llm_max_tokens: u32,
    /// Outbound client for docs fetches, health probes, and dispatch. Timeouts
    /// are applied per request from `config.timing`.
    pub http: reqwest::Client,
    pub config: Arc<AppConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(config: AppConfig, store: Arc<dyn Store>, llm: Option<Arc<dyn LlmChat>>, llm_max_tokens: u32) -> Self {
        Self { store, llm, llm_max_tokens, http: reqwest::Client::new(), config: Arc::new(config) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
