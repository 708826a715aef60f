//! Capability translator — service endpoints to LLM tool descriptors.
//!
//! DESIGN
//! ======
//! A [`ToolCatalog`] is built fresh for every routing call from the services
//! that are healthy at that moment. Each tool name maps back to exactly one
//! endpoint target, which is how the model's choice is resolved.
//!
//! Names are `{service}_{method}_{path}` with `/` replaced by `_`, reduced
//! to the characters providers accept and capped at [`MAX_TOOL_NAME_LEN`].
//! Collisions after sanitizing get `_2`, `_3`, ... in service then endpoint
//! order, so the same registry always yields the same names.

use std::collections::HashMap;

use serde_json::json;
use uuid::Uuid;

use crate::llm::types::Tool;
use crate::model::{Endpoint, Service};

/// Provider function-name limit.
pub const MAX_TOOL_NAME_LEN: usize = 64;

/// Where a tool name points. Never sent to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolTarget {
    pub service_id: Uuid,
    pub service_name: String,
    pub endpoint_index: usize,
    pub endpoint: Endpoint,
}

#[derive(Debug, Default)]
pub struct ToolCatalog {
    tools: Vec<Tool>,
    targets: HashMap<String, ToolTarget>,
}

impl ToolCatalog {
    /// Build one tool per endpoint of every healthy service in `services`.
    #[must_use]
    pub fn build(services: &[Service]) -> Self {
        let mut catalog = Self::default();
        for service in services.iter().filter(|s| s.is_healthy()) {
            for (index, endpoint) in service.endpoints.iter().enumerate() {
                let name = catalog.unique_name(&base_tool_name(&service.name, &endpoint.method, &endpoint.path));
                catalog.tools.push(Tool {
                    name: name.clone(),
                    description: format!("{}: {}", service.description, endpoint.description),
                    input_schema: endpoint
                        .parameters
                        .clone()
                        .unwrap_or_else(|| json!({ "type": "object", "properties": {} })),
                });
                catalog.targets.insert(
                    name,
                    ToolTarget {
                        service_id: service.id,
                        service_name: service.name.clone(),
                        endpoint_index: index,
                        endpoint: endpoint.clone(),
                    },
                );
            }
        }
        catalog
    }

    #[must_use]
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Map a model-selected tool name back to its endpoint.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&ToolTarget> {
        self.targets.get(name)
    }

    fn unique_name(&self, base: &str) -> String {
        if !self.targets.contains_key(base) {
            return base.to_owned();
        }
        (2..)
            .map(|n| {
                let suffix = format!("_{n}");
                let keep = MAX_TOOL_NAME_LEN.saturating_sub(suffix.len()).min(base.len());
                format!("{}{suffix}", &base[..keep])
            })
            .find(|candidate| !self.targets.contains_key(candidate))
            .unwrap_or_default()
    }
}

/// Sanitized, length-capped tool name for one endpoint, before dedupe.
#[must_use]
pub fn base_tool_name(service_name: &str, method: &str, path: &str) -> String {
    let raw = format!("{service_name}_{}_{}", method.to_ascii_lowercase(), path.replace('/', "_"));
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .take(MAX_TOOL_NAME_LEN)
        .collect()
}

#[cfg(test)]
#[path = "capability_test.rs"]
mod tests;
