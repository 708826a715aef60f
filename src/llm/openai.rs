//! OpenAI-compatible API client.
//!
//! Supports both `/chat/completions` and `/responses`. Tool-call arguments
//! arrive as a JSON string; when that string does not parse, the raw text is
//! kept as a `Value::String` so the caller can reject it explicitly instead
//! of silently routing with empty parameters.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use super::config::{LlmTimeouts, OpenAiApiMode};
use super::types::{ChatRequest, ChatResponse, ContentBlock, LlmError, Tool};

pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    mode: OpenAiApiMode,
}

impl OpenAiClient {
    pub fn new(api_key: String, mode: OpenAiApiMode, base_url: String, timeouts: LlmTimeouts) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| LlmError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, api_key, base_url, mode })
    }

    pub async fn chat(&self, model: &str, request: ChatRequest<'_>) -> Result<ChatResponse, LlmError> {
        match self.mode {
            OpenAiApiMode::ChatCompletions => {
                let body = CcRequest::new(model, request);
                let text = self.send_json("/chat/completions", &body).await?;
                parse_chat_completions_response(&text)
            }
            OpenAiApiMode::Responses => {
                let body = RespRequest::new(model, request);
                let text = self.send_json("/responses", &body).await?;
                parse_responses_response(&text)
            }
        }
    }

    async fn send_json(&self, path: &str, body: &impl Serialize) -> Result<String, LlmError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;
        if status != 200 {
            return Err(LlmError::ApiResponse { status, body: text });
        }
        Ok(text)
    }
}

// =============================================================================
// CHAT COMPLETIONS — wire types
// =============================================================================

#[derive(Serialize)]
struct CcRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<CcMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<CcToolDef<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

impl<'a> CcRequest<'a> {
    fn new(model: &'a str, request: ChatRequest<'a>) -> Self {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if !request.system.trim().is_empty() {
            messages.push(CcMessage { role: "system", content: request.system });
        }
        messages.extend(
            request
                .messages
                .iter()
                .map(|m| CcMessage { role: &m.role, content: &m.content }),
        );
        Self {
            model,
            max_tokens: request.max_tokens,
            messages,
            tools: request.tools.iter().map(CcToolDef::from).collect(),
            tool_choice: (!request.tools.is_empty()).then_some("auto"),
        }
    }
}

#[derive(Serialize)]
struct CcMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct CcToolDef<'a> {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: CcFunctionDef<'a>,
}

#[derive(Serialize)]
struct CcFunctionDef<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

impl<'a> From<&'a Tool> for CcToolDef<'a> {
    fn from(tool: &'a Tool) -> Self {
        Self {
            tool_type: "function",
            function: CcFunctionDef {
                name: &tool.name,
                description: &tool.description,
                parameters: &tool.input_schema,
            },
        }
    }
}

// =============================================================================
// RESPONSES — wire types
// =============================================================================

#[derive(Serialize)]
struct RespRequest<'a> {
    model: &'a str,
    max_output_tokens: u32,
    instructions: &'a str,
    input: Vec<RespInputMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<RespToolDef<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

impl<'a> RespRequest<'a> {
    fn new(model: &'a str, request: ChatRequest<'a>) -> Self {
        Self {
            model,
            max_output_tokens: request.max_tokens,
            instructions: request.system,
            input: request
                .messages
                .iter()
                .map(|m| RespInputMessage {
                    item_type: "message",
                    role: &m.role,
                    content: vec![RespTextContent { content_type: "input_text", text: &m.content }],
                })
                .collect(),
            tools: request.tools.iter().map(RespToolDef::from).collect(),
            tool_choice: (!request.tools.is_empty()).then_some("auto"),
        }
    }
}

#[derive(Serialize)]
struct RespInputMessage<'a> {
    #[serde(rename = "type")]
    item_type: &'static str,
    role: &'a str,
    content: Vec<RespTextContent<'a>>,
}

#[derive(Serialize)]
struct RespTextContent<'a> {
    #[serde(rename = "type")]
    content_type: &'static str,
    text: &'a str,
}

#[derive(Serialize)]
struct RespToolDef<'a> {
    #[serde(rename = "type")]
    tool_type: &'static str,
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

impl<'a> From<&'a Tool> for RespToolDef<'a> {
    fn from(tool: &'a Tool) -> Self {
        Self { tool_type: "function", name: &tool.name, description: &tool.description, parameters: &tool.input_schema }
    }
}

// =============================================================================
// RESPONSE PARSING
// =============================================================================

/// Parse a tool-call argument string. Unparseable text is preserved verbatim.
fn parse_arguments(raw: Option<&str>) -> Value {
    match raw {
        None => Value::Object(serde_json::Map::default()),
        Some(args) => serde_json::from_str::<Value>(args).unwrap_or_else(|_| Value::String(args.to_owned())),
    }
}

fn usage(root: &Value, input_key: &str, output_key: &str) -> (u64, u64) {
    let read = |key: &str| {
        root.get("usage")
            .and_then(|u| u.get(key))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    };
    (read(input_key), read(output_key))
}

fn stop_reason_for(content: &[ContentBlock], truncated: bool) -> String {
    if content
        .iter()
        .any(|block| matches!(block, ContentBlock::ToolUse { .. }))
    {
        "tool_use".to_string()
    } else if truncated {
        "max_tokens".to_string()
    } else {
        "end_turn".to_string()
    }
}

pub(crate) fn parse_chat_completions_response(json_text: &str) -> Result<ChatResponse, LlmError> {
    let root: Value = serde_json::from_str(json_text).map_err(|e| LlmError::ApiParse(e.to_string()))?;
    let model = root
        .get("model")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_default();
    let (input_tokens, output_tokens) = usage(&root, "prompt_tokens", "completion_tokens");

    let Some(choice) = root
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
    else {
        return Err(LlmError::ApiParse("chat_completions: missing choices[0]".to_string()));
    };
    let truncated = choice.get("finish_reason").and_then(Value::as_str) == Some("length");
    let message = choice.get("message").cloned().unwrap_or(Value::Null);

    let mut content = Vec::new();
    if let Some(text) = message.get("content").and_then(Value::as_str) {
        if !text.is_empty() {
            content.push(ContentBlock::Text { text: text.to_string() });
        }
    }

    if let Some(tool_calls) = message.get("tool_calls").and_then(Value::as_array) {
        for call in tool_calls {
            let function = call.get("function");
            let Some(name) = function.and_then(|f| f.get("name")).and_then(Value::as_str) else {
                continue;
            };
            let Some(id) = call.get("id").and_then(Value::as_str).map(str::to_owned) else {
                return Err(LlmError::ApiParse("chat_completions: tool call missing id".to_string()));
            };
            let input = parse_arguments(function.and_then(|f| f.get("arguments")).and_then(Value::as_str));
            content.push(ContentBlock::ToolUse { id, name: name.to_string(), input });
        }
    }

    let stop_reason = stop_reason_for(&content, truncated);
    Ok(ChatResponse { content, model, stop_reason, input_tokens, output_tokens })
}

pub(crate) fn parse_responses_response(json_text: &str) -> Result<ChatResponse, LlmError> {
    let root: Value = serde_json::from_str(json_text).map_err(|e| LlmError::ApiParse(e.to_string()))?;
    let model = root
        .get("model")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_default();
    let (input_tokens, output_tokens) = usage(&root, "input_tokens", "output_tokens");

    let mut content = Vec::new();
    if let Some(items) = root.get("output").and_then(Value::as_array) {
        for item in items {
            match item.get("type").and_then(Value::as_str) {
                Some("message") => {
                    let Some(parts) = item.get("content").and_then(Value::as_array) else {
                        continue;
                    };
                    for part in parts {
                        let kind = part.get("type").and_then(Value::as_str);
                        let text = part.get("text").and_then(Value::as_str).unwrap_or("");
                        if matches!(kind, Some("output_text" | "text")) && !text.is_empty() {
                            content.push(ContentBlock::Text { text: text.to_string() });
                        }
                    }
                }
                Some("function_call") => {
                    let Some(id) = item
                        .get("call_id")
                        .or_else(|| item.get("id"))
                        .and_then(Value::as_str)
                        .map(str::to_owned)
                    else {
                        return Err(LlmError::ApiParse("responses: function_call missing call_id".to_string()));
                    };
                    let Some(name) = item.get("name").and_then(Value::as_str) else {
                        continue;
                    };
                    let input = parse_arguments(item.get("arguments").and_then(Value::as_str));
                    content.push(ContentBlock::ToolUse { id, name: name.to_string(), input });
                }
                _ => {}
            }
        }
    } else if let Some(output_text) = root.get("output_text").and_then(Value::as_str) {
        if !output_text.is_empty() {
            content.push(ContentBlock::Text { text: output_text.to_string() });
        }
    }

    let truncated = root
        .get("incomplete_details")
        .and_then(|d| d.get("reason"))
        .and_then(Value::as_str)
        == Some("max_output_tokens");
    let stop_reason = stop_reason_for(&content, truncated);
    Ok(ChatResponse { content, model, stop_reason, input_tokens, output_tokens })
}

#[cfg(test)]
#[path = "openai_test.rs"]
mod tests;
