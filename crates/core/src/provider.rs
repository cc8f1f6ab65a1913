//! Provider trait: the abstraction over language-model backends.
//!
//! A backend receives the ordered transcript plus the tool catalog and
//! answers with either final content or an ordered list of tool-call
//! requests. Transport, auth and decoding failures come back as
//! [`ProviderError`] so they can never be confused with an empty reply.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;
use crate::message::Message;

/// A single completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// Target model id (e.g. "openai/gpt-4o-mini")
    pub model: String,

    pub messages: Vec<Message>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Tool catalog the model may call from
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

fn default_temperature() -> f32 {
    0.7
}

/// A tool definition sent to the model so it knows what it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,

    pub description: String,

    /// JSON-schema-like parameter contract
    pub parameters: serde_json::Value,
}

/// A complete response from a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated assistant message; `tool_calls` is non-empty when the
    /// model wants tools run instead of answering.
    pub message: Message,

    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

impl ProviderResponse {
    pub fn wants_tools(&self) -> bool {
        !self.message.tool_calls.is_empty()
    }
}

/// Token usage counters for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// The core Provider trait.
///
/// The agent loop only ever calls `complete()`; it does not know which
/// backend it is talking to.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openrouter").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError>;

    /// List available models for this provider.
    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageToolCall;

    #[test]
    fn usage_totals_both_directions() {
        let usage = Usage::new(120, 30);
        assert_eq!(usage.total_tokens, 150);
    }

    #[test]
    fn response_with_calls_wants_tools() {
        let response = ProviderResponse {
            message: Message::assistant_with_calls(
                "",
                vec![MessageToolCall {
                    id: "c1".into(),
                    name: "list_dir".into(),
                    arguments: "{}".into(),
                }],
            ),
            usage: None,
            model: "openai/gpt-4o-mini".into(),
        };
        assert!(response.wants_tools());
    }

    #[test]
    fn empty_content_is_still_a_final_reply() {
        let response = ProviderResponse {
            message: Message::assistant(""),
            usage: None,
            model: "openai/gpt-4o-mini".into(),
        };
        assert!(!response.wants_tools());
    }

    #[test]
    fn tool_definition_serialization() {
        let tool = ToolDefinition {
            name: "bash".into(),
            description: "Execute a shell command".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "command": { "type": "string", "description": "The command to run" }
                },
                "required": ["command"]
            }),
        };
        let json = serde_json::to_string(&tool).unwrap();
        assert!(json.contains("bash"));
        assert!(json.contains("command"));
    }
}
