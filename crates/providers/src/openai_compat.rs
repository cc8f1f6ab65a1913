//! OpenAI-compatible chat-completions client.
//!
//! The default endpoint is OpenRouter, which fronts OpenAI, Anthropic and
//! most other vendors behind one `/chat/completions` API. Any other
//! OpenAI-compatible base URL (OpenAI itself, Ollama, vLLM) works the same.
//!
//! Supports:
//! - Chat completions with tool use / function calling
//! - Token usage reporting
//! - Model listing

use async_trait::async_trait;
use ember_core::error::ProviderError;
use ember_core::message::{Message, MessageToolCall, Role};
use ember_core::provider::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: Option<String>,
    app_name: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider. Without an API key every
    /// completion fails with [`ProviderError::NotConfigured`].
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client: {e}");
                reqwest::Client::new()
            });

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            app_name: "Ember".into(),
            client,
        }
    }

    /// Create an OpenRouter provider (convenience constructor).
    pub fn openrouter(api_key: Option<String>) -> Self {
        Self::new("openrouter", OPENROUTER_BASE_URL, api_key, Duration::from_secs(120))
    }

    /// Name sent in OpenRouter's attribution header.
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key.as_deref().ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "no API key for {}; set EMBER_API_KEY or run `ember onboard`",
                self.name
            ))
        })
    }

    /// Convert our Message types to OpenAI API format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: match m.role {
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                    Role::System => "system".into(),
                    Role::Tool => "tool".into(),
                },
                content: Some(m.content.clone()),
                tool_calls: if m.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        m.tool_calls
                            .iter()
                            .map(|tc| ApiToolCall {
                                id: tc.id.clone(),
                                r#type: "function".into(),
                                function: ApiFunction {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.clone(),
                                },
                            })
                            .collect(),
                    )
                },
                tool_call_id: m.tool_call_id.clone(),
            })
            .collect()
    }

    /// Convert tool definitions to OpenAI API format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    fn request_body(request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
            body["tool_choice"] = serde_json::json!("auto");
        }
        body
    }
}

/// Map a non-success HTTP status to its error. `None` for 2xx.
fn status_error(status: u16, body: String) -> Option<ProviderError> {
    match status {
        200..=299 => None,
        401 | 403 => Some(ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        )),
        429 => Some(ProviderError::RateLimited {
            retry_after_secs: 5,
        }),
        404 if body.contains("model") => Some(ProviderError::ModelNotFound(body)),
        _ => Some(ProviderError::ApiError {
            status_code: status,
            message: body,
        }),
    }
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// Decode a chat-completions body into a response.
fn parse_response(body: &str, requested_model: &str) -> Result<ProviderResponse, ProviderError> {
    let api_response: ApiResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(format!("Failed to parse response: {e}")))?;

    let choice = api_response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::MalformedResponse("No choices in response".into()))?;

    let tool_calls: Vec<MessageToolCall> = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| MessageToolCall {
            id: tc.id,
            name: tc.function.name,
            arguments: tc.function.arguments,
        })
        .collect();

    let content = choice.message.content.unwrap_or_default();
    let message = if tool_calls.is_empty() {
        Message::assistant(content)
    } else {
        Message::assistant_with_calls(content, tool_calls)
    };

    let usage = api_response.usage.map(|u| Usage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    Ok(ProviderResponse {
        message,
        usage,
        model: api_response
            .model
            .unwrap_or_else(|| requested_model.to_string()),
    })
}

#[async_trait]
impl ember_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let api_key = self.api_key()?;
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::request_body(&request);

        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", "https://github.com/ember-agent/ember")
            .header("X-Title", &self.app_name)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(transport_error)?;

        if let Some(err) = status_error(status, text.clone()) {
            warn!(status, body = %text, "Provider returned error");
            return Err(err);
        }

        parse_response(&text, &request.model)
    }

    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }
        let response = request.send().await.map_err(transport_error)?;

        if !response.status().is_success() {
            return Ok(Vec::new());
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        let models = body["data"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|m| m["id"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        Ok(models)
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    #[serde(default = "function_type")]
    r#type: String,
    function: ApiFunction,
}

fn function_type() -> String {
    "function".into()
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::Provider;

    #[test]
    fn openrouter_constructor() {
        let provider = OpenAiCompatProvider::openrouter(Some("sk-test".into()));
        assert_eq!(provider.name(), "openrouter");
        assert!(provider.base_url.contains("openrouter.ai"));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let provider = OpenAiCompatProvider::new(
            "local",
            "http://localhost:11434/v1/",
            None,
            Duration::from_secs(5),
        );
        assert_eq!(provider.base_url, "http://localhost:11434/v1");
    }

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let provider = OpenAiCompatProvider::openrouter(Some("  ".into()));
        let err = provider
            .complete(ProviderRequest {
                model: "openai/gpt-4o-mini".into(),
                messages: vec![Message::user("hi")],
                temperature: 0.7,
                max_tokens: None,
                tools: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn message_conversion() {
        let messages = vec![Message::system("You are helpful"), Message::user("Hello")];
        let api_messages = OpenAiCompatProvider::to_api_messages(&messages);
        assert_eq!(api_messages.len(), 2);
        assert_eq!(api_messages[0].role, "system");
        assert_eq!(api_messages[1].role, "user");
    }

    #[test]
    fn message_conversion_with_tool_calls() {
        let msg = Message::assistant_with_calls(
            "",
            vec![MessageToolCall {
                id: "call_1".into(),
                name: "bash".into(),
                arguments: r#"{"command":"ls"}"#.into(),
            }],
        );
        let api_msgs = OpenAiCompatProvider::to_api_messages(&[msg]);
        let tc = api_msgs[0].tool_calls.as_ref().unwrap();
        assert_eq!(tc.len(), 1);
        assert_eq!(tc[0].function.name, "bash");
        assert_eq!(tc[0].r#type, "function");
    }

    #[test]
    fn message_conversion_tool_response() {
        let msg = Message::tool_result("call_1", "result data");
        let api_msgs = OpenAiCompatProvider::to_api_messages(&[msg]);
        assert_eq!(api_msgs[0].role, "tool");
        assert_eq!(api_msgs[0].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn request_body_includes_tools() {
        let request = ProviderRequest {
            model: "openai/gpt-4o-mini".into(),
            messages: vec![Message::user("list files")],
            temperature: 0.2,
            max_tokens: Some(512),
            tools: vec![ToolDefinition {
                name: "list_dir".into(),
                description: "List a directory".into(),
                parameters: serde_json::json!({"type": "object"}),
            }],
        };
        let body = OpenAiCompatProvider::request_body(&request);
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["tools"][0]["function"]["name"], "list_dir");
        assert_eq!(body["tool_choice"], "auto");
    }

    #[test]
    fn request_body_without_tools() {
        let request = ProviderRequest {
            model: "m".into(),
            messages: vec![],
            temperature: 0.7,
            max_tokens: None,
            tools: vec![],
        };
        let body = OpenAiCompatProvider::request_body(&request);
        assert!(body.get("tools").is_none());
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn parses_tool_call_response() {
        let body = r#"{
            "model": "openai/gpt-4o-mini",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "write_file", "arguments": "{\"path\":\"notes.txt\"}"}
                    }]
                }
            }],
            "usage": {"prompt_tokens": 100, "completion_tokens": 20, "total_tokens": 120}
        }"#;
        let response = parse_response(body, "fallback").unwrap();
        assert!(response.wants_tools());
        assert_eq!(response.message.tool_calls[0].name, "write_file");
        assert_eq!(response.message.tool_calls[0].arguments, r#"{"path":"notes.txt"}"#);
        assert_eq!(response.usage.unwrap().total_tokens, 120);
        assert_eq!(response.model, "openai/gpt-4o-mini");
    }

    #[test]
    fn parses_final_answer_without_model() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "Done."}}]}"#;
        let response = parse_response(body, "openai/gpt-4o").unwrap();
        assert!(!response.wants_tools());
        assert_eq!(response.message.content, "Done.");
        assert_eq!(response.model, "openai/gpt-4o");
        assert!(response.usage.is_none());
    }

    #[test]
    fn malformed_bodies() {
        assert!(matches!(
            parse_response("<html>", "m"),
            Err(ProviderError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_response(r#"{"choices": []}"#, "m"),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[test]
    fn status_mapping() {
        assert!(status_error(200, String::new()).is_none());
        assert!(matches!(
            status_error(401, String::new()),
            Some(ProviderError::AuthenticationFailed(_))
        ));
        assert!(matches!(
            status_error(403, String::new()),
            Some(ProviderError::AuthenticationFailed(_))
        ));
        assert!(matches!(
            status_error(429, String::new()),
            Some(ProviderError::RateLimited { .. })
        ));
        assert!(matches!(
            status_error(500, "boom".into()),
            Some(ProviderError::ApiError { status_code: 500, .. })
        ));
    }
}
