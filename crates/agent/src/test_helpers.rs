//! Shared test helpers: a provider that plays back a script.

use ember_core::error::ProviderError;
use ember_core::message::{Message, MessageToolCall};
use ember_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Returns scripted responses in order and records every request.
///
/// With `always`, the same response repeats forever. An exhausted script
/// answers with a malformed-response error.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    repeat: Option<ProviderResponse>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().map(Ok).collect()),
            repeat: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            script: Mutex::new(VecDeque::from([Err(error)])),
            repeat: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn always(response: ProviderResponse) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            repeat: Some(response),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn reply(text: &str) -> ProviderResponse {
        Self::reply_with_usage(text, "mock-model", 10, 5)
    }

    pub fn reply_with_usage(text: &str, model: &str, prompt: u32, completion: u32) -> ProviderResponse {
        ProviderResponse {
            message: Message::assistant(text),
            usage: Some(Usage::new(prompt, completion)),
            model: model.into(),
        }
    }

    /// A response requesting the given `(name, args)` calls in order.
    pub fn tool_calls(calls: &[(&str, serde_json::Value)]) -> ProviderResponse {
        let calls = calls
            .iter()
            .enumerate()
            .map(|(i, (name, args))| MessageToolCall {
                id: format!("call_{i}_{name}"),
                name: name.to_string(),
                arguments: args.to_string(),
            })
            .collect();
        ProviderResponse {
            message: Message::assistant_with_calls("", calls),
            usage: Some(Usage::new(10, 5)),
            model: "mock-model".into(),
        }
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return next;
        }
        self.repeat
            .clone()
            .ok_or_else(|| ProviderError::MalformedResponse("script exhausted".into()))
    }
}
