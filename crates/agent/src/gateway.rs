//! Model gateway: the one door to the language-model backend.
//!
//! Resolves model aliases, sends the transcript plus tool catalog, and
//! prices the call's token usage onto the session. Failures are returned
//! as-is; nothing here retries.

use ember_core::error::ProviderError;
use ember_core::message::{Message, Transcript};
use ember_core::provider::{Provider, ProviderRequest, ToolDefinition, Usage};
use ember_core::session::Session;
use ember_telemetry::PricingTable;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// One successful model call.
#[derive(Debug, Clone)]
pub struct Completion {
    pub message: Message,
    /// The model that answered
    pub model: String,
    pub usage: Usage,
    /// USD
    pub cost: f64,
}

impl Completion {
    pub fn wants_tools(&self) -> bool {
        !self.message.tool_calls.is_empty()
    }
}

pub struct ModelGateway {
    provider: Arc<dyn Provider>,
    pricing: PricingTable,
    default_model: String,
    aliases: BTreeMap<String, String>,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl ModelGateway {
    pub fn new(provider: Arc<dyn Provider>, default_model: impl Into<String>) -> Self {
        Self {
            provider,
            pricing: PricingTable::with_defaults(),
            default_model: default_model.into(),
            aliases: BTreeMap::new(),
            temperature: 0.7,
            max_tokens: None,
        }
    }

    pub fn with_pricing(mut self, pricing: PricingTable) -> Self {
        self.pricing = pricing;
        self
    }

    /// Task aliases such as `code` or `best`.
    pub fn with_aliases(mut self, aliases: BTreeMap<String, String>) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Alias → model id. `None`, empty and `default` give the default model;
    /// anything unknown is taken as a literal model id.
    pub fn resolve_model(&self, requested: Option<&str>) -> String {
        match requested.map(str::trim) {
            None | Some("") | Some("default") => self.default_model.clone(),
            Some(name) => self
                .aliases
                .get(name)
                .cloned()
                .unwrap_or_else(|| name.to_string()),
        }
    }

    /// Send the transcript and catalog to `model`. Usage and cost are added
    /// to `session` only when the call succeeds.
    pub async fn complete(
        &self,
        transcript: &Transcript,
        tools: &[ToolDefinition],
        model: &str,
        session: &mut Session,
    ) -> Result<Completion, ProviderError> {
        let request = ProviderRequest {
            model: model.to_string(),
            messages: transcript.messages().to_vec(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: tools.to_vec(),
        };

        let response = self.provider.complete(request).await?;
        let usage = response.usage.unwrap_or_default();
        let cost = self
            .pricing
            .compute_cost(&response.model, usage.prompt_tokens, usage.completion_tokens);
        session.add_usage(usage.total_tokens, cost);

        debug!(
            model = %response.model,
            tokens = usage.total_tokens,
            cost,
            tool_calls = response.message.tool_calls.len(),
            "Model responded"
        );

        Ok(Completion {
            message: response.message,
            model: response.model,
            usage,
            cost,
        })
    }
}
