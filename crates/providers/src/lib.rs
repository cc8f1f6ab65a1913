//! LLM provider implementations for Ember.
//!
//! All providers implement the `ember_core::Provider` trait. The runtime
//! talks to one OpenAI-compatible endpoint (OpenRouter by default).

pub mod openai_compat;

use ember_config::AppConfig;
use std::sync::Arc;
use std::time::Duration;

pub use openai_compat::OpenAiCompatProvider;

/// Build the configured provider. A missing API key still yields a
/// provider; its completions fail with `NotConfigured`.
pub fn build_from_config(config: &AppConfig) -> Arc<dyn ember_core::Provider> {
    let name = if config.provider.base_url.contains("openrouter.ai") {
        "openrouter"
    } else {
        "openai-compatible"
    };
    Arc::new(
        OpenAiCompatProvider::new(
            name,
            &config.provider.base_url,
            config.api_key.clone(),
            Duration::from_secs(config.provider.request_timeout_secs),
        )
        .with_app_name(&config.provider.app_name),
    )
}
