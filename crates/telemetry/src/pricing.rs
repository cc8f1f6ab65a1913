//! Pricing table for the models Ember talks to.
//!
//! Prices are in USD per 1 million tokens, one input and one output price
//! per model. Models missing from the table are billed at a flat fallback
//! rate so cost tracking never silently reads zero. Overrides come from the
//! `[pricing]` section of the config file.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Per-million-token pricing for a model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Price per 1M input tokens in USD.
    pub input_per_m: f64,
    /// Price per 1M output tokens in USD.
    pub output_per_m: f64,
}

impl ModelPricing {
    pub const fn new(input_per_m: f64, output_per_m: f64) -> Self {
        Self {
            input_per_m,
            output_per_m,
        }
    }

    /// Compute cost for the given token counts.
    pub fn cost(&self, input_tokens: u32, output_tokens: u32) -> f64 {
        (f64::from(input_tokens) * self.input_per_m + f64::from(output_tokens) * self.output_per_m)
            / 1_000_000.0
    }
}

/// Rate for any model not in the table.
pub const FALLBACK_PRICING: ModelPricing = ModelPricing::new(0.5, 1.5);

#[derive(Debug, Clone)]
pub struct PricingTable {
    prices: HashMap<String, ModelPricing>,
    fallback: ModelPricing,
}

impl PricingTable {
    /// Create a pricing table with built-in model prices.
    pub fn with_defaults() -> Self {
        let mut prices = HashMap::new();
        prices.insert("openai/gpt-4o".into(), ModelPricing::new(2.5, 10.0));
        prices.insert("openai/gpt-4o-mini".into(), ModelPricing::new(0.15, 0.6));
        prices.insert("anthropic/claude-3.5-sonnet".into(), ModelPricing::new(3.0, 15.0));
        prices.insert("anthropic/claude-3-haiku".into(), ModelPricing::new(0.25, 1.25));

        Self {
            prices,
            fallback: FALLBACK_PRICING,
        }
    }

    /// Create an empty pricing table; everything bills at the fallback.
    pub fn empty() -> Self {
        Self {
            prices: HashMap::new(),
            fallback: FALLBACK_PRICING,
        }
    }

    /// Layer custom prices over the table.
    pub fn with_overrides(mut self, overrides: impl IntoIterator<Item = (String, ModelPricing)>) -> Self {
        for (model, pricing) in overrides {
            self.set(model, pricing);
        }
        self
    }

    /// Look up pricing for a model. Returns None if not found.
    pub fn get(&self, model: &str) -> Option<ModelPricing> {
        self.prices.get(model).copied()
    }

    /// Add or update pricing for a model.
    pub fn set(&mut self, model: impl Into<String>, pricing: ModelPricing) {
        self.prices.insert(model.into(), pricing);
    }

    /// Pricing that applies to `model`.
    ///
    /// Tries an exact match first, then the bare model name without its
    /// vendor prefix (`openai/gpt-4o` matches `gpt-4o`), then the longest
    /// known name the model starts with (`gpt-4o-mini-2024-07-18` matches
    /// `gpt-4o-mini`), then the fallback.
    pub fn pricing_for(&self, model: &str) -> ModelPricing {
        if let Some(p) = self.prices.get(model) {
            return *p;
        }

        let model_lower = model.to_lowercase();
        let bare_model = bare(&model_lower);

        let best = self
            .prices
            .iter()
            .filter(|(key, _)| bare_model.starts_with(&bare(key).to_lowercase()))
            .max_by_key(|(key, _)| bare(key).len());

        match best {
            Some((_, p)) => *p,
            None => {
                debug!(model = %model, "No pricing for model, using fallback rate");
                self.fallback
            }
        }
    }

    /// Cost in USD of one call.
    pub fn compute_cost(&self, model: &str, input_tokens: u32, output_tokens: u32) -> f64 {
        self.pricing_for(model).cost(input_tokens, output_tokens)
    }

    /// List all known model names, sorted.
    pub fn models(&self) -> Vec<String> {
        let mut names: Vec<String> = self.prices.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

fn bare(model: &str) -> &str {
    model.rsplit('/').next().unwrap_or(model)
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_has_models() {
        let table = PricingTable::with_defaults();
        assert_eq!(table.len(), 4);
        assert!(!table.is_empty());
    }

    #[test]
    fn known_model_cost() {
        let table = PricingTable::with_defaults();

        // Claude 3.5 Sonnet: $3/M input, $15/M output
        let cost = table.compute_cost("anthropic/claude-3.5-sonnet", 1000, 500);
        assert!((cost - 0.0105).abs() < 1e-10);
    }

    #[test]
    fn unknown_model_uses_fallback() {
        let table = PricingTable::with_defaults();
        let cost = table.compute_cost("unknown/model-xyz", 1_000_000, 1_000_000);
        assert!((cost - 2.0).abs() < 1e-10);
    }

    #[test]
    fn bare_and_versioned_names_match() {
        let table = PricingTable::with_defaults();
        let mini = table.pricing_for("gpt-4o-mini-2024-07-18");
        assert_eq!(mini, ModelPricing::new(0.15, 0.6));
        let full = table.pricing_for("gpt-4o");
        assert_eq!(full, ModelPricing::new(2.5, 10.0));
    }

    #[test]
    fn custom_pricing() {
        let table = PricingTable::empty()
            .with_overrides([("custom/model".to_string(), ModelPricing::new(1.0, 2.0))]);
        assert_eq!(table.len(), 1);

        let cost = table.compute_cost("custom/model", 1_000_000, 1_000_000);
        assert!((cost - 3.0).abs() < 1e-10);
    }

    #[test]
    fn model_pricing_cost() {
        let p = ModelPricing::new(5.0, 15.0);
        // (500*5 + 200*15) / 1M
        let c = p.cost(500, 200);
        assert!((c - 0.0055).abs() < 1e-10);
    }

    #[test]
    fn list_models_sorted() {
        let models = PricingTable::with_defaults().models();
        assert!(models.contains(&"openai/gpt-4o".to_string()));
        assert!(models.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn override_replaces_existing() {
        let mut table = PricingTable::with_defaults();
        let old = table.compute_cost("openai/gpt-4o", 1_000_000, 0);
        assert!((old - 2.5).abs() < 1e-10);

        table.set("openai/gpt-4o", ModelPricing::new(5.0, 20.0));
        let new_cost = table.compute_cost("openai/gpt-4o", 1_000_000, 0);
        assert!((new_cost - 5.0).abs() < 1e-10);
    }
}
