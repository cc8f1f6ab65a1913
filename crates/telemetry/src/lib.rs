//! Cost tracking for Ember.
//!
//! Every model call's token usage is priced here and accumulated on the
//! conversation's session.

pub mod pricing;

pub use pricing::{FALLBACK_PRICING, ModelPricing, PricingTable};
