//! Model Pricing
//!
//! Per-model token prices for the providers that bill beyond their free
//! tier. Models without an entry are treated as free.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vibe_quota::Provider;

// ============================================================================
// Model Pricing Constants (per 1M tokens, USD)
// ============================================================================

// Mistral
/// Mistral Medium input cost per 1M tokens
pub const MISTRAL_MEDIUM_INPUT_COST: f64 = 0.27;
/// Mistral Medium output cost per 1M tokens
pub const MISTRAL_MEDIUM_OUTPUT_COST: f64 = 0.81;
/// Mistral Large input cost per 1M tokens
pub const MISTRAL_LARGE_INPUT_COST: f64 = 2.0;
/// Mistral Large output cost per 1M tokens
pub const MISTRAL_LARGE_OUTPUT_COST: f64 = 6.0;

// Groq
/// Llama 3.1 8B Instant input cost per 1M tokens
pub const GROQ_LLAMA_8B_INPUT_COST: f64 = 0.05;
/// Llama 3.1 8B Instant output cost per 1M tokens
pub const GROQ_LLAMA_8B_OUTPUT_COST: f64 = 0.08;
/// Llama 3.3 70B Versatile input cost per 1M tokens
pub const GROQ_LLAMA_70B_INPUT_COST: f64 = 0.59;
/// Llama 3.3 70B Versatile output cost per 1M tokens
pub const GROQ_LLAMA_70B_OUTPUT_COST: f64 = 0.79;

/// Mistral models served free for experimentation
const MISTRAL_FREE_MODELS: [&str; 5] = [
    "mistral-small-latest",
    "mistral-small-2506",
    "open-mistral-7b",
    "open-mixtral-8x7b",
    "open-mixtral-8x22b",
];

/// Price of a single model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Model name
    pub model: String,
    /// Provider serving the model
    pub provider: Provider,
    /// Cost per 1M input tokens (USD)
    pub input_cost_per_million: f64,
    /// Cost per 1M output tokens (USD)
    pub output_cost_per_million: f64,
}

impl ModelPricing {
    /// Create a pricing entry
    #[must_use]
    pub fn new(
        model: impl Into<String>,
        provider: Provider,
        input_cost_per_million: f64,
        output_cost_per_million: f64,
    ) -> Self {
        Self {
            model: model.into(),
            provider,
            input_cost_per_million,
            output_cost_per_million,
        }
    }

    /// Calculate cost for given token counts
    #[must_use]
    pub fn calculate_cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        let input_cost = (input_tokens as f64 / 1_000_000.0) * self.input_cost_per_million;
        let output_cost = (output_tokens as f64 / 1_000_000.0) * self.output_cost_per_million;
        input_cost + output_cost
    }
}

/// Default pricing table keyed by model name
#[must_use]
pub fn default_pricing() -> HashMap<String, ModelPricing> {
    let mut entries: Vec<ModelPricing> = MISTRAL_FREE_MODELS
        .iter()
        .map(|model| ModelPricing::new(*model, Provider::Mistral, 0.0, 0.0))
        .collect();

    entries.extend([
        ModelPricing::new(
            "mistral-medium-latest",
            Provider::Mistral,
            MISTRAL_MEDIUM_INPUT_COST,
            MISTRAL_MEDIUM_OUTPUT_COST,
        ),
        ModelPricing::new(
            "mistral-large-latest",
            Provider::Mistral,
            MISTRAL_LARGE_INPUT_COST,
            MISTRAL_LARGE_OUTPUT_COST,
        ),
        ModelPricing::new(
            "llama-3.1-8b-instant",
            Provider::Groq,
            GROQ_LLAMA_8B_INPUT_COST,
            GROQ_LLAMA_8B_OUTPUT_COST,
        ),
        ModelPricing::new(
            "llama-3.3-70b-versatile",
            Provider::Groq,
            GROQ_LLAMA_70B_INPUT_COST,
            GROQ_LLAMA_70B_OUTPUT_COST,
        ),
    ]);

    entries
        .into_iter()
        .map(|pricing| (pricing.model.clone(), pricing))
        .collect()
}

/// Round a USD amount to 4 decimal places
#[must_use]
pub fn round_cost(cost: f64) -> f64 {
    (cost * 10_000.0).round() / 10_000.0
}
