//! Usage Entries and Statistics

use super::pricing::{round_cost, ModelPricing};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vibe_quota::Provider;

/// Result of one model call, as reported by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageOutcome {
    /// Prompt tokens
    pub input_tokens: u64,
    /// Completion tokens
    pub output_tokens: u64,
    /// Wall time of the call
    pub duration_ms: u64,
    /// Failure class; `None` means the call succeeded
    pub error_type: Option<String>,
}

impl UsageOutcome {
    /// Successful call
    #[must_use]
    pub fn success(input_tokens: u64, output_tokens: u64, duration_ms: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            duration_ms,
            error_type: None,
        }
    }

    /// Failed call
    #[must_use]
    pub fn failure(error_type: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            duration_ms,
            error_type: Some(error_type.into()),
            ..Default::default()
        }
    }

    /// Input plus output tokens
    #[must_use]
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// A single recorded model call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEntry {
    /// When the call was recorded
    pub timestamp: DateTime<Utc>,
    /// Agent that made the call (e.g. "supervisor", "nlq")
    pub agent: String,
    /// Provider that served it
    pub provider: Provider,
    /// Model id
    pub model: String,
    /// Prompt tokens
    pub input_tokens: u64,
    /// Completion tokens
    pub output_tokens: u64,
    /// Wall time of the call
    pub duration_ms: u64,
    /// Whether the call succeeded
    pub success: bool,
    /// Failure class, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl UsageEntry {
    /// Input plus output tokens
    #[must_use]
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// Aggregated usage over a set of entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStats {
    /// Total input tokens
    pub total_input_tokens: u64,
    /// Total output tokens
    pub total_output_tokens: u64,
    /// Input plus output
    pub total_tokens: u64,
    /// Number of calls
    pub request_count: u64,
    /// Successful calls
    pub success_count: u64,
    /// Failed calls
    pub failure_count: u64,
    /// Mean call duration, rounded to whole milliseconds
    pub avg_duration_ms: u64,
    /// Estimated cost (USD, 4 decimals)
    pub estimated_cost_usd: f64,
}

impl TokenStats {
    /// Aggregate `entries`, pricing each by its own model
    pub fn from_entries<'a, I>(entries: I, pricing: &HashMap<String, ModelPricing>) -> Self
    where
        I: IntoIterator<Item = &'a UsageEntry>,
    {
        let mut stats = Self::default();
        let mut total_duration: u64 = 0;
        let mut cost = 0.0;

        for entry in entries {
            stats.total_input_tokens += entry.input_tokens;
            stats.total_output_tokens += entry.output_tokens;
            stats.request_count += 1;
            if entry.success {
                stats.success_count += 1;
            } else {
                stats.failure_count += 1;
            }
            total_duration = total_duration.saturating_add(entry.duration_ms);

            if let Some(price) = pricing.get(&entry.model) {
                cost += price.calculate_cost(entry.input_tokens, entry.output_tokens);
            }
        }

        stats.total_tokens = stats.total_input_tokens + stats.total_output_tokens;
        if stats.request_count > 0 {
            stats.avg_duration_ms =
                (total_duration as f64 / stats.request_count as f64).round() as u64;
        }
        stats.estimated_cost_usd = round_cost(cost);
        stats
    }

    /// Successful share of requests in percent (0 when nothing was recorded)
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.request_count == 0 {
            0.0
        } else {
            self.success_count as f64 / self.request_count as f64 * 100.0
        }
    }
}

/// Usage of one agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentUsageStats {
    /// Agent name
    pub agent: String,
    /// Providers the agent called, in first-seen order
    pub providers: Vec<Provider>,
    /// Aggregated usage
    #[serde(flatten)]
    pub stats: TokenStats,
}
