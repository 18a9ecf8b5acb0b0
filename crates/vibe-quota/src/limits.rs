//! Provider Quota Table
//!
//! Static per-provider ceilings and the pre-emptive fallback thresholds.
//! A provider is switched away from once any usage rate is strictly above
//! its threshold, before the upstream starts rejecting requests.

use crate::provider::Provider;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Thresholds
// ============================================================================

/// Daily token usage rate above which a provider is skipped.
pub const DAILY_TOKEN_THRESHOLD: f64 = 0.8;

/// Per-minute request usage rate above which a provider is skipped.
pub const MINUTE_REQUEST_THRESHOLD: f64 = 0.85;

/// Per-minute token usage rate above which a provider is skipped.
pub const MINUTE_TOKEN_THRESHOLD: f64 = 0.85;

// ============================================================================
// Free-tier limits
// ============================================================================

/// Cerebras free tier
pub const CEREBRAS_QUOTA: ProviderQuota = ProviderQuota {
    daily_token_limit: 24_000_000,
    requests_per_minute: 30,
    tokens_per_minute: 60_000,
};

/// Groq free tier (llama-3.3-70b-versatile)
pub const GROQ_QUOTA: ProviderQuota = ProviderQuota {
    daily_token_limit: 100_000,
    requests_per_minute: 30,
    tokens_per_minute: 12_000,
};

/// Mistral experiment tier
pub const MISTRAL_QUOTA: ProviderQuota = ProviderQuota {
    daily_token_limit: 1_000_000,
    requests_per_minute: 60,
    tokens_per_minute: 500_000,
};

/// OpenRouter free models
pub const OPENROUTER_QUOTA: ProviderQuota = ProviderQuota {
    daily_token_limit: 10_000_000,
    requests_per_minute: 20,
    tokens_per_minute: 200_000,
};

/// Configured ceilings for one provider.
///
/// A ceiling of 0 means unlimited: the matching rate reads as 0.0 and
/// never trips pre-emptive fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderQuota {
    /// Tokens allowed per UTC day
    pub daily_token_limit: u64,
    /// Requests allowed per minute
    pub requests_per_minute: u64,
    /// Tokens allowed per minute
    pub tokens_per_minute: u64,
}

impl ProviderQuota {
    /// Built-in quota for a provider.
    #[must_use]
    pub const fn for_provider(provider: Provider) -> Self {
        match provider {
            Provider::Cerebras => CEREBRAS_QUOTA,
            Provider::Groq => GROQ_QUOTA,
            Provider::Mistral => MISTRAL_QUOTA,
            Provider::OpenRouter => OPENROUTER_QUOTA,
        }
    }
}

/// Lookup table of provider quotas.
///
/// Defaults to the built-in free-tier limits; individual entries can be
/// replaced when a deployment runs on a paid tier.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotaTable {
    quotas: HashMap<Provider, ProviderQuota>,
}

impl Default for QuotaTable {
    fn default() -> Self {
        Self {
            quotas: Provider::ALL
                .into_iter()
                .map(|p| (p, ProviderQuota::for_provider(p)))
                .collect(),
        }
    }
}

impl QuotaTable {
    /// Quota for `provider`.
    #[must_use]
    pub fn get(&self, provider: Provider) -> ProviderQuota {
        self.quotas
            .get(&provider)
            .copied()
            .unwrap_or_else(|| ProviderQuota::for_provider(provider))
    }

    /// Replace one provider's quota.
    pub fn set(&mut self, provider: Provider, quota: ProviderQuota) {
        self.quotas.insert(provider, quota);
    }

    /// Builder form of [`QuotaTable::set`].
    #[must_use]
    pub fn with_override(mut self, provider: Provider, quota: ProviderQuota) -> Self {
        self.set(provider, quota);
        self
    }
}
