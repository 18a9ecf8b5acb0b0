//! Provider Availability
//!
//! A provider can serve traffic when it is configured (an API key is
//! present) and its runtime toggle is on. Toggles exist so operators and
//! tests can take a provider out of rotation without touching credentials.

use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;
use tracing::info;
use vibe_quota::Provider;

/// Environment variable holding the API key for `provider`.
#[must_use]
pub const fn api_key_var(provider: Provider) -> &'static str {
    match provider {
        Provider::Cerebras => "CEREBRAS_API_KEY",
        Provider::Groq => "GROQ_API_KEY",
        Provider::Mistral => "MISTRAL_API_KEY",
        Provider::OpenRouter => "OPENROUTER_API_KEY",
    }
}

/// Configured providers plus their runtime on/off switches.
#[derive(Debug)]
pub struct ProviderAvailability {
    configured: HashSet<Provider>,
    disabled: RwLock<HashSet<Provider>>,
}

impl ProviderAvailability {
    /// Treat exactly `configured` as having credentials. All toggles start on.
    #[must_use]
    pub fn new(configured: impl IntoIterator<Item = Provider>) -> Self {
        Self {
            configured: configured.into_iter().collect(),
            disabled: RwLock::new(HashSet::new()),
        }
    }

    /// Every provider configured
    #[must_use]
    pub fn all_configured() -> Self {
        Self::new(Provider::ALL)
    }

    /// Detect configured providers from `*_API_KEY` environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Detect configured providers through `lookup`; blank values count as
    /// missing
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::new(Provider::ALL.into_iter().filter(|&p| {
            lookup(api_key_var(p)).is_some_and(|key| !key.trim().is_empty())
        }))
    }

    /// Turn a provider on or off at runtime
    pub fn toggle(&self, provider: Provider, enabled: bool) {
        let mut disabled = self.disabled.write().unwrap_or_else(|e| e.into_inner());
        let changed = if enabled {
            disabled.remove(&provider)
        } else {
            disabled.insert(provider)
        };
        if changed {
            info!(provider = %provider, enabled, "Provider toggled");
        }
    }

    /// Whether credentials exist for `provider`
    #[must_use]
    pub fn is_configured(&self, provider: Provider) -> bool {
        self.configured.contains(&provider)
    }

    /// Whether the runtime toggle for `provider` is on
    #[must_use]
    pub fn is_enabled(&self, provider: Provider) -> bool {
        !self
            .disabled
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&provider)
    }

    /// Configured and enabled
    #[must_use]
    pub fn is_available(&self, provider: Provider) -> bool {
        self.is_configured(provider) && self.is_enabled(provider)
    }

    /// Availability of every provider
    #[must_use]
    pub fn status(&self) -> BTreeMap<Provider, bool> {
        Provider::ALL
            .into_iter()
            .map(|p| (p, self.is_available(p)))
            .collect()
    }

    /// Toggle state of every provider, regardless of credentials
    #[must_use]
    pub fn toggle_state(&self) -> BTreeMap<Provider, bool> {
        Provider::ALL
            .into_iter()
            .map(|p| (p, self.is_enabled(p)))
            .collect()
    }

    /// Available providers from `candidates`, order preserved
    #[must_use]
    pub fn filter(&self, candidates: &[Provider]) -> Vec<Provider> {
        candidates
            .iter()
            .copied()
            .filter(|&p| self.is_available(p))
            .collect()
    }
}

impl Default for ProviderAvailability {
    fn default() -> Self {
        Self::all_configured()
    }
}
