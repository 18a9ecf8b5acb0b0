//! Supervisor Model Selection
//!
//! Chooses the provider and model for the supervisor agent. Preference order
//! is filtered by availability and caller exclusions, then handed to the
//! quota tracker so a provider close to its limits is skipped before it
//! starts returning rate-limit errors.

use crate::availability::ProviderAvailability;
use crate::error::{Error, Result};
use crate::ledger::{UsageLedger, UsageOutcome};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use vibe_quota::{Provider, QuotaStatus, QuotaTracker};


/// Default supervisor preference: Cerebras, then Mistral, then Groq
pub const DEFAULT_PREFERRED_ORDER: [Provider; 3] =
    [Provider::Cerebras, Provider::Mistral, Provider::Groq];

/// Default model id served by `provider`
#[must_use]
pub const fn default_model(provider: Provider) -> &'static str {
    match provider {
        Provider::Cerebras => "llama-3.3-70b",
        Provider::Mistral => "mistral-small-2506",
        Provider::Groq => "llama-3.3-70b-versatile",
        Provider::OpenRouter => "meta-llama/llama-3.3-70b-instruct:free",
    }
}

/// Provider and model picked for a call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelChoice {
    /// Provider to call
    pub provider: Provider,
    /// Model id at that provider
    pub model_id: String,
    /// True when a preferred provider was skipped for being near its quota
    pub is_preemptive_fallback: bool,
}

/// Quota-aware model selection for the supervisor agent
pub struct SupervisorRouter {
    tracker: Arc<QuotaTracker>,
    availability: Arc<ProviderAvailability>,
    preferred: Vec<Provider>,
    models: HashMap<Provider, String>,
    ledger: Option<Arc<UsageLedger>>,
}

impl SupervisorRouter {
    /// Create a router with the default preference order and models
    #[must_use]
    pub fn new(tracker: Arc<QuotaTracker>, availability: Arc<ProviderAvailability>) -> Self {
        Self {
            tracker,
            availability,
            preferred: DEFAULT_PREFERRED_ORDER.to_vec(),
            models: Provider::ALL
                .into_iter()
                .map(|p| (p, default_model(p).to_string()))
                .collect(),
            ledger: None,
        }
    }

    /// Replace the preference order
    #[must_use]
    pub fn with_preferred_order(mut self, order: Vec<Provider>) -> Self {
        self.preferred = order;
        self
    }

    /// Serve `model_id` for `provider`
    #[must_use]
    pub fn with_model(mut self, provider: Provider, model_id: impl Into<String>) -> Self {
        self.models.insert(provider, model_id.into());
        self
    }

    /// Also log completed calls to `ledger`
    #[must_use]
    pub fn with_ledger(mut self, ledger: Arc<UsageLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Quota tracker
    #[must_use]
    pub fn tracker(&self) -> &Arc<QuotaTracker> {
        &self.tracker
    }

    /// Provider availability
    #[must_use]
    pub fn availability(&self) -> &Arc<ProviderAvailability> {
        &self.availability
    }

    /// Usage ledger, if attached
    #[must_use]
    pub fn ledger(&self) -> Option<&Arc<UsageLedger>> {
        self.ledger.as_ref()
    }

    /// Model id used for `provider`
    #[must_use]
    pub fn model_for(&self, provider: Provider) -> &str {
        self.models
            .get(&provider)
            .map(String::as_str)
            .unwrap_or_else(|| default_model(provider))
    }

    fn choice(&self, provider: Provider, is_preemptive_fallback: bool) -> ModelChoice {
        ModelChoice {
            provider,
            model_id: self.model_for(provider).to_string(),
            is_preemptive_fallback,
        }
    }

    /// Pick the supervisor model, skipping `exclude` (e.g. providers that
    /// just failed on a retry).
    ///
    /// When every candidate is near its quota the first candidate is used
    /// anyway, without the pre-emptive flag.
    ///
    /// # Errors
    ///
    /// Returns `NoProviderAvailable` if no configured, enabled, non-excluded
    /// provider remains, or a quota error if usage cannot be read.
    #[instrument(skip(self))]
    pub async fn select_model(&self, exclude: &[Provider]) -> Result<ModelChoice> {
        if !exclude.is_empty() {
            info!(?exclude, "Excluding providers");
        }

        let candidates: Vec<Provider> = self
            .availability
            .filter(&self.preferred)
            .into_iter()
            .filter(|p| !exclude.contains(p))
            .collect();

        let Some(&first) = candidates.first() else {
            return Err(Error::NoProviderAvailable {
                excluded: exclude.to_vec(),
            });
        };

        if let Some(selection) = self.tracker.select_available_provider(&candidates).await? {
            if selection.is_preemptive_fallback {
                warn!(provider = %selection.provider, "Pre-emptive fallback");
            }
            return Ok(self.choice(selection.provider, selection.is_preemptive_fallback));
        }

        warn!(
            provider = %first,
            "All providers at quota limit, using static fallback"
        );
        Ok(self.choice(first, false))
    }

    /// Attribute `tokens` consumed by one call to `provider`.
    ///
    /// `context` names the caller (e.g. "supervisor", "nlq") for logs.
    ///
    /// # Errors
    ///
    /// Returns error if the usage store rejects the update
    pub async fn record_model_usage(
        &self,
        provider: Provider,
        tokens: u64,
        context: &str,
    ) -> Result<()> {
        self.tracker.record_provider_usage(provider, tokens).await?;

        if provider == Provider::Groq {
            info!(context, tokens, "Groq usage recorded (low quota provider)");
        } else {
            debug!(provider = %provider, context, tokens, "Model usage recorded");
        }
        Ok(())
    }

    /// Record a finished call against both the quota tracker and the
    /// ledger (when attached).
    ///
    /// # Errors
    ///
    /// Returns error if the usage store rejects the update
    pub async fn record_completion(
        &self,
        agent: &str,
        choice: &ModelChoice,
        outcome: UsageOutcome,
    ) -> Result<()> {
        self.record_model_usage(choice.provider, outcome.total_tokens(), agent)
            .await?;

        if let Some(ledger) = &self.ledger {
            ledger
                .record_usage(agent, choice.provider, &choice.model_id, outcome)
                .await;
        }
        Ok(())
    }

    /// Quota status of every provider
    ///
    /// # Errors
    ///
    /// Returns error if usage cannot be read
    pub async fn quota_summary(&self) -> Result<Vec<QuotaStatus>> {
        Ok(self.tracker.quota_summary().await?)
    }
}

impl std::fmt::Debug for SupervisorRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupervisorRouter")
            .field("tracker", &self.tracker)
            .field("preferred", &self.preferred)
            .field("ledger", &self.ledger.is_some())
            .finish_non_exhaustive()
    }
}
