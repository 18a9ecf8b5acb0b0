//! Quota Tracker
//!
//! Records per-provider token and request usage in a [`UsageStore`] and
//! answers how close each provider is to its limits.
//!
//! ## Storage layout
//!
//! Three integer counters per provider, each incremented atomically:
//!
//! - `{prefix}:{provider}:daily:{YYYY-MM-DD}:tokens`
//! - `{prefix}:{provider}:minute:{epoch_minute}:requests`
//! - `{prefix}:{provider}:minute:{epoch_minute}:tokens`
//!
//! The three increments are not a transaction. Concurrent writers can
//! observe a request counted before its tokens; rate shaping tolerates that.

use crate::error::Result;
use crate::limits::QuotaTable;
use crate::provider::Provider;
use crate::selector::{ProviderSelection, ProviderSelectionStrategy};
use crate::settings::{build_store, QuotaSettings};
use crate::store::{read_counter, MemoryStore, UsageStore};
use crate::usage::{ProviderUsage, QuotaStatus};
use crate::window::{daily_window_key, minute_window_key, Clock, SystemClock};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

#[cfg(test)]
mod tests;

/// Default namespace for usage keys
pub const DEFAULT_KEY_PREFIX: &str = "vibe:quota";

/// Default lifetime of daily counters (two days, so the previous day is
/// still readable around midnight)
pub const DEFAULT_DAILY_TTL: Duration = Duration::from_secs(2 * 24 * 3600);

/// Default lifetime of per-minute counters
pub const DEFAULT_MINUTE_TTL: Duration = Duration::from_secs(120);

/// Counter keys for one provider at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
struct UsageKeys {
    date: String,
    daily_tokens: String,
    minute_requests: String,
    minute_tokens: String,
}

impl UsageKeys {
    fn all(&self) -> Vec<String> {
        vec![
            self.daily_tokens.clone(),
            self.minute_requests.clone(),
            self.minute_tokens.clone(),
        ]
    }
}

/// Tracks provider usage and derives quota status.
pub struct QuotaTracker {
    store: Arc<dyn UsageStore>,
    table: QuotaTable,
    clock: Arc<dyn Clock>,
    prefix: String,
    daily_ttl: Duration,
    minute_ttl: Duration,
}

impl QuotaTracker {
    /// Create a tracker over `store` with the built-in quota table
    #[must_use]
    pub fn new(store: Arc<dyn UsageStore>) -> Self {
        Self {
            store,
            table: QuotaTable::default(),
            clock: Arc::new(SystemClock),
            prefix: DEFAULT_KEY_PREFIX.to_string(),
            daily_ttl: DEFAULT_DAILY_TTL,
            minute_ttl: DEFAULT_MINUTE_TTL,
        }
    }

    /// Create a tracker backed by a fresh process-local store
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Build a tracker from loaded settings
    ///
    /// # Errors
    ///
    /// Returns error if the configured store cannot be constructed
    pub fn from_settings(settings: &QuotaSettings) -> Result<Self> {
        let store = build_store(&settings.store)?;
        Ok(Self::new(store)
            .with_table(settings.quota_table())
            .with_key_prefix(settings.store.key_prefix.clone())
            .with_ttls(
                Duration::from_secs(settings.store.daily_ttl_secs),
                Duration::from_secs(settings.store.minute_ttl_secs),
            ))
    }

    /// Use a custom quota table
    #[must_use]
    pub fn with_table(mut self, table: QuotaTable) -> Self {
        self.table = table;
        self
    }

    /// Use a custom time source
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Namespace keys under `prefix`
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Override counter lifetimes
    #[must_use]
    pub fn with_ttls(mut self, daily: Duration, minute: Duration) -> Self {
        self.daily_ttl = daily;
        self.minute_ttl = minute;
        self
    }

    /// Quota table in use
    #[must_use]
    pub fn table(&self) -> &QuotaTable {
        &self.table
    }

    /// Backend currently serving the counters
    #[must_use]
    pub fn store_backend(&self) -> &'static str {
        self.store.backend()
    }

    fn keys(&self, provider: Provider, now: DateTime<Utc>) -> UsageKeys {
        let date = daily_window_key(now);
        let minute = minute_window_key(now);
        UsageKeys {
            daily_tokens: format!("{}:{}:daily:{}:tokens", self.prefix, provider, date),
            minute_requests: format!("{}:{}:minute:{}:requests", self.prefix, provider, minute),
            minute_tokens: format!("{}:{}:minute:{}:tokens", self.prefix, provider, minute),
            date,
        }
    }

    async fn usage_at(&self, provider: Provider, now: DateTime<Utc>) -> Result<ProviderUsage> {
        let keys = self.keys(provider, now);
        let store = self.store.as_ref();
        Ok(ProviderUsage {
            provider,
            daily_tokens: read_counter(store, &keys.daily_tokens).await?,
            minute_requests: read_counter(store, &keys.minute_requests).await?,
            minute_tokens: read_counter(store, &keys.minute_tokens).await?,
            date: keys.date,
        })
    }

    async fn status_at(&self, provider: Provider, now: DateTime<Utc>) -> Result<QuotaStatus> {
        let usage = self.usage_at(provider, now).await?;
        Ok(QuotaStatus::evaluate(usage, &self.table.get(provider), now))
    }

    /// Current usage for `provider`.
    ///
    /// A provider with nothing recorded in the current windows reads as a
    /// zeroed snapshot dated today; nothing is written.
    pub async fn get_provider_usage(&self, provider: Provider) -> Result<ProviderUsage> {
        self.usage_at(provider, self.clock.now()).await
    }

    /// Attribute one request consuming `tokens` to `provider`.
    #[instrument(skip(self))]
    pub async fn record_provider_usage(&self, provider: Provider, tokens: u64) -> Result<()> {
        let keys = self.keys(provider, self.clock.now());
        let amount = i64::try_from(tokens).unwrap_or(i64::MAX);

        let daily_tokens = self
            .store
            .incr_by(&keys.daily_tokens, amount, Some(self.daily_ttl))
            .await?;
        let minute_requests = self
            .store
            .incr_by(&keys.minute_requests, 1, Some(self.minute_ttl))
            .await?;
        let minute_tokens = self
            .store
            .incr_by(&keys.minute_tokens, amount, Some(self.minute_ttl))
            .await?;

        debug!(
            tokens,
            daily_tokens, minute_requests, minute_tokens, "Recorded provider usage"
        );
        Ok(())
    }

    /// Usage rates and pre-emptive fallback flag for `provider`.
    pub async fn get_quota_status(&self, provider: Provider) -> Result<QuotaStatus> {
        self.status_at(provider, self.clock.now()).await
    }

    /// Clear the current day and minute counters for `provider`.
    pub async fn reset_provider_usage(&self, provider: Provider) -> Result<()> {
        let keys = self.keys(provider, self.clock.now());
        let deleted = self.store.delete(&keys.all()).await?;
        info!(provider = %provider, deleted, "Provider usage reset");
        Ok(())
    }

    /// Status of every known provider, in table order.
    pub async fn quota_summary(&self) -> Result<Vec<QuotaStatus>> {
        let now = self.clock.now();
        let mut summary = Vec::with_capacity(Provider::ALL.len());
        for provider in Provider::ALL {
            summary.push(self.status_at(provider, now).await?);
        }
        Ok(summary)
    }

    /// First candidate, in declared order, that is not near its limits.
    ///
    /// Providers are checked one at a time and the walk stops at the first
    /// fit. `None` means every candidate is flagged (or the list is empty);
    /// that is an ordinary outcome, not an error.
    #[instrument(skip(self))]
    pub async fn select_available_provider(
        &self,
        candidates: &[Provider],
    ) -> Result<Option<ProviderSelection>> {
        let now = self.clock.now();
        for (idx, &provider) in candidates.iter().enumerate() {
            let status = self.status_at(provider, now).await?;
            if !status.should_preemptive_fallback {
                let selection = ProviderSelection {
                    provider,
                    is_preemptive_fallback: idx > 0,
                };
                if selection.is_preemptive_fallback {
                    info!(
                        provider = %provider,
                        skipped = ?&candidates[..idx],
                        "Pre-emptive fallback"
                    );
                }
                return Ok(Some(selection));
            }
            debug!(
                provider = %provider,
                triggers = ?status.triggers(),
                "Skipping provider near quota"
            );
        }

        warn!(?candidates, "All candidate providers are near their quota");
        Ok(None)
    }

    /// Select with a custom strategy over every candidate's status.
    pub async fn select_with<S>(
        &self,
        strategy: &S,
        candidates: &[Provider],
    ) -> Result<Option<ProviderSelection>>
    where
        S: ProviderSelectionStrategy + ?Sized,
    {
        let now = self.clock.now();
        let mut statuses = Vec::with_capacity(candidates.len());
        for &provider in candidates {
            statuses.push(self.status_at(provider, now).await?);
        }
        Ok(strategy.select(&statuses))
    }
}

impl std::fmt::Debug for QuotaTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaTracker")
            .field("store", &self.store.backend())
            .field("prefix", &self.prefix)
            .field("daily_ttl", &self.daily_ttl)
            .field("minute_ttl", &self.minute_ttl)
            .finish_non_exhaustive()
    }
}
