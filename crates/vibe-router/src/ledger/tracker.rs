//! Usage Ledger
//!
//! In-memory log of model calls with per-agent and per-provider rollups.

use super::pricing::{default_pricing, ModelPricing};
use super::record::{AgentUsageStats, TokenStats, UsageEntry, UsageOutcome};
use super::report::{default_daily_request_limits, DailyUsageReport, QuotaAlert};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use vibe_quota::window::MINUTE_WINDOW_MS;
use vibe_quota::{Clock, Provider, QuotaTable, SystemClock};

/// Maximum entries to keep in memory by default
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Token usage ledger
pub struct UsageLedger {
    /// Pricing information
    pricing: RwLock<HashMap<String, ModelPricing>>,
    /// Recorded calls, oldest first
    entries: RwLock<Vec<UsageEntry>>,
    /// Maximum entries to keep in memory
    max_entries: usize,
    /// Limits used for alerting
    table: QuotaTable,
    /// Per-day request caps; providers without one get no such alert
    daily_request_limits: HashMap<Provider, u64>,
    clock: Arc<dyn Clock>,
}

impl Default for UsageLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageLedger {
    /// Create a ledger with default pricing and the built-in quota table
    #[must_use]
    pub fn new() -> Self {
        Self {
            pricing: RwLock::new(default_pricing()),
            entries: RwLock::new(Vec::new()),
            max_entries: DEFAULT_MAX_ENTRIES,
            table: QuotaTable::default(),
            daily_request_limits: default_daily_request_limits(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Create with custom max entries
    #[must_use]
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    /// Alert against a custom quota table
    #[must_use]
    pub fn with_table(mut self, table: QuotaTable) -> Self {
        self.table = table;
        self
    }

    /// Set or replace the per-day request cap for `provider`
    #[must_use]
    pub fn with_daily_request_limit(mut self, provider: Provider, limit: u64) -> Self {
        self.daily_request_limits.insert(provider, limit);
        self
    }

    /// Use a custom time source
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Update pricing for a model
    pub async fn update_pricing(&self, pricing: ModelPricing) {
        let mut prices = self.pricing.write().await;
        prices.insert(pricing.model.clone(), pricing);
    }

    /// Get pricing for a model
    pub async fn get_pricing(&self, model: &str) -> Option<ModelPricing> {
        let prices = self.pricing.read().await;
        prices.get(model).cloned()
    }

    /// Estimate cost for a call; unknown models are free
    pub async fn estimate_cost(&self, model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
        let prices = self.pricing.read().await;
        prices
            .get(model)
            .map(|p| p.calculate_cost(input_tokens, output_tokens))
            .unwrap_or(0.0)
    }

    /// Record one model call
    pub async fn record_usage(
        &self,
        agent: &str,
        provider: Provider,
        model: &str,
        outcome: UsageOutcome,
    ) -> UsageEntry {
        let entry = UsageEntry {
            timestamp: self.clock.now(),
            agent: agent.to_string(),
            provider,
            model: model.to_string(),
            input_tokens: outcome.input_tokens,
            output_tokens: outcome.output_tokens,
            duration_ms: outcome.duration_ms,
            success: outcome.error_type.is_none(),
            error_type: outcome.error_type,
        };

        let mut entries = self.entries.write().await;
        entries.push(entry.clone());

        // Trim old entries if needed
        if entries.len() > self.max_entries {
            let drain_count = entries.len() - self.max_entries;
            entries.drain(0..drain_count);
        }

        debug!(
            agent,
            provider = %provider,
            model,
            input_tokens = entry.input_tokens,
            output_tokens = entry.output_tokens,
            success = entry.success,
            "Recorded token usage"
        );
        entry
    }

    /// Number of entries held
    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Most recent `limit` entries, oldest first
    pub async fn recent_entries(&self, limit: usize) -> Vec<UsageEntry> {
        let entries = self.entries.read().await;
        let start = entries.len().saturating_sub(limit);
        entries[start..].to_vec()
    }

    /// Drop every entry
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        let cleared = entries.len();
        entries.clear();
        info!(cleared, "Usage ledger cleared");
    }

    /// Calls to `provider` in the 60 seconds before now
    pub async fn requests_in_last_minute(&self, provider: Provider) -> u64 {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        count_recent(&entries, provider, now)
    }

    /// Lifetime usage of `agent` across the retained entries
    pub async fn agent_stats(&self, agent: &str) -> AgentUsageStats {
        let entries = self.entries.read().await;
        let prices = self.pricing.read().await;
        let matching: Vec<&UsageEntry> = entries.iter().filter(|e| e.agent == agent).collect();
        agent_stats(agent, &matching, &prices)
    }

    /// Report for the current UTC day
    pub async fn today_report(&self) -> DailyUsageReport {
        self.daily_report(self.clock.now().date_naive()).await
    }

    /// Report for one UTC day.
    ///
    /// Alerts cover requests and tokens for that day, plus requests in the
    /// last minute when `date` is today.
    pub async fn daily_report(&self, date: NaiveDate) -> DailyUsageReport {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        let prices = self.pricing.read().await;

        let day: Vec<&UsageEntry> = entries
            .iter()
            .filter(|e| e.timestamp.date_naive() == date)
            .collect();

        let mut agents: BTreeMap<&str, Vec<&UsageEntry>> = BTreeMap::new();
        for entry in day.iter().copied() {
            agents.entry(entry.agent.as_str()).or_default().push(entry);
        }
        let by_agent = agents
            .into_iter()
            .map(|(agent, group)| (agent.to_string(), agent_stats(agent, &group, &prices)))
            .collect();

        let mut by_provider = BTreeMap::new();
        let mut alerts = Vec::new();
        for provider in Provider::ALL {
            let stats = TokenStats::from_entries(
                day.iter().copied().filter(|e| e.provider == provider),
                &prices,
            );
            let quota = self.table.get(provider);

            if let Some(&limit) = self.daily_request_limits.get(&provider) {
                alerts.extend(QuotaAlert::daily_requests(provider, stats.request_count, limit));
            }
            alerts.extend(QuotaAlert::daily_tokens(
                provider,
                stats.total_tokens,
                quota.daily_token_limit,
            ));
            if date == now.date_naive() {
                alerts.extend(QuotaAlert::minute_requests(
                    provider,
                    count_recent(&entries, provider, now),
                    quota.requests_per_minute,
                ));
            }

            by_provider.insert(provider, stats);
        }

        DailyUsageReport {
            date: date.format("%Y-%m-%d").to_string(),
            total: TokenStats::from_entries(day.iter().copied(), &prices),
            by_agent,
            by_provider,
            alerts,
        }
    }
}

fn count_recent(entries: &[UsageEntry], provider: Provider, now: DateTime<Utc>) -> u64 {
    let cutoff = now - chrono::Duration::milliseconds(MINUTE_WINDOW_MS as i64);
    entries
        .iter()
        .filter(|e| e.provider == provider && e.timestamp > cutoff && e.timestamp <= now)
        .count() as u64
}

fn agent_stats(
    agent: &str,
    entries: &[&UsageEntry],
    prices: &HashMap<String, ModelPricing>,
) -> AgentUsageStats {
    let mut providers = Vec::new();
    for entry in entries {
        if !providers.contains(&entry.provider) {
            providers.push(entry.provider);
        }
    }
    AgentUsageStats {
        agent: agent.to_string(),
        providers,
        stats: TokenStats::from_entries(entries.iter().copied(), prices),
    }
}

impl std::fmt::Debug for UsageLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageLedger")
            .field("max_entries", &self.max_entries)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
