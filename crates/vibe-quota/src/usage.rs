//! Usage snapshot and derived quota status.

use crate::limits::{
    ProviderQuota, DAILY_TOKEN_THRESHOLD, MINUTE_REQUEST_THRESHOLD, MINUTE_TOKEN_THRESHOLD,
};
use crate::provider::Provider;
use crate::window::millis_until_next_minute;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-provider usage for the current day and minute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderUsage {
    /// Provider the counters belong to
    pub provider: Provider,
    /// Day bucket (`YYYY-MM-DD`, UTC)
    pub date: String,
    /// Tokens consumed today
    pub daily_tokens: u64,
    /// Requests in the current minute
    pub minute_requests: u64,
    /// Tokens consumed in the current minute
    pub minute_tokens: u64,
}

impl ProviderUsage {
    /// Zeroed snapshot for `provider` on `date`.
    #[must_use]
    pub fn empty(provider: Provider, date: impl Into<String>) -> Self {
        Self {
            provider,
            date: date.into(),
            daily_tokens: 0,
            minute_requests: 0,
            minute_tokens: 0,
        }
    }
}

/// Which threshold pushed a provider into pre-emptive fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaTrigger {
    /// Daily token rate above [`DAILY_TOKEN_THRESHOLD`]
    DailyTokens,
    /// Minute request rate above [`MINUTE_REQUEST_THRESHOLD`]
    MinuteRequests,
    /// Minute token rate above [`MINUTE_TOKEN_THRESHOLD`]
    MinuteTokens,
}

/// Usage rates for one provider, computed on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaStatus {
    /// Provider
    pub provider: Provider,
    /// Snapshot the rates were computed from
    pub usage: ProviderUsage,
    /// daily_tokens / daily_token_limit
    pub daily_token_usage_rate: f64,
    /// minute_requests / requests_per_minute
    pub minute_request_usage_rate: f64,
    /// minute_tokens / tokens_per_minute
    pub minute_token_usage_rate: f64,
    /// True when any rate is above its threshold
    pub should_preemptive_fallback: bool,
    /// Back-off hint, set only when the minute request rate tripped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_wait_ms: Option<u64>,
}

impl QuotaStatus {
    /// Compute rates for `usage` against `quota` at time `now`.
    #[must_use]
    pub fn evaluate(usage: ProviderUsage, quota: &ProviderQuota, now: DateTime<Utc>) -> Self {
        let daily_token_usage_rate = usage_rate(usage.daily_tokens, quota.daily_token_limit);
        let minute_request_usage_rate =
            usage_rate(usage.minute_requests, quota.requests_per_minute);
        let minute_token_usage_rate = usage_rate(usage.minute_tokens, quota.tokens_per_minute);

        let minute_requests_tripped = minute_request_usage_rate > MINUTE_REQUEST_THRESHOLD;
        let should_preemptive_fallback = daily_token_usage_rate > DAILY_TOKEN_THRESHOLD
            || minute_requests_tripped
            || minute_token_usage_rate > MINUTE_TOKEN_THRESHOLD;

        Self {
            provider: usage.provider,
            usage,
            daily_token_usage_rate,
            minute_request_usage_rate,
            minute_token_usage_rate,
            should_preemptive_fallback,
            recommended_wait_ms: minute_requests_tripped.then(|| millis_until_next_minute(now)),
        }
    }

    /// Thresholds currently exceeded, in check order.
    #[must_use]
    pub fn triggers(&self) -> Vec<QuotaTrigger> {
        let mut triggers = Vec::new();
        if self.daily_token_usage_rate > DAILY_TOKEN_THRESHOLD {
            triggers.push(QuotaTrigger::DailyTokens);
        }
        if self.minute_request_usage_rate > MINUTE_REQUEST_THRESHOLD {
            triggers.push(QuotaTrigger::MinuteRequests);
        }
        if self.minute_token_usage_rate > MINUTE_TOKEN_THRESHOLD {
            triggers.push(QuotaTrigger::MinuteTokens);
        }
        triggers
    }
}

/// `used / limit`, or 0.0 when the limit is 0 (unlimited).
fn usage_rate(used: u64, limit: u64) -> f64 {
    if limit == 0 {
        0.0
    } else {
        used as f64 / limit as f64
    }
}
