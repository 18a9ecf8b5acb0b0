//! Daily Reports and Quota Alerts

use super::record::{AgentUsageStats, TokenStats};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use vibe_quota::Provider;

// ============================================================================
// Alert Thresholds
// ============================================================================

/// Share of the daily token limit that raises a warning
pub const DAILY_TOKEN_ALERT_RATIO: f64 = 0.9;

/// Share of the per-minute request limit that raises a warning
pub const MINUTE_REQUEST_ALERT_RATIO: f64 = 0.8;

/// Share of the per-day request limit that raises a warning
pub const DAILY_REQUEST_ALERT_RATIO: f64 = 0.9;

// ============================================================================
// Requests Per Day
// ============================================================================

/// Groq free tier requests per day
pub const GROQ_REQUESTS_PER_DAY: u64 = 14_400;

/// Mistral experiment tier requests per day
pub const MISTRAL_REQUESTS_PER_DAY: u64 = 10_000;

/// Providers with a published per-day request cap
#[must_use]
pub fn default_daily_request_limits() -> HashMap<Provider, u64> {
    HashMap::from([
        (Provider::Groq, GROQ_REQUESTS_PER_DAY),
        (Provider::Mistral, MISTRAL_REQUESTS_PER_DAY),
    ])
}

/// Which limit an alert is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Requests per day
    DailyRequests,
    /// Tokens per day
    DailyTokens,
    /// Requests per minute
    MinuteRequests,
}

/// How close the limit is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Past the alert ratio
    Warning,
    /// At or past the limit
    Critical,
}

/// A provider nearing one of its limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaAlert {
    /// Provider
    pub provider: Provider,
    /// Limit concerned
    pub kind: AlertKind,
    /// Severity
    pub severity: AlertSeverity,
    /// Human-readable summary
    pub message: String,
    /// Observed usage
    pub current_usage: u64,
    /// Configured limit
    pub limit: u64,
}

impl QuotaAlert {
    /// Alert when `used` requests today reach the daily alert ratio of
    /// `limit`
    #[must_use]
    pub fn daily_requests(provider: Provider, used: u64, limit: u64) -> Option<Self> {
        if limit == 0 || (used as f64) < limit as f64 * DAILY_REQUEST_ALERT_RATIO {
            return None;
        }
        Some(Self {
            provider,
            kind: AlertKind::DailyRequests,
            severity: severity(used, limit),
            message: format!(
                "{} requests today at {:.1}%",
                provider,
                used as f64 / limit as f64 * 100.0
            ),
            current_usage: used,
            limit,
        })
    }

    /// Alert when `used` tokens today reach the daily alert ratio of `limit`
    #[must_use]
    pub fn daily_tokens(provider: Provider, used: u64, limit: u64) -> Option<Self> {
        if limit == 0 || (used as f64) < limit as f64 * DAILY_TOKEN_ALERT_RATIO {
            return None;
        }
        Some(Self {
            provider,
            kind: AlertKind::DailyTokens,
            severity: severity(used, limit),
            message: format!(
                "{} daily tokens at {:.1}%",
                provider,
                used as f64 / limit as f64 * 100.0
            ),
            current_usage: used,
            limit,
        })
    }

    /// Alert when `used` requests this minute reach the minute alert ratio
    /// of `limit`
    #[must_use]
    pub fn minute_requests(provider: Provider, used: u64, limit: u64) -> Option<Self> {
        if limit == 0 || (used as f64) < limit as f64 * MINUTE_REQUEST_ALERT_RATIO {
            return None;
        }
        Some(Self {
            provider,
            kind: AlertKind::MinuteRequests,
            severity: severity(used, limit),
            message: format!("{} requests this minute at {}/{}", provider, used, limit),
            current_usage: used,
            limit,
        })
    }
}

fn severity(used: u64, limit: u64) -> AlertSeverity {
    if used >= limit {
        AlertSeverity::Critical
    } else {
        AlertSeverity::Warning
    }
}

/// Usage for one UTC day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyUsageReport {
    /// Day (`YYYY-MM-DD`)
    pub date: String,
    /// All calls that day
    pub total: TokenStats,
    /// Per agent
    pub by_agent: BTreeMap<String, AgentUsageStats>,
    /// Per provider
    pub by_provider: BTreeMap<Provider, TokenStats>,
    /// Limits being approached
    pub alerts: Vec<QuotaAlert>,
}

/// Format report as text
#[must_use]
pub fn format_report(report: &DailyUsageReport) -> String {
    let mut output = String::new();

    output.push_str("📊 **Token Usage Report**\n\n");
    output.push_str(&format!("Date: {}\n", report.date));

    let total = &report.total;
    output.push_str("\n**Summary:**\n");
    output.push_str(&format!(
        "• Total Requests: {} ({:.1}% success)\n",
        total.request_count,
        total.success_rate()
    ));
    output.push_str(&format!(
        "• Total Tokens: {} ({} input, {} output)\n",
        total.total_tokens, total.total_input_tokens, total.total_output_tokens
    ));
    output.push_str(&format!(
        "• Estimated Cost: ${:.4}\n",
        total.estimated_cost_usd
    ));
    output.push_str(&format!("• Avg Duration: {}ms\n", total.avg_duration_ms));

    output.push_str("\n**By Provider:**\n");
    for (provider, stats) in &report.by_provider {
        output.push_str(&format!(
            "• {}: {} requests, {} tokens, ${:.4}\n",
            provider, stats.request_count, stats.total_tokens, stats.estimated_cost_usd
        ));
    }

    output.push_str("\n**By Agent:**\n");
    for (agent, usage) in &report.by_agent {
        output.push_str(&format!(
            "• {}: {} requests, {} tokens\n",
            agent, usage.stats.request_count, usage.stats.total_tokens
        ));
    }

    if !report.alerts.is_empty() {
        output.push_str("\n**Alerts:**\n");
        for alert in &report.alerts {
            let icon = match alert.severity {
                AlertSeverity::Critical => "🔴",
                AlertSeverity::Warning => "🟡",
            };
            let label = match alert.severity {
                AlertSeverity::Critical => "CRITICAL",
                AlertSeverity::Warning => "WARNING",
            };
            output.push_str(&format!("• {} [{}] {}\n", icon, label, alert.message));
        }
    }

    output
}
