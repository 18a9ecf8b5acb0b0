//! Token Usage Ledger - per-call usage and cost reporting
//!
//! Records every model call with its agent, provider, model, and token
//! counts, then rolls them up into daily reports with cost estimates and
//! quota alerts.
//!
//! # Module Structure
//!
//! - `pricing`: Model pricing information and defaults
//! - `record`: Usage entries and statistics types
//! - `tracker`: UsageLedger implementation
//! - `report`: Daily reports, quota alerts, and text formatting

mod pricing;
mod record;
mod report;
mod tracker;


// Re-export public types
pub use pricing::{default_pricing, round_cost, ModelPricing};
pub use record::{AgentUsageStats, TokenStats, UsageEntry, UsageOutcome};
pub use report::{
    default_daily_request_limits, format_report, AlertKind, AlertSeverity, DailyUsageReport,
    QuotaAlert, DAILY_REQUEST_ALERT_RATIO, DAILY_TOKEN_ALERT_RATIO, GROQ_REQUESTS_PER_DAY,
    MINUTE_REQUEST_ALERT_RATIO, MISTRAL_REQUESTS_PER_DAY,
};
pub use tracker::{UsageLedger, DEFAULT_MAX_ENTRIES};
