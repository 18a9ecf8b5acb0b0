//! Vibe Router - Quota-aware model selection
//!
//! This crate builds on `vibe-quota` to pick models for agents:
//! - Availability: Configured providers and runtime toggles
//! - Supervisor: Preference-ordered, quota-aware model choice with fallback
//! - Ledger: Per-call token usage, cost estimates, daily reports and alerts

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod availability;
pub mod error;
pub mod ledger;
pub mod supervisor;

pub use availability::{api_key_var, ProviderAvailability};
pub use error::{Error, Result};
pub use ledger::{
    format_report, AgentUsageStats, AlertKind, AlertSeverity, DailyUsageReport, ModelPricing,
    QuotaAlert, TokenStats, UsageEntry, UsageLedger, UsageOutcome,
};
pub use supervisor::{default_model, ModelChoice, SupervisorRouter, DEFAULT_PREFERRED_ORDER};
