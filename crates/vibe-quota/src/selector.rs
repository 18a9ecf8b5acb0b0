//! Provider Selector
//!
//! Picks which provider to call next from a priority-ordered candidate
//! list. The default strategy is first-fit: callers express preference by
//! ordering the list, and ties are never re-ranked.

use crate::provider::Provider;
use crate::usage::QuotaStatus;
use serde::{Deserialize, Serialize};

/// Outcome of a successful selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSelection {
    /// Chosen provider (never one flagged for pre-emptive fallback)
    pub provider: Provider,
    /// True when a higher-priority candidate was skipped for being near
    /// its quota
    pub is_preemptive_fallback: bool,
}

/// Chooses a provider from candidate statuses given in priority order.
pub trait ProviderSelectionStrategy: Send + Sync {
    /// Pick a provider, or `None` when nothing is usable
    fn select(&self, statuses: &[QuotaStatus]) -> Option<ProviderSelection>;
}

/// First candidate not flagged for pre-emptive fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstFit;

impl ProviderSelectionStrategy for FirstFit {
    fn select(&self, statuses: &[QuotaStatus]) -> Option<ProviderSelection> {
        statuses
            .iter()
            .position(|s| !s.should_preemptive_fallback)
            .map(|idx| ProviderSelection {
                provider: statuses[idx].provider,
                is_preemptive_fallback: idx > 0,
            })
    }
}
