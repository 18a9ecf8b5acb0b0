//! Error types for vibe-router

use thiserror::Error;
use vibe_quota::Provider;

/// Router error type
#[derive(Debug, Error)]
pub enum Error {
    /// Quota tracking failed
    #[error(transparent)]
    Quota(#[from] vibe_quota::Error),

    /// No configured, enabled, non-excluded provider remains
    #[error("no LLM provider available (excluded: {excluded:?})")]
    NoProviderAvailable {
        /// Providers the caller asked to skip
        excluded: Vec<Provider>,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
