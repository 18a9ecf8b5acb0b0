//! Vibe Quota - Provider quota tracking
//!
//! This crate tracks free-tier LLM provider usage and decides when to move
//! traffic away from a provider before it hits its limits:
//! - Provider: Supported providers (Cerebras, Groq, Mistral, OpenRouter)
//! - Limits: Static per-provider quotas and fallback thresholds
//! - Window: Day/minute bucketing and an injectable clock
//! - Store: Counter storage (memory, Redis, Redis with memory fallback)
//! - Tracker: Usage recording, quota status, first-fit selection
//! - Settings: Layered configuration (defaults, files, environment)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod limits;
pub mod provider;
pub mod selector;
pub mod settings;
pub mod store;
pub mod tracker;
pub mod usage;
pub mod window;

pub use error::{Error, Result};
pub use limits::{
    ProviderQuota, QuotaTable, DAILY_TOKEN_THRESHOLD, MINUTE_REQUEST_THRESHOLD,
    MINUTE_TOKEN_THRESHOLD,
};
pub use provider::Provider;
pub use selector::{FirstFit, ProviderSelection, ProviderSelectionStrategy};
pub use settings::{build_store, QuotaSettings, StoreBackend, StoreSettings};
pub use store::{FallbackStore, MemoryStore, RedisStore, UsageStore};
pub use tracker::QuotaTracker;
pub use usage::{ProviderUsage, QuotaStatus, QuotaTrigger};
pub use window::{Clock, ManualClock, SystemClock};
