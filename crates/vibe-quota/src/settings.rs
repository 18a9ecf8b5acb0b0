//! Quota settings
//!
//! Layered the same way as the server config: embedded defaults, optional
//! files, then `VIBE_QUOTA_*` environment variables (highest priority).

use crate::error::{Error, Result};
use crate::limits::{ProviderQuota, QuotaTable};
use crate::provider::Provider;
use crate::store::{FallbackStore, MemoryStore, RedisStore, UsageStore};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Embedded default settings (compiled into the crate)
pub const DEFAULT_SETTINGS: &str = include_str!("../config/default.toml");

/// Which store backs the usage counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Redis with in-memory fallback when a URL is configured, else memory
    #[default]
    Auto,
    /// Process-local counters
    Memory,
    /// Redis only; failures propagate to callers
    Redis,
}

/// Store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Backend selection
    #[serde(default)]
    pub backend: StoreBackend,
    /// Redis connection URL
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Namespace for usage keys
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Lifetime of daily counters in seconds
    #[serde(default = "default_daily_ttl_secs")]
    pub daily_ttl_secs: u64,
    /// Lifetime of per-minute counters in seconds
    #[serde(default = "default_minute_ttl_secs")]
    pub minute_ttl_secs: u64,
    /// Milliseconds to stay on the in-memory fallback before retrying Redis
    #[serde(default = "default_fallback_retry_ms")]
    pub fallback_retry_ms: u64,
}

fn default_key_prefix() -> String {
    crate::tracker::DEFAULT_KEY_PREFIX.to_string()
}

fn default_daily_ttl_secs() -> u64 {
    crate::tracker::DEFAULT_DAILY_TTL.as_secs()
}

fn default_minute_ttl_secs() -> u64 {
    crate::tracker::DEFAULT_MINUTE_TTL.as_secs()
}

fn default_fallback_retry_ms() -> u64 {
    u64::try_from(crate::store::DEFAULT_RETRY_INTERVAL.as_millis()).unwrap_or(u64::MAX)
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            redis_url: None,
            key_prefix: default_key_prefix(),
            daily_ttl_secs: default_daily_ttl_secs(),
            minute_ttl_secs: default_minute_ttl_secs(),
            fallback_retry_ms: default_fallback_retry_ms(),
        }
    }
}

impl StoreSettings {
    /// Configured Redis URL, ignoring blank values
    #[must_use]
    pub fn redis_url(&self) -> Option<&str> {
        self.redis_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// Quota settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuotaSettings {
    /// Usage store
    #[serde(default)]
    pub store: StoreSettings,
    /// Per-provider limit overrides
    #[serde(default)]
    pub limits: HashMap<Provider, ProviderQuota>,
}

impl QuotaSettings {
    /// Load settings from files and environment
    ///
    /// Sources, lowest priority first: embedded defaults,
    /// `config/quota.toml`, `config/local.toml`, `VIBE_QUOTA_*` variables
    /// (a `.env` file is read first when present).
    ///
    /// # Errors
    ///
    /// Returns error if a source cannot be parsed
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            .add_source(File::from_str(DEFAULT_SETTINGS, FileFormat::Toml))
            .add_source(File::with_name("config/quota").required(false))
            .add_source(File::with_name("config/local").required(false))
            // VIBE_QUOTA_STORE__REDIS_URL -> store.redis_url
            .add_source(
                Environment::with_prefix("VIBE_QUOTA")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build settings: {}", e)))?;

        Self::from_config(config)
    }

    /// Parse settings from a TOML document layered over the defaults
    ///
    /// # Errors
    ///
    /// Returns error if the document is invalid
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(DEFAULT_SETTINGS, FileFormat::Toml))
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build settings: {}", e)))?;

        Self::from_config(config)
    }

    fn from_config(config: Config) -> Result<Self> {
        config
            .try_deserialize()
            .map_err(|e| Error::Configuration(format!("failed to deserialize settings: {}", e)))
    }

    /// Built-in quota table with configured overrides applied
    #[must_use]
    pub fn quota_table(&self) -> QuotaTable {
        self.limits
            .iter()
            .fold(QuotaTable::default(), |table, (provider, quota)| {
                table.with_override(*provider, *quota)
            })
    }
}

/// Construct the usage store described by `settings`
///
/// # Errors
///
/// Returns error if the Redis backend is requested without a valid URL
pub fn build_store(settings: &StoreSettings) -> Result<Arc<dyn UsageStore>> {
    match (settings.backend, settings.redis_url()) {
        (StoreBackend::Memory, _) | (StoreBackend::Auto, None) => {
            info!("Using in-memory usage store");
            Ok(Arc::new(MemoryStore::new()))
        }
        (StoreBackend::Redis, Some(url)) => {
            info!("Using Redis usage store");
            Ok(Arc::new(RedisStore::new(url)?))
        }
        (StoreBackend::Redis, None) => Err(Error::Configuration(
            "store.backend = \"redis\" requires store.redis_url".to_string(),
        )),
        (StoreBackend::Auto, Some(url)) => {
            info!("Using Redis usage store with in-memory fallback");
            let primary: Arc<dyn UsageStore> = Arc::new(RedisStore::new(url)?);
            Ok(Arc::new(FallbackStore::new(primary).with_retry_interval(
                Duration::from_millis(settings.fallback_retry_ms),
            )))
        }
    }
}
