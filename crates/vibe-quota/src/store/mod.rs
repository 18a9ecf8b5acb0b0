//! Usage storage backends
//!
//! Counters live behind a small key-value abstraction so the tracker works
//! the same against a shared Redis instance or a process-local map.
//!
//! # Module Structure
//!
//! - `memory`: In-process map with lazy TTL expiry
//! - `redis_store`: Redis-backed store shared across instances
//! - `fallback`: Wrapper that degrades to memory when the primary fails

mod fallback;
mod memory;
mod redis_store;

#[cfg(test)]
mod tests;

pub use fallback::{FallbackStore, DEFAULT_RETRY_INTERVAL};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Key-value store used for usage counters.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Short backend name for logs (e.g. "memory", "redis")
    fn backend(&self) -> &'static str;

    /// Read a raw value
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a raw value, optionally expiring after `ttl`
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Atomically add `amount` to an integer value (missing keys count as 0)
    /// and return the new value. When `ttl` is given the key's expiry is
    /// refreshed.
    async fn incr_by(&self, key: &str, amount: i64, ttl: Option<Duration>) -> Result<i64>;

    /// Delete keys, returning how many existed
    async fn delete(&self, keys: &[String]) -> Result<usize>;
}

/// Read an integer counter; missing keys read as zero.
pub(crate) async fn read_counter(store: &dyn UsageStore, key: &str) -> Result<u64> {
    match store.get(key).await? {
        Some(raw) => {
            let value: i64 = raw.trim().parse().map_err(|_| {
                Error::Serialization(format!("counter {} holds non-integer value {:?}", key, raw))
            })?;
            Ok(u64::try_from(value).unwrap_or(0))
        }
        None => Ok(0),
    }
}
