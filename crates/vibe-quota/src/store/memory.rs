//! In-memory usage store
//!
//! Process-local only: counters are not shared between instances and are
//! lost on restart. Good enough for best-effort rate shaping and tests.
//!
//! Expired keys are swept whenever a new key is inserted, so per-minute
//! counters that are never touched again do not accumulate.

use super::UsageStore;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-memory key-value store with lazy expiry.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (non-expired) keys
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries.values().filter(|e| !e.is_expired(now)).count()
    }

    /// Whether the store holds no live keys
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop expired keys, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        sweep_expired(&mut entries, Instant::now())
    }

    /// Number of keys held, expired or not
    pub async fn raw_len(&self) -> usize {
        self.entries.read().await.len()
    }
}

fn sweep_expired(entries: &mut HashMap<String, Entry>, now: Instant) -> usize {
    let before = entries.len();
    entries.retain(|_, e| !e.is_expired(now));
    let removed = before - entries.len();
    if removed > 0 {
        debug!(removed, remaining = entries.len(), "Purged expired usage keys");
    }
    removed
}

#[async_trait]
impl UsageStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let now = Instant::now();
        let expires_at = ttl.map(|ttl| now + ttl);
        let mut entries = self.entries.write().await;
        if !entries.contains_key(key) {
            sweep_expired(&mut entries, now);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn incr_by(&self, key: &str, amount: i64, ttl: Option<Duration>) -> Result<i64> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        if !entries.contains_key(key) {
            sweep_expired(&mut entries, now);
        }
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: "0".to_string(),
            expires_at: None,
        });

        if entry.is_expired(now) {
            entry.value = "0".to_string();
            entry.expires_at = None;
        }

        let current: i64 = entry
            .value
            .parse()
            .map_err(|_| Error::Store(format!("value at {} is not an integer", key)))?;
        let next = current.saturating_add(amount);
        entry.value = next.to_string();
        if let Some(ttl) = ttl {
            entry.expires_at = Some(now + ttl);
        }
        Ok(next)
    }

    async fn delete(&self, keys: &[String]) -> Result<usize> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let deleted = keys
            .iter()
            .filter_map(|k| entries.remove(k))
            .filter(|e| !e.is_expired(now))
            .count();
        Ok(deleted)
    }
}
