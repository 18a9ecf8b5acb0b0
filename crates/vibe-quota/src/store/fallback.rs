//! Degrading store wrapper
//!
//! Any primary failure is logged and the call is served from a local
//! [`MemoryStore`] instead. Usage recorded while degraded stays local and
//! is not replayed into the primary.
//!
//! Once degraded, the primary is left alone for `retry_interval` before it
//! is probed again, so a dead Redis costs one connect timeout per interval
//! rather than one per call.

use super::{MemoryStore, UsageStore};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default wait between primary probes while degraded
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Primary store with an in-memory safety net.
pub struct FallbackStore {
    primary: Arc<dyn UsageStore>,
    fallback: MemoryStore,
    degraded: AtomicBool,
    retry_interval: Duration,
    started: Instant,
    /// Millis since `started` before which the primary is not probed
    next_probe_ms: AtomicU64,
}

impl FallbackStore {
    /// Wrap `primary`
    #[must_use]
    pub fn new(primary: Arc<dyn UsageStore>) -> Self {
        Self {
            primary,
            fallback: MemoryStore::new(),
            degraded: AtomicBool::new(false),
            retry_interval: DEFAULT_RETRY_INTERVAL,
            started: Instant::now(),
            next_probe_ms: AtomicU64::new(0),
        }
    }

    /// Set how long to serve from memory before probing the primary again
    #[must_use]
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Whether the last primary call failed
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Whether the next call should go to the primary
    fn should_probe(&self) -> bool {
        !self.is_degraded() || self.elapsed_ms() >= self.next_probe_ms.load(Ordering::Relaxed)
    }

    fn on_success(&self) {
        if self.degraded.swap(false, Ordering::Relaxed) {
            info!(
                backend = self.primary.backend(),
                "Usage store recovered, leaving in-memory fallback"
            );
        }
    }

    fn on_failure(&self, op: &'static str, err: &Error) {
        let retry_ms = u64::try_from(self.retry_interval.as_millis()).unwrap_or(u64::MAX);
        self.next_probe_ms
            .store(self.elapsed_ms().saturating_add(retry_ms), Ordering::Relaxed);
        if self.degraded.swap(true, Ordering::Relaxed) {
            debug!(backend = self.primary.backend(), op, error = %err, "Usage store still unavailable");
        } else {
            warn!(
                backend = self.primary.backend(),
                op,
                error = %err,
                "Usage store unavailable, serving from in-memory fallback"
            );
        }
    }
}

#[async_trait]
impl UsageStore for FallbackStore {
    fn backend(&self) -> &'static str {
        if self.is_degraded() {
            self.fallback.backend()
        } else {
            self.primary.backend()
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        if !self.should_probe() {
            return self.fallback.get(key).await;
        }
        match self.primary.get(key).await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(e) => {
                self.on_failure("get", &e);
                self.fallback.get(key).await
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        if !self.should_probe() {
            return self.fallback.set(key, value, ttl).await;
        }
        match self.primary.set(key, value, ttl).await {
            Ok(()) => {
                self.on_success();
                Ok(())
            }
            Err(e) => {
                self.on_failure("set", &e);
                self.fallback.set(key, value, ttl).await
            }
        }
    }

    async fn incr_by(&self, key: &str, amount: i64, ttl: Option<Duration>) -> Result<i64> {
        if !self.should_probe() {
            return self.fallback.incr_by(key, amount, ttl).await;
        }
        match self.primary.incr_by(key, amount, ttl).await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(e) => {
                self.on_failure("incr_by", &e);
                self.fallback.incr_by(key, amount, ttl).await
            }
        }
    }

    async fn delete(&self, keys: &[String]) -> Result<usize> {
        // Clear both sides so counters written while degraded do not linger.
        let local = self.fallback.delete(keys).await?;
        if !self.should_probe() {
            return Ok(local);
        }
        match self.primary.delete(keys).await {
            Ok(deleted) => {
                self.on_success();
                Ok(deleted.max(local))
            }
            Err(e) => {
                self.on_failure("delete", &e);
                Ok(local)
            }
        }
    }
}
