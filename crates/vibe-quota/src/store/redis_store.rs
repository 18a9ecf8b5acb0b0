//! Redis-backed usage store (for multi-instance deployments)
//!
//! Counters use `INCRBY` so concurrent writers never lose single-field
//! updates. Keys expire through Redis TTLs; nothing needs sweeping.

use super::UsageStore;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Redis usage store
pub struct RedisStore {
    client: redis::Client,
}

impl RedisStore {
    /// Create a new Redis store
    ///
    /// # Errors
    ///
    /// Returns error if the Redis URL is invalid
    pub fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| Error::Configuration(format!("invalid Redis URL: {}", e)))?;

        Ok(Self { client })
    }

    /// Get an async connection
    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| Error::Store(format!("Redis connection failed: {}", e)))
    }
}

#[async_trait]
impl UsageStore for RedisStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.get_connection().await?;

        redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Store(format!("Redis GET failed: {}", e)))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.get_connection().await?;

        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl.as_millis() as u64);
        }

        cmd.query_async::<()>(&mut conn)
            .await
            .map_err(|e| Error::Store(format!("Redis SET failed: {}", e)))?;

        debug!(key = %key, "Usage value saved to Redis");
        Ok(())
    }

    async fn incr_by(&self, key: &str, amount: i64, ttl: Option<Duration>) -> Result<i64> {
        let mut conn = self.get_connection().await?;

        let mut pipe = redis::pipe();
        pipe.atomic().cmd("INCRBY").arg(key).arg(amount);
        if let Some(ttl) = ttl {
            pipe.cmd("PEXPIRE")
                .arg(key)
                .arg(ttl.as_millis() as u64)
                .ignore();
        }

        let (value,): (i64,) = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Store(format!("Redis INCRBY failed: {}", e)))?;

        Ok(value)
    }

    async fn delete(&self, keys: &[String]) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.get_connection().await?;

        let deleted: i64 = redis::cmd("DEL")
            .arg(keys)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Store(format!("Redis DEL failed: {}", e)))?;

        debug!(requested = keys.len(), deleted, "Usage keys deleted from Redis");
        Ok(usize::try_from(deleted).unwrap_or(0))
    }
}
