//! Tests for store module

use super::*;
use async_trait::async_trait;
use mockall::mock;
use std::sync::Arc;

mock! {
    pub Primary {}

    #[async_trait]
    impl UsageStore for Primary {
        fn backend(&self) -> &'static str;
        async fn get(&self, key: &str) -> Result<Option<String>>;
        async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;
        async fn incr_by(&self, key: &str, amount: i64, ttl: Option<Duration>) -> Result<i64>;
        async fn delete(&self, keys: &[String]) -> Result<usize>;
    }
}

fn down() -> Error {
    Error::Store("Redis connection failed: connection refused".to_string())
}

fn unreachable_primary() -> MockPrimary {
    let mut primary = MockPrimary::new();
    primary.expect_backend().returning(|| "redis");
    primary.expect_get().returning(|_| Err(down()));
    primary.expect_set().returning(|_, _, _| Err(down()));
    primary.expect_incr_by().returning(|_, _, _| Err(down()));
    primary.expect_delete().returning(|_| Err(down()));
    primary
}

#[tokio::test]
async fn test_memory_incr_accumulates() {
    let store = MemoryStore::new();

    assert_eq!(store.incr_by("k", 500, None).await.unwrap(), 500);
    assert_eq!(store.incr_by("k", 300, None).await.unwrap(), 800);
    assert_eq!(store.incr_by("k", 200, None).await.unwrap(), 1000);
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("1000"));
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_memory_ttl_expires_lazily() {
    let store = MemoryStore::new();
    store
        .set("short", "1", Some(Duration::from_millis(20)))
        .await
        .unwrap();
    store.set("long", "1", None).await.unwrap();

    tokio::time::sleep(Duration::from_millis(40)).await;

    assert_eq!(store.get("short").await.unwrap(), None);
    assert_eq!(store.get("long").await.unwrap().as_deref(), Some("1"));
    assert_eq!(store.purge_expired().await, 1);
    assert!(!store.is_empty().await);
}

#[tokio::test]
async fn test_memory_new_key_sweeps_expired() {
    let store = MemoryStore::new();
    for i in 0..50 {
        store
            .incr_by(&format!("minute:{}", i), 1, Some(Duration::from_millis(10)))
            .await
            .unwrap();
    }
    assert_eq!(store.raw_len().await, 50);

    tokio::time::sleep(Duration::from_millis(30)).await;

    // Rewriting a live key does not sweep; inserting a new one does
    store.set("daily", "1", None).await.unwrap();
    assert_eq!(store.raw_len().await, 1);
    assert_eq!(store.purge_expired().await, 0);
}

#[tokio::test]
async fn test_memory_incr_restarts_after_expiry() {
    let store = MemoryStore::new();
    store
        .incr_by("window", 10, Some(Duration::from_millis(20)))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(40)).await;

    assert_eq!(store.incr_by("window", 3, None).await.unwrap(), 3);
}

#[tokio::test]
async fn test_memory_incr_rejects_non_integer() {
    let store = MemoryStore::new();
    store.set("k", "not-a-number", None).await.unwrap();

    let err = store.incr_by("k", 1, None).await.unwrap_err();
    assert!(matches!(err, Error::Store(_)));
}

#[tokio::test]
async fn test_memory_delete_counts_existing() {
    let store = MemoryStore::new();
    store.set("a", "1", None).await.unwrap();
    store.set("b", "2", None).await.unwrap();

    let deleted = store
        .delete(&["a".to_string(), "missing".to_string()])
        .await
        .unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(store.get("a").await.unwrap(), None);
    assert_eq!(store.get("b").await.unwrap().as_deref(), Some("2"));
}

#[tokio::test]
async fn test_read_counter() {
    let store = MemoryStore::new();
    assert_eq!(read_counter(&store, "missing").await.unwrap(), 0);

    store.set("n", "42", None).await.unwrap();
    assert_eq!(read_counter(&store, "n").await.unwrap(), 42);

    store.set("bad", "{}", None).await.unwrap();
    let err = read_counter(&store, "bad").await.unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
}

#[tokio::test]
async fn test_fallback_serves_from_memory_when_primary_down() {
    let store = FallbackStore::new(Arc::new(unreachable_primary()));

    tokio_test::assert_ok!(store.incr_by("k", 5, None).await);
    assert_eq!(store.incr_by("k", 5, None).await.unwrap(), 10);
    assert!(store.is_degraded());
    assert_eq!(store.backend(), "memory");
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("10"));

    assert_eq!(store.delete(&["k".to_string()]).await.unwrap(), 1);
    assert_eq!(store.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn test_fallback_passes_through_healthy_primary() {
    let mut primary = MockPrimary::new();
    primary.expect_backend().returning(|| "redis");
    primary
        .expect_incr_by()
        .times(1)
        .returning(|_, amount, _| Ok(amount + 100));
    primary
        .expect_get()
        .returning(|_| Ok(Some("107".to_string())));

    let store = FallbackStore::new(Arc::new(primary));

    assert_eq!(store.incr_by("k", 7, None).await.unwrap(), 107);
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("107"));
    assert!(!store.is_degraded());
    assert_eq!(store.backend(), "redis");
}

#[tokio::test]
async fn test_fallback_recovers_after_primary_returns() {
    let mut primary = MockPrimary::new();
    primary.expect_backend().returning(|| "redis");
    let mut calls = 0;
    primary.expect_incr_by().returning(move |_, amount, _| {
        calls += 1;
        if calls == 1 {
            Err(down())
        } else {
            Ok(amount)
        }
    });

    let store = FallbackStore::new(Arc::new(primary)).with_retry_interval(Duration::ZERO);

    store.incr_by("k", 1, None).await.unwrap();
    assert!(store.is_degraded());

    store.incr_by("k", 1, None).await.unwrap();
    assert!(!store.is_degraded());
}

#[tokio::test]
async fn test_fallback_backs_off_before_probing_primary() {
    let mut primary = MockPrimary::new();
    primary.expect_backend().returning(|| "redis");
    primary.expect_get().times(1).returning(|_| Err(down()));
    primary.expect_incr_by().times(1).returning(|_, amount, _| Ok(amount));

    let store =
        FallbackStore::new(Arc::new(primary)).with_retry_interval(Duration::from_millis(50));

    // One failed probe, then memory only until the interval passes
    assert_eq!(store.get("k").await.unwrap(), None);
    assert_eq!(store.incr_by("k", 2, None).await.unwrap(), 2);
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("2"));
    assert!(store.is_degraded());

    tokio::time::sleep(Duration::from_millis(80)).await;

    assert_eq!(store.incr_by("k", 5, None).await.unwrap(), 5);
    assert!(!store.is_degraded());
}
