//! Tests for tracker module

use super::*;
use crate::limits::ProviderQuota;
use crate::selector::FirstFit;
use crate::window::ManualClock;
use chrono::TimeZone;

fn clock_at(h: u32, m: u32, s: u32) -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 1, h, m, s).unwrap(),
    ))
}

fn tracker_with(clock: Arc<ManualClock>) -> (QuotaTracker, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let tracker = QuotaTracker::new(store.clone()).with_clock(clock);
    (tracker, store)
}

#[tokio::test]
async fn test_minute_counters_roll_over() {
    let clock = clock_at(10, 0, 30);
    let (tracker, _) = tracker_with(clock.clone());

    tracker
        .record_provider_usage(Provider::Mistral, 400)
        .await
        .unwrap();
    clock.advance(chrono::Duration::seconds(31));

    let usage = tracker.get_provider_usage(Provider::Mistral).await.unwrap();
    assert_eq!(usage.daily_tokens, 400);
    assert_eq!(usage.minute_requests, 0);
    assert_eq!(usage.minute_tokens, 0);
}

#[tokio::test]
async fn test_daily_counters_roll_over_at_utc_midnight() {
    let clock = clock_at(23, 59, 50);
    let (tracker, _) = tracker_with(clock.clone());

    tracker
        .record_provider_usage(Provider::Groq, 90_000)
        .await
        .unwrap();
    assert!(
        tracker
            .get_quota_status(Provider::Groq)
            .await
            .unwrap()
            .should_preemptive_fallback
    );

    clock.advance(chrono::Duration::seconds(15));

    let status = tracker.get_quota_status(Provider::Groq).await.unwrap();
    assert_eq!(status.usage.date, "2026-03-02");
    assert_eq!(status.usage.daily_tokens, 0);
    assert!(!status.should_preemptive_fallback);
}

#[tokio::test]
async fn test_stale_minute_keys_do_not_accumulate() {
    let clock = clock_at(6, 0, 0);
    let (tracker, store) = tracker_with(clock.clone());
    let tracker = tracker.with_ttls(
        std::time::Duration::from_secs(3600),
        std::time::Duration::from_millis(1),
    );

    for _ in 0..100 {
        tracker
            .record_provider_usage(Provider::Mistral, 10)
            .await
            .unwrap();
        // Daily key plus this minute's two counters
        assert_eq!(store.raw_len().await, 3);

        clock.advance(chrono::Duration::minutes(1));
        tokio::time::sleep(std::time::Duration::from_millis(3)).await;
    }

    let selected = tracker
        .select_available_provider(&[Provider::Mistral])
        .await
        .unwrap();
    assert_eq!(selected.map(|s| s.provider), Some(Provider::Mistral));
    assert_eq!(
        tracker
            .get_provider_usage(Provider::Mistral)
            .await
            .unwrap()
            .daily_tokens,
        1_000
    );
}

#[tokio::test]
async fn test_reading_does_not_persist() {
    let (tracker, store) = tracker_with(clock_at(8, 0, 0));

    tracker
        .get_provider_usage(Provider::OpenRouter)
        .await
        .unwrap();
    tracker.quota_summary().await.unwrap();

    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_keys_use_prefix_and_windows() {
    let clock = clock_at(0, 1, 5);
    let (tracker, store) = tracker_with(clock.clone());
    let tracker = tracker.with_key_prefix("test:ns");

    tracker
        .record_provider_usage(Provider::Cerebras, 10)
        .await
        .unwrap();

    let minute = minute_window_key(clock.now());
    let daily = store
        .get("test:ns:cerebras:daily:2026-03-01:tokens")
        .await
        .unwrap();
    let requests = store
        .get(&format!("test:ns:cerebras:minute:{}:requests", minute))
        .await
        .unwrap();
    assert_eq!(daily.as_deref(), Some("10"));
    assert_eq!(requests.as_deref(), Some("1"));
}

#[tokio::test]
async fn test_reset_only_clears_one_provider() {
    let (tracker, _) = tracker_with(clock_at(12, 0, 0));

    tracker
        .record_provider_usage(Provider::Cerebras, 100)
        .await
        .unwrap();
    tracker
        .record_provider_usage(Provider::Mistral, 200)
        .await
        .unwrap();
    tracker
        .reset_provider_usage(Provider::Cerebras)
        .await
        .unwrap();

    let cerebras = tracker.get_provider_usage(Provider::Cerebras).await.unwrap();
    let mistral = tracker.get_provider_usage(Provider::Mistral).await.unwrap();
    assert_eq!(cerebras, ProviderUsage::empty(Provider::Cerebras, "2026-03-01"));
    assert_eq!(mistral.daily_tokens, 200);
}

#[tokio::test]
async fn test_custom_table_changes_rates() {
    let table = QuotaTable::default().with_override(
        Provider::Groq,
        ProviderQuota {
            daily_token_limit: 1_000,
            requests_per_minute: 1_000,
            tokens_per_minute: 1_000_000,
        },
    );
    let (tracker, _) = tracker_with(clock_at(12, 0, 0));
    let tracker = tracker.with_table(table);

    tracker.record_provider_usage(Provider::Groq, 810).await.unwrap();

    let status = tracker.get_quota_status(Provider::Groq).await.unwrap();
    assert!((status.daily_token_usage_rate - 0.81).abs() < 1e-9);
    assert!(status.should_preemptive_fallback);
}

#[tokio::test]
async fn test_quota_summary_covers_all_providers() {
    let (tracker, _) = tracker_with(clock_at(12, 0, 0));
    tracker
        .record_provider_usage(Provider::Mistral, 900_000)
        .await
        .unwrap();

    let summary = tracker.quota_summary().await.unwrap();
    let providers: Vec<_> = summary.iter().map(|s| s.provider).collect();
    assert_eq!(providers, Provider::ALL.to_vec());

    let flagged: Vec<_> = summary
        .iter()
        .filter(|s| s.should_preemptive_fallback)
        .map(|s| s.provider)
        .collect();
    assert_eq!(flagged, vec![Provider::Mistral]);
}

#[tokio::test]
async fn test_select_reports_preemptive_fallback() {
    let (tracker, _) = tracker_with(clock_at(12, 0, 0));
    tracker
        .record_provider_usage(Provider::Groq, 95_000)
        .await
        .unwrap();

    let selection = tracker
        .select_available_provider(&[Provider::Groq, Provider::Cerebras])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(selection.provider, Provider::Cerebras);
    assert!(selection.is_preemptive_fallback);
}

#[tokio::test]
async fn test_select_empty_candidates() {
    let (tracker, _) = tracker_with(clock_at(12, 0, 0));
    assert_eq!(tracker.select_available_provider(&[]).await.unwrap(), None);
}

#[tokio::test]
async fn test_select_with_matches_first_fit_walk() {
    let (tracker, _) = tracker_with(clock_at(12, 0, 0));
    tracker
        .record_provider_usage(Provider::Cerebras, 23_000_000)
        .await
        .unwrap();

    let candidates = [Provider::Cerebras, Provider::Mistral, Provider::OpenRouter];
    let walked = tracker.select_available_provider(&candidates).await.unwrap();
    let strategized = tracker.select_with(&FirstFit, &candidates).await.unwrap();
    assert_eq!(walked, strategized);
    assert_eq!(walked.map(|s| s.provider), Some(Provider::Mistral));
}
