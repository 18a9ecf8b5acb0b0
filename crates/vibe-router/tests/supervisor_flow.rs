//! Integration tests for vibe-router
//!
//! Drives a supervisor through a burst of traffic the way the agent loop
//! would: select, call, record, and select again.

use chrono::{TimeZone, Utc};
use std::sync::Arc;
use vibe_quota::{ManualClock, MemoryStore, Provider, QuotaTracker};
use vibe_router::{
    format_report, AlertKind, ProviderAvailability, SupervisorRouter, UsageLedger, UsageOutcome,
};

fn setup() -> (SupervisorRouter, Arc<UsageLedger>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 4, 2, 16, 45, 5).unwrap(),
    ));
    let tracker = QuotaTracker::new(Arc::new(MemoryStore::new())).with_clock(clock.clone());
    let ledger = Arc::new(UsageLedger::new().with_clock(clock.clone()));
    let router = SupervisorRouter::new(
        Arc::new(tracker),
        Arc::new(ProviderAvailability::all_configured()),
    )
    .with_ledger(ledger.clone());
    (router, ledger, clock)
}

// ============================================================================
// Request Bursts
// ============================================================================

#[tokio::test]
async fn test_request_burst_moves_to_next_provider_then_recovers() {
    let (router, _, clock) = setup();

    // Cerebras allows 30 requests per minute; the 26th pushes it past 85%
    for _ in 0..26 {
        let choice = router.select_model(&[]).await.unwrap();
        assert_eq!(choice.provider, Provider::Cerebras);
        router
            .record_completion("supervisor", &choice, UsageOutcome::success(100, 50, 300))
            .await
            .unwrap();
    }

    let choice = router.select_model(&[]).await.unwrap();
    assert_eq!(choice.provider, Provider::Mistral);
    assert!(choice.is_preemptive_fallback);

    let status = router
        .tracker()
        .get_quota_status(Provider::Cerebras)
        .await
        .unwrap();
    assert_eq!(status.recommended_wait_ms, Some(55_000));

    // Next minute window
    clock.advance(chrono::Duration::seconds(55));
    let choice = router.select_model(&[]).await.unwrap();
    assert_eq!(choice.provider, Provider::Cerebras);
    assert!(!choice.is_preemptive_fallback);
}

#[tokio::test]
async fn test_retry_excluding_failed_provider() {
    let (router, ledger, _) = setup();

    let first = router.select_model(&[]).await.unwrap();
    router
        .record_completion("supervisor", &first, UsageOutcome::failure("timeout", 30_000))
        .await
        .unwrap();

    let retry = router.select_model(&[first.provider]).await.unwrap();
    assert_ne!(retry.provider, first.provider);
    router
        .record_completion("supervisor", &retry, UsageOutcome::success(800, 200, 900))
        .await
        .unwrap();

    let report = ledger.today_report().await;
    assert_eq!(report.total.request_count, 2);
    assert_eq!(report.total.failure_count, 1);
    assert_eq!(report.by_provider[&Provider::Mistral].total_tokens, 1_000);
}

// ============================================================================
// Reporting
// ============================================================================

#[tokio::test]
async fn test_groq_heavy_day_raises_alert() {
    let (router, ledger, _) = setup();

    let choice = router
        .select_model(&[Provider::Cerebras, Provider::Mistral])
        .await
        .unwrap();
    assert_eq!(choice.provider, Provider::Groq);
    router
        .record_completion("nlq", &choice, UsageOutcome::success(85_000, 6_000, 4_000))
        .await
        .unwrap();

    let report = ledger.today_report().await;
    assert!(report
        .alerts
        .iter()
        .any(|a| a.provider == Provider::Groq && a.kind == AlertKind::DailyTokens));

    let text = format_report(&report);
    assert!(text.contains("groq daily tokens at 91.0%"));

    // The tracker agrees Groq should be avoided now
    let groq = router
        .tracker()
        .get_quota_status(Provider::Groq)
        .await
        .unwrap();
    assert!(groq.should_preemptive_fallback);
}
