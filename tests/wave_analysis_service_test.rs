use common_test_utils::*;

use std::sync::Arc;
use std::time::Duration;
use wave_analysis::clock::ManualClock;
use wave_analysis::{AnalysisError, AnalysisEvent, MemoryCacheStore, SeriesError, WaveNumber};

const HOUR_MS: i64 = 60 * 60 * 1000;

fn canonical_provider() -> Arc<StubProvider> {
    Arc::new(StubProvider::new().with_series("XYZ", create_flat_points(&CANONICAL_PRICES)))
}

#[tokio::test]
async fn test_second_call_within_ttl_uses_cache() {
    let provider = canonical_provider();
    let service = build_service(
        provider.clone(),
        Arc::new(MemoryCacheStore::new()),
        Arc::new(ManualClock::new(0)),
    );

    let first = service.analyze("XYZ", "1d", false).await.unwrap();
    let second = service.analyze("XYZ", "1d", false).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.current_wave.number, WaveNumber::C);
    assert_eq!(provider.calls_for("XYZ"), 1);
}

#[tokio::test]
async fn test_force_refresh_recomputes_from_fresh_series() {
    let provider = canonical_provider();
    let clock = Arc::new(ManualClock::new(0));
    let service = build_service(provider.clone(), Arc::new(MemoryCacheStore::new()), clock.clone());

    service.analyze("XYZ", "1d", false).await.unwrap();
    clock.advance(1_000);
    let refreshed = service.analyze("XYZ", "1d", true).await.unwrap();

    assert_eq!(refreshed.computed_at, 1_000);
    assert_eq!(provider.calls_for("XYZ"), 2);
    // 강제 갱신 결과가 캐시에 기록된다
    assert_eq!(service.cached("XYZ", "1d").await, Some(refreshed));
}

#[tokio::test]
async fn test_expired_analysis_reuses_cached_series() {
    let provider = canonical_provider();
    let clock = Arc::new(ManualClock::new(0));
    let service = build_service(provider.clone(), Arc::new(MemoryCacheStore::new()), clock.clone());

    service.analyze("XYZ", "1d", false).await.unwrap();
    service.invalidate("XYZ", "1d").await;
    service.analyze("XYZ", "1d", false).await.unwrap();
    // 시계열 캐시(6시간)가 살아 있으므로 공급자를 다시 부르지 않는다
    assert_eq!(provider.calls_for("XYZ"), 1);

    clock.set(7 * HOUR_MS);
    service.invalidate("XYZ", "1d").await;
    service.analyze("XYZ", "1d", false).await.unwrap();
    assert_eq!(provider.calls_for("XYZ"), 2);
}

#[tokio::test]
async fn test_analysis_expires_after_a_day() {
    let provider = canonical_provider();
    let clock = Arc::new(ManualClock::new(0));
    let service = build_service(provider.clone(), Arc::new(MemoryCacheStore::new()), clock.clone());

    service.analyze("XYZ", "1d", false).await.unwrap();
    clock.set(24 * HOUR_MS);
    assert!(service.cached("XYZ", "1d").await.is_some());
    clock.advance(1);
    assert!(service.cached("XYZ", "1d").await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_misses_are_coalesced() {
    let provider = Arc::new(
        StubProvider::new()
            .with_series("XYZ", create_flat_points(&CANONICAL_PRICES))
            .with_delay(Duration::from_millis(100)),
    );
    let service = build_service(
        provider.clone(),
        Arc::new(MemoryCacheStore::new()),
        Arc::new(ManualClock::new(0)),
    );

    let (a, b, c) = tokio::join!(
        service.analyze("XYZ", "1d", false),
        service.analyze("XYZ", "1d", false),
        service.analyze("XYZ", "1d", false),
    );

    assert_eq!(provider.calls_for("XYZ"), 1);
    assert_eq!(a, b);
    assert_eq!(b, c);
    assert!(a.is_some());
}

#[tokio::test]
async fn test_cache_write_failure_still_returns_result() {
    let provider = canonical_provider();
    let service = build_service(
        provider.clone(),
        Arc::new(FailingStore),
        Arc::new(ManualClock::new(0)),
    );
    let mut events = service.subscribe();

    let result = service.analyze("XYZ", "1d", false).await;
    assert!(result.is_some());

    let mut saw_write_failure = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, AnalysisEvent::CacheWriteFailed { .. }) {
            saw_write_failure = true;
        }
    }
    assert!(saw_write_failure);

    // 캐시에 남지 않았으므로 다시 계산한다
    service.analyze("XYZ", "1d", false).await.unwrap();
    assert_eq!(provider.calls_for("XYZ"), 2);
}

#[tokio::test]
async fn test_bad_input_means_no_analysis() {
    let mut unsorted = create_flat_points(&[100.0, 120.0, 110.0]);
    unsorted.swap(0, 1);
    let provider = Arc::new(
        StubProvider::new()
            .with_series("EMPTY", Vec::new())
            .with_series("UNSORTED", unsorted)
            .with_series("FLAT", create_flat_points(&[50.0; 20])),
    );
    let service = build_service(
        provider,
        Arc::new(MemoryCacheStore::new()),
        Arc::new(ManualClock::new(0)),
    );

    assert!(matches!(
        service.try_analyze("EMPTY", "1d", false).await,
        Err(AnalysisError::Series(SeriesError::Empty))
    ));
    assert!(matches!(
        service.try_analyze("UNSORTED", "1d", false).await,
        Err(AnalysisError::Series(SeriesError::NonMonotonic { index: 1, .. }))
    ));
    assert!(matches!(
        service.try_analyze("FLAT", "1d", false).await,
        Err(AnalysisError::NoPattern { .. })
    ));
    assert!(service.analyze("MISSING", "1d", false).await.is_none());
}

#[tokio::test]
async fn test_invalidate_all_clears_analyses() {
    let provider = Arc::new(
        StubProvider::new()
            .with_series("A", create_flat_points(&CANONICAL_PRICES))
            .with_series("B", create_flat_points(&CANONICAL_PRICES)),
    );
    let service = build_service(
        provider,
        Arc::new(MemoryCacheStore::new()),
        Arc::new(ManualClock::new(0)),
    );

    service.analyze("A", "1d", false).await.unwrap();
    service.analyze("B", "1d", false).await.unwrap();
    assert_eq!(service.invalidate_all().await, 2);
    assert!(service.cached("A", "1d").await.is_none());
}
