//! End-to-end behavior of the orchestrated fetch: fresh results, cached
//! fallback, reachability short-circuit and cancellation.

use integration_tests::common::{
    executor, games_page, memory_cache, three_games_page, Game, ScriptedTransport, Step,
};
use futures::future::join_all;
use integration_tests::*;

#[tokio::test]
async fn test_games_page_fresh_then_fallback() {
    let transport = ScriptedTransport::new(vec![Step::ok(three_games_page()), Step::refused()]);
    let cache = memory_cache();
    let orchestrator =
        CacheOrchestrator::builder(executor(Arc::clone(&transport)), Arc::clone(&cache)).build();

    let descriptor = games_page(1);
    assert_eq!(descriptor.cache_key().as_str(), "games?page=1");

    let fresh = orchestrator.fetch(&descriptor).await;
    let fresh_items = match fresh {
        FetchOutcome::Fresh(items) => items,
        other => panic!("expected fresh result, got {other:?}"),
    };
    assert_eq!(fresh_items.len(), 3);
    assert_eq!(fresh_items[0].name, "Grand Theft Auto V");

    let meta = cache.meta(&descriptor.cache_key()).await.unwrap().unwrap();
    assert_eq!(meta.item_count, 3);

    match orchestrator.fetch(&descriptor).await {
        FetchOutcome::Fallback {
            items,
            fetched_at,
            error,
        } => {
            assert_eq!(items, fresh_items);
            assert_eq!(fetched_at, meta.fetched_at);
            assert_eq!(error, ClassifiedError::Unreachable);
        }
        other => panic!("expected fallback, got {other:?}"),
    }

    assert_eq!(
        transport.urls(),
        vec![
            "https://api.rawg.io/api/games?page=1",
            "https://api.rawg.io/api/games?page=1"
        ]
    );
}

#[tokio::test]
async fn test_unreachable_serves_cache_without_transport() {
    let cache = memory_cache();
    let descriptor = games_page(1);
    let cached = vec![Game {
        id: 1,
        name: "Celeste".to_string(),
        rating: None,
    }];
    cache.put(&descriptor.cache_key(), &cached).await.unwrap();

    let transport = ScriptedTransport::new(vec![]);
    let orchestrator = CacheOrchestrator::builder(executor(Arc::clone(&transport)), cache)
        .reachability(Arc::new(ManualReachability::new(false)))
        .build();

    let outcome = orchestrator.fetch(&descriptor).await;
    assert_eq!(outcome.items(), Some(cached.as_slice()));
    assert_eq!(outcome.error(), Some(&ClassifiedError::Unreachable));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_not_found_without_cache() {
    let transport = ScriptedTransport::new(vec![Step::status(404, r#"{"detail": "Not found."}"#)]);
    let orchestrator = CacheOrchestrator::builder(executor(transport), memory_cache()).build();

    assert_eq!(
        orchestrator.fetch(&games_page(9999)).await,
        FetchOutcome::Failed(ClassifiedError::NotFound)
    );
}

#[tokio::test]
async fn test_status_kinds_surface_through_fallback() {
    let cache = memory_cache();
    let transport = ScriptedTransport::new(vec![
        Step::ok(three_games_page()),
        Step::status(429, "Too Many Requests"),
        Step::status(502, "Bad Gateway"),
    ]);
    let orchestrator =
        CacheOrchestrator::builder(executor(transport), Arc::clone(&cache)).build();
    let descriptor = games_page(1);

    assert!(orchestrator.fetch(&descriptor).await.is_fresh());
    assert_eq!(
        orchestrator.fetch(&descriptor).await.error(),
        Some(&ClassifiedError::RateLimited)
    );
    assert_eq!(
        orchestrator.fetch(&descriptor).await.error(),
        Some(&ClassifiedError::ServerStatus(502))
    );
}

#[tokio::test]
async fn test_keys_are_independent() {
    let cache = memory_cache();
    let transport = ScriptedTransport::new(vec![Step::ok(three_games_page()), Step::refused()]);
    let orchestrator =
        CacheOrchestrator::builder(executor(transport), Arc::clone(&cache)).build();

    assert!(orchestrator.fetch(&games_page(1)).await.is_fresh());
    assert_eq!(
        orchestrator.fetch(&games_page(2)).await,
        FetchOutcome::Failed(ClassifiedError::Unreachable)
    );
}

#[tokio::test]
async fn test_decode_failure_falls_back() {
    let cache = memory_cache();
    let transport = ScriptedTransport::new(vec![
        Step::ok(three_games_page()),
        Step::ok(r#"{"results": "maintenance"}"#),
        Step::ok(""),
    ]);
    let orchestrator =
        CacheOrchestrator::builder(executor(transport), Arc::clone(&cache)).build();
    let descriptor = games_page(1);

    assert!(orchestrator.fetch(&descriptor).await.is_fresh());
    assert_eq!(
        orchestrator.fetch(&descriptor).await.error(),
        Some(&ClassifiedError::DecodingFailed)
    );
    assert_eq!(
        orchestrator.fetch(&descriptor).await.error(),
        Some(&ClassifiedError::NoData)
    );
}

#[tokio::test]
async fn test_retry_recovers_transient_failure() {
    let transport = ScriptedTransport::new(vec![Step::refused(), Step::ok(three_games_page())]);
    let retry = RetryPolicy::new(
        RetryConfig::default()
            .with_max_attempts(3)
            .with_base_delay(Duration::from_millis(1)),
    );
    let orchestrator = CacheOrchestrator::builder(executor(Arc::clone(&transport)), memory_cache())
        .retry(retry)
        .build();

    assert!(orchestrator.fetch(&games_page(1)).await.is_fresh());
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn test_cancel_in_flight_fetch() {
    let cache = memory_cache();
    let transport = ScriptedTransport::new(vec![Step::Hang]);
    let orchestrator =
        CacheOrchestrator::builder(executor(Arc::clone(&transport)), Arc::clone(&cache)).build();
    let descriptor = games_page(1);

    let cancel = CancelToken::new();
    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        })
    };

    let outcome = tokio::time::timeout(
        Duration::from_secs(2),
        orchestrator.fetch_cancellable(&descriptor, &cancel),
    )
    .await
    .expect("cancellation should settle the fetch");

    assert!(outcome.is_none());
    assert_eq!(transport.calls(), 1);
    assert!(cache.get(&descriptor.cache_key()).await.unwrap().is_none());
    assert!(cache.meta(&descriptor.cache_key()).await.unwrap().is_none());
    canceller.await.unwrap();
}

#[tokio::test]
async fn test_concurrent_fetches_are_independent() {
    let cache = memory_cache();
    let transport = ScriptedTransport::new(vec![
        Step::ok(three_games_page()),
        Step::ok(three_games_page()),
        Step::ok(three_games_page()),
    ]);
    let orchestrator =
        CacheOrchestrator::builder(executor(Arc::clone(&transport)), Arc::clone(&cache)).build();
    let descriptor = games_page(1);

    let outcomes = join_all((0..3).map(|_| orchestrator.fetch(&descriptor))).await;

    assert!(outcomes.iter().all(FetchOutcome::is_fresh));
    // No coalescing: every fetch hits the transport
    assert_eq!(transport.calls(), 3);
}
