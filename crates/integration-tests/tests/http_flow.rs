//! The pipeline against a real HTTP server (mockito) over the reqwest transport

use integration_tests::common::{games_page, memory_cache, three_games_page, Game};
use integration_tests::*;
use mockito::{Matcher, Server};
use netcache_client::ClientConfig;
use url::Url;

fn orchestrator(server: &Server) -> CacheOrchestrator<Game> {
    let config = ClientConfig::new(Url::parse(&server.url()).unwrap())
        .with_header("X-Api-Key", "test-key")
        .with_timeout(Duration::from_secs(5));
    let executor = RequestExecutor::from_config(&config).expect("Failed to create executor");
    CacheOrchestrator::builder(executor, memory_cache()).build()
}

#[tokio::test]
async fn test_fetch_over_http_then_server_error_falls_back() {
    let mut server = Server::new_async().await;
    let ok = server
        .mock("GET", "/games")
        .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
        .match_header("x-api-key", "test-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(three_games_page())
        .expect(1)
        .create_async()
        .await;

    let orchestrator = orchestrator(&server);
    let descriptor = games_page(1);
    assert!(orchestrator.fetch(&descriptor).await.is_fresh());
    ok.assert_async().await;
    ok.remove_async().await;

    let failing = server
        .mock("GET", "/games")
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body("Service Unavailable")
        .create_async()
        .await;

    match orchestrator.fetch(&descriptor).await {
        FetchOutcome::Fallback { items, error, .. } => {
            assert_eq!(items.len(), 3);
            assert_eq!(error, ClassifiedError::ServerStatus(503));
            assert!(error.is_retryable());
        }
        other => panic!("expected fallback, got {other:?}"),
    }
    failing.assert_async().await;
}

#[tokio::test]
async fn test_server_message_is_surfaced() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/games")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"{"error": "The key parameter is not provided"}"#)
        .create_async()
        .await;

    let outcome = orchestrator(&server).fetch(&games_page(1)).await;
    assert_eq!(
        outcome,
        FetchOutcome::Failed(ClassifiedError::ServerMessage(
            "The key parameter is not provided".to_string()
        ))
    );
    assert_eq!(outcome.error().unwrap().message_key(), "error.server_message");
}

#[tokio::test]
async fn test_invalid_endpoint_is_rejected_before_network() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let descriptor = RequestDescriptor::get("games/{id}/screenshots").require("id");
    assert_eq!(
        orchestrator(&server).fetch(&descriptor).await,
        FetchOutcome::Failed(ClassifiedError::InvalidEndpoint)
    );
    mock.assert_async().await;
}
