//! Hosted identity provider against a mocked auth service

mod fixtures;

use reqwest::StatusCode;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fixtures::TestServer;
use pbl_tracker::{HttpIdentityProvider, IdentityError, IdentityProvider};

const API_KEY: &str = "public-anon-key";

fn provider(server: &MockServer) -> HttpIdentityProvider {
    HttpIdentityProvider::new(
        server.uri(),
        API_KEY,
        Duration::from_secs(2),
        Duration::from_secs(60),
    )
    .unwrap()
}

#[tokio::test]
async fn test_valid_token_resolves_to_user() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("apikey", API_KEY))
        .and(header("authorization", "Bearer session-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "user-42", "email": "a@b.test"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let user = provider(&server).resolve("session-1").await.unwrap();

    assert_eq!(user.as_str(), "user-42");
}

#[tokio::test]
async fn test_resolved_tokens_are_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "user-7"})))
        .expect(2)
        .mount(&server)
        .await;

    let provider = provider(&server);
    for _ in 0..3 {
        assert_eq!(provider.resolve("cached").await.unwrap().as_str(), "user-7");
    }

    provider.clear_cache();
    assert_eq!(provider.resolve("cached").await.unwrap().as_str(), "user-7");
}

#[tokio::test]
async fn test_refused_tokens_are_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer expired"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"msg": "invalid JWT"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer banned"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let provider = provider(&server);
    assert!(matches!(
        provider.resolve("expired").await,
        Err(IdentityError::Rejected)
    ));
    assert!(matches!(
        provider.resolve("banned").await,
        Err(IdentityError::Rejected)
    ));
}

#[tokio::test]
async fn test_failures_are_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let provider = provider(&server);
    assert!(provider.resolve("nope").await.is_err());
    assert!(provider.resolve("nope").await.is_err());
}

#[tokio::test]
async fn test_server_errors_mean_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = provider(&server).resolve("any").await;

    assert!(matches!(result, Err(IdentityError::Unavailable { .. })));
}

#[tokio::test]
async fn test_unexpected_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer garbled"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer blank"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": ""})))
        .mount(&server)
        .await;

    let provider = provider(&server);
    assert!(matches!(
        provider.resolve("garbled").await,
        Err(IdentityError::InvalidResponse { .. })
    ));
    assert!(matches!(
        provider.resolve("blank").await,
        Err(IdentityError::InvalidResponse { .. })
    ));
}

#[tokio::test]
async fn test_unreachable_service_is_unavailable() {
    // Nothing listens on port 1.
    let provider = HttpIdentityProvider::new(
        "http://127.0.0.1:1",
        API_KEY,
        Duration::from_millis(500),
        Duration::from_secs(60),
    )
    .unwrap();

    assert!(matches!(
        provider.resolve("token").await,
        Err(IdentityError::Unavailable { .. })
    ));
}

#[tokio::test]
async fn test_api_uses_hosted_identity_end_to_end() {
    let auth = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer mentor-session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "mentor-1"})))
        .mount(&auth)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&auth)
        .await;

    let app = TestServer::start_with_identity(Arc::new(provider(&auth))).await;

    let (status, created) = app
        .post_json(
            "/projects",
            Some("mentor-session"),
            &json!({"title": "River study"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["project"]["created_by"], "mentor-1");

    let (status, body) = app.get("/projects", Some("forged-session")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"error": "Unauthorized"}));

    let (status, listing) = app.get("/projects", Some("mentor-session")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["projects"][0]["project_members"], json!([{"role": "owner"}]));
}
