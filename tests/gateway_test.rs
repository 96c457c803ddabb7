//! Integration tests for the gateway HTTP surface and the readiness gate.
//!
//! A wiremock server stands in for the local Ollama backend.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body, Bytes};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ollama_gateway::config::{ApiConfig, AuthConfig, BackendConfig, Config, TunnelConfig};
use ollama_gateway::error::Error;
use ollama_gateway::health::{self, HealthStatus};
use ollama_gateway::{api, AppState, ProxyClient};

const TOKEN: &str = "test-token";

fn test_app(backend_url: &str) -> Router {
    let config = Config {
        api: ApiConfig::default(),
        backend: BackendConfig::default(),
        auth: AuthConfig {
            token: TOKEN.to_string(),
        },
        tunnel: TunnelConfig::default(),
    };
    let proxy = ProxyClient::new(backend_url, Duration::from_secs(5)).unwrap();
    let state = Arc::new(AppState::new(config, proxy));
    api::router().with_state(state)
}

/// A loopback URL nothing is listening on.
fn unreachable_backend_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    bearer: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, HeaderMap, Bytes) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, bytes)
}

// ============================================================================
// AuthGuard
// ============================================================================

#[tokio::test]
async fn test_missing_token_rejected_with_challenge() {
    let app = test_app(&unreachable_backend_url());

    let (status, headers, _) = send(&app, Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(headers.get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
}

#[tokio::test]
async fn test_wrong_token_rejected() {
    let app = test_app(&unreachable_backend_url());

    let (status, headers, _) = send(&app, Method::GET, "/", Some("not-the-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(headers.get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
}

#[tokio::test]
async fn test_malformed_auth_header_rejected() {
    let app = test_app(&unreachable_backend_url());

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/tags")
        .header(header::AUTHORIZATION, format!("Basic {}", TOKEN))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_rejection_is_independent_of_backend_state() {
    // Backend down: still 401, never 502.
    let app = test_app(&unreachable_backend_url());
    let (status, _, _) = send(&app, Method::GET, "/api/tags", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Backend up: same rejection.
    let server = MockServer::start().await;
    let app = test_app(&server.uri());
    let (status, _, _) = send(&app, Method::GET, "/api/tags", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_rejection_body_never_contains_token() {
    let app = test_app(&unreachable_backend_url());

    let (_, _, body) = send(&app, Method::GET, "/", Some("wrong-token"), None).await;
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(!text.contains("wrong-token"));
    assert!(!text.contains(TOKEN));
}

// ============================================================================
// ForwardingProxy - raw variant
// ============================================================================

#[tokio::test]
async fn test_raw_forward_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Ollama is running"))
        .mount(&server)
        .await;

    let app = test_app(&server.uri());
    let (status, _, body) = send(&app, Method::GET, "/", Some(TOKEN), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"Ollama is running");
}

#[tokio::test]
async fn test_raw_forward_passes_backend_error_status_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such thing"))
        .mount(&server)
        .await;

    let app = test_app(&server.uri());
    let (status, _, body) = send(&app, Method::GET, "/", Some(TOKEN), None).await;

    // Raw variant: backend status and body come back verbatim.
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(&body[..], b"no such thing");
}

#[tokio::test]
async fn test_unreachable_backend_returns_bad_gateway() {
    let app = test_app(&unreachable_backend_url());

    let (status, _, body) = send(&app, Method::GET, "/", Some(TOKEN), None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"]["type"], "backend_unreachable");
}

// ============================================================================
// ForwardingProxy - structured variant
// ============================================================================

#[tokio::test]
async fn test_tags_returns_backend_json() {
    let tags = serde_json::json!({
        "models": [
            {"name": "mistral:latest", "size": 4109865159u64}
        ]
    });

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&tags))
        .mount(&server)
        .await;

    let app = test_app(&server.uri());
    let (status, _, body) = send(&app, Method::GET, "/api/tags", Some(TOKEN), None).await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json, tags);
}

#[tokio::test]
async fn test_tags_surfaces_backend_error_code_not_generic_502() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let app = test_app(&server.uri());
    let (status, _, body) = send(&app, Method::GET, "/api/tags", Some(TOKEN), None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"]["type"], "backend_error");
}

#[tokio::test]
async fn test_tags_repeated_calls_are_idempotent() {
    let tags = serde_json::json!({"models": [{"name": "mistral:latest"}]});

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&tags))
        .mount(&server)
        .await;

    let app = test_app(&server.uri());
    let (status_a, _, body_a) = send(&app, Method::GET, "/api/tags", Some(TOKEN), None).await;
    let (status_b, _, body_b) = send(&app, Method::GET, "/api/tags", Some(TOKEN), None).await;

    assert_eq!(status_a, StatusCode::OK);
    assert_eq!(status_a, status_b);
    assert_eq!(body_a, body_b);
}

// ============================================================================
// Echo diagnostic route
// ============================================================================

#[tokio::test]
async fn test_echo_returns_body_unauthenticated() {
    let app = test_app(&unreachable_backend_url());
    let payload = serde_json::json!({"a": 1});

    let (status, _, body) = send(&app, Method::POST, "/echo", None, Some(payload.clone())).await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json, payload);
}

// ============================================================================
// HealthGate
// ============================================================================

#[tokio::test]
async fn test_probe_classification() {
    let client = reqwest::Client::new();

    let healthy = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&healthy)
        .await;
    assert_eq!(
        health::probe(&client, &healthy.uri()).await,
        HealthStatus::Healthy
    );

    let erroring = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&erroring)
        .await;
    assert_eq!(
        health::probe(&client, &erroring.uri()).await,
        HealthStatus::Unhealthy
    );

    assert_eq!(
        health::probe(&client, &unreachable_backend_url()).await,
        HealthStatus::Unhealthy
    );
}

#[tokio::test]
async fn test_await_healthy_only_after_nth_probe() {
    let server = MockServer::start().await;

    // First two probes fail, every probe after that succeeds.
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    health::await_healthy(
        &client,
        &server.uri(),
        None,
        Duration::from_millis(10),
        Some(Duration::from_secs(5)),
    )
    .await
    .unwrap();

    // Exactly two unhealthy probes and one healthy one.
    server.verify().await;
}

#[tokio::test]
async fn test_await_healthy_times_out_fatally() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let result = health::await_healthy(
        &client,
        &server.uri(),
        None,
        Duration::from_millis(10),
        Some(Duration::from_millis(50)),
    )
    .await;

    match result {
        Err(Error::Startup(msg)) => assert!(msg.contains("not healthy")),
        _ => panic!("Expected Startup error"),
    }
}
