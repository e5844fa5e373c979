//! Integration tests for the health check endpoint and general HTTP behaviour.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, get};
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Test: GET /health reports every provider and an ok status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_returns_ok_with_providers() {
    let test = common::build_test_app(true, None).await;
    let response = get(&test.app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["active_runs"], 0);

    let providers = json["providers"].as_array().unwrap();
    assert_eq!(providers.len(), 4);
    let analyzer = providers
        .iter()
        .find(|p| p["name"] == "code-analyzer")
        .unwrap();
    assert_eq!(analyzer["required"], true);
    assert_eq!(analyzer["state"]["state"], "connected");
}

// ---------------------------------------------------------------------------
// Test: an unreachable required provider degrades the service
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unreachable_required_provider_is_degraded() {
    let test = common::build_test_app(false, None).await;
    let json = body_json(get(&test.app, "/health").await).await;

    assert_eq!(json["status"], "degraded");
    let analyzer = json["providers"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["name"] == "code-analyzer")
        .unwrap();
    assert_ne!(analyzer["state"]["state"], "connected");
}

// ---------------------------------------------------------------------------
// Test: Unknown route returns 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let test = common::build_test_app(true, None).await;
    let response = get(&test.app, "/this-route-does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: x-request-id header is present in response
// ---------------------------------------------------------------------------

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let test = common::build_test_app(true, None).await;
    let response = get(&test.app, "/health").await;

    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("Response must contain an x-request-id header");
    assert_eq!(request_id.to_str().unwrap().len(), 36);
}

// ---------------------------------------------------------------------------
// Test: a caller-supplied request id is echoed back
// ---------------------------------------------------------------------------

#[tokio::test]
async fn caller_request_id_is_propagated() {
    let test = common::build_test_app(true, None).await;
    let response = test
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "trace-me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "trace-me");
}

// ---------------------------------------------------------------------------
// Test: CORS preflight for an allowed origin
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cors_preflight_allows_configured_origin() {
    let test = common::build_test_app(true, None).await;
    let response = test
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/v1/runs")
                .header("origin", "http://localhost:5173")
                .header("access-control-request-method", "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://localhost:5173"
    );
}
