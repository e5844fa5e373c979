//! Integration tests for the `/api/v1/runs` resource.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use axum::Router;
use common::{body_json, get, local_run, post_json};
use serde_json::{json, Value};

/// Poll a run until it reaches a terminal status.
async fn wait_for_terminal(app: &Router, run_id: &str) -> Value {
    for _ in 0..250 {
        let run = body_json(get(app, &format!("/api/v1/runs/{run_id}")).await).await;
        if matches!(run["data"]["status"].as_str(), Some("COMPLETED" | "FAILED")) {
            return run["data"].clone();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("run {run_id} did not finish");
}

// ---------------------------------------------------------------------------
// Synchronous submission
// ---------------------------------------------------------------------------

#[tokio::test]
async fn wait_submission_returns_full_result() {
    let test = common::build_test_app(true, None).await;
    let response = post_json(&test.app, "/api/v1/runs?wait=true", local_run("ledger")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["run"]["status"], "COMPLETED");
    assert_eq!(data["run"]["name"], "ledger");
    assert_eq!(data["run"]["quality_score"], 100);
    assert_eq!(data["analysis"]["module"], "FI");
    assert_eq!(data["quality"]["passed"], true);
    assert_eq!(data["deployment"]["mode"], "skipped");
    assert!(data["project"]["files"].as_array().unwrap().len() > 2);
}

#[tokio::test]
async fn failed_run_returns_422_with_run_id() {
    let test = common::build_test_app(false, None).await;
    let response = post_json(&test.app, "/api/v1/runs?wait=true", local_run("ledger")).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["code"], "RUN_FAILED");
    let run_id = json["run_id"].as_str().unwrap().to_string();

    let run = body_json(get(&test.app, &format!("/api/v1/runs/{run_id}")).await).await;
    assert_eq!(run["data"]["status"], "FAILED");
    assert!(run["data"]["failure_reason"].is_string());

    // VALIDATE never ran.
    let response = get(&test.app, &format!("/api/v1/runs/{run_id}/quality")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_source_is_rejected() {
    let test = common::build_test_app(true, None).await;
    let response = post_json(
        &test.app,
        "/api/v1/runs",
        json!({ "source": "   \n", "config": {} }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");

    let runs = body_json(get(&test.app, "/api/v1/runs").await).await;
    assert!(runs["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn out_of_range_quality_threshold_is_rejected() {
    let test = common::build_test_app(true, None).await;
    let response = post_json(
        &test.app,
        "/api/v1/runs",
        json!({ "source": common::SOURCE, "config": { "min_quality_score": 140 } }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let test = common::build_test_app(true, None).await;
    let response = post_json(&test.app, "/api/v1/runs", json!({ "config": {} })).await;

    assert!(response.status().is_client_error());
}

// ---------------------------------------------------------------------------
// Asynchronous submission and the per-run views
// ---------------------------------------------------------------------------

#[tokio::test]
async fn async_submission_exposes_run_views() {
    let test = common::build_test_app(true, None).await;
    let response = post_json(&test.app, "/api/v1/runs", local_run("ledger")).await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    let run_id = json["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(json["data"]["name"], "ledger");

    let run = wait_for_terminal(&test.app, &run_id).await;
    assert_eq!(run["status"], "COMPLETED");

    let stages = body_json(get(&test.app, &format!("/api/v1/runs/{run_id}/stages")).await).await;
    let stages = stages["data"].as_array().unwrap();
    let names: Vec<_> = stages.iter().map(|s| s["stage"].as_str().unwrap()).collect();
    assert_eq!(names, ["ANALYZE", "PLAN", "GENERATE", "VALIDATE", "DEPLOY"]);

    let calls =
        body_json(get(&test.app, &format!("/api/v1/runs/{run_id}/tool-calls")).await).await;
    let providers: Vec<_> = calls["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["provider"].as_str().unwrap())
        .collect();
    assert!(providers.contains(&"code-analyzer"));
    assert!(providers.contains(&"schema-generator"));

    let quality = body_json(get(&test.app, &format!("/api/v1/runs/{run_id}/quality")).await).await;
    assert_eq!(quality["data"]["score"], 100);

    let progress =
        body_json(get(&test.app, &format!("/api/v1/runs/{run_id}/progress")).await).await;
    assert_eq!(progress["data"]["latest"]["progress"], 100);
    assert!(!progress["data"]["history"].as_array().unwrap().is_empty());

    let hooks = body_json(get(&test.app, &format!("/api/v1/runs/{run_id}/hooks")).await).await;
    assert!(hooks["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn list_runs_respects_limit() {
    let test = common::build_test_app(true, None).await;
    for name in ["one", "two", "three"] {
        let response = post_json(&test.app, "/api/v1/runs?wait=true", local_run(name)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let all = body_json(get(&test.app, "/api/v1/runs").await).await;
    assert_eq!(all["data"].as_array().unwrap().len(), 3);

    let limited = body_json(get(&test.app, "/api/v1/runs?limit=2").await).await;
    assert_eq!(limited["data"].as_array().unwrap().len(), 2);
}

// ---------------------------------------------------------------------------
// Lookup errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_run_returns_404() {
    let test = common::build_test_app(true, None).await;
    let response = get(
        &test.app,
        "/api/v1/runs/00000000-0000-0000-0000-000000000000",
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

#[tokio::test]
async fn invalid_run_id_returns_400() {
    let test = common::build_test_app(true, None).await;
    let response = get(&test.app, "/api/v1/runs/not-a-uuid/stages").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancelling_finished_run_conflicts() {
    let test = common::build_test_app(true, None).await;
    let json = body_json(post_json(&test.app, "/api/v1/runs?wait=true", local_run("ledger")).await).await;
    let run_id = json["data"]["run"]["id"].as_str().unwrap().to_string();

    let response = post_json(
        &test.app,
        &format!("/api/v1/runs/{run_id}/cancel"),
        json!({}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CONFLICT");
}

#[tokio::test]
async fn cancelling_unknown_run_returns_404() {
    let test = common::build_test_app(true, None).await;
    let response = post_json(
        &test.app,
        "/api/v1/runs/00000000-0000-0000-0000-000000000000/cancel",
        json!({}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
