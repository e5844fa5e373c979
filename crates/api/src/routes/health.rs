use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use relift_tools::manager::ProviderStatus;
use relift_tools::ProviderState;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when a required provider is not connected.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    pub active_runs: usize,
    pub providers: Vec<ProviderStatus>,
}

/// GET /health -- service and tool provider health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let providers = state.controller.tools().health_report().await;
    let degraded = providers.iter().any(|p| {
        p.required
            && (p.state != ProviderState::Connected
                || p.health.as_ref().is_some_and(|h| !h.is_healthy()))
    });

    Json(HealthResponse {
        status: if degraded { "degraded" } else { "ok" },
        version: env!("CARGO_PKG_VERSION"),
        active_runs: state.controller.active_runs().len(),
        providers,
    })
}

/// Mount health check routes (root level, not under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
