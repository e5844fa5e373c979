use axum::routing::{get, post};
use axum::Router;

use crate::handlers::runs;
use crate::state::AppState;

/// Routes mounted at `/runs`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(runs::list_runs).post(runs::submit_run))
        .route("/{id}", get(runs::get_run))
        .route("/{id}/stages", get(runs::list_stage_logs))
        .route("/{id}/tool-calls", get(runs::list_tool_calls))
        .route("/{id}/hooks", get(runs::list_hook_executions))
        .route("/{id}/quality", get(runs::get_quality_report))
        .route("/{id}/progress", get(runs::get_progress))
        .route("/{id}/cancel", post(runs::cancel_run))
}
