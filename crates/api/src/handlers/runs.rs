//! Handlers for the `/runs` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use relift_core::config::RunConfig;
use relift_core::records::Run;
use relift_core::types::RunId;
use relift_events::ProgressEvent;

use crate::error::{AppError, AppResult};
use crate::query::{ListParams, SubmitParams};
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /runs`.
#[derive(Debug, Deserialize)]
pub struct SubmitRun {
    pub source: String,
    #[serde(default)]
    pub config: RunConfig,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub run_id: RunId,
    pub cancelled: bool,
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub latest: Option<ProgressEvent>,
    pub history: Vec<ProgressEvent>,
}

/// Fetch a run or fail with 404.
async fn find_run(state: &AppState, run_id: RunId) -> AppResult<Run> {
    state
        .controller
        .gateway()
        .get_run(run_id)
        .await?
        .ok_or_else(|| AppError::run_not_found(run_id))
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/v1/runs
///
/// Without `?wait=true`, returns 202 with the freshly created run while the
/// pipeline continues in the background. With it, blocks until the run is
/// terminal and returns 200 with the full result, or 422 `RUN_FAILED`.
pub async fn submit_run(
    State(state): State<AppState>,
    Query(params): Query<SubmitParams>,
    Json(input): Json<SubmitRun>,
) -> AppResult<impl IntoResponse> {
    if params.wait {
        let result = state.controller.run(&input.source, input.config).await?;
        tracing::info!(run_id = %result.run.id, "Synchronous run completed");
        let body = serde_json::to_value(&result)
            .map_err(|e| AppError::InternalError(format!("serializing run result: {e}")))?;
        return Ok((StatusCode::OK, Json(DataResponse { data: body })));
    }

    let handle = state.controller.submit(input.source, input.config).await?;
    let run = find_run(&state, handle.run_id).await?;
    tracing::info!(run_id = %run.id, name = %run.name, "Run submitted");
    let body = serde_json::to_value(&run)
        .map_err(|e| AppError::InternalError(format!("serializing run: {e}")))?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: body })))
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

/// GET /api/v1/runs
pub async fn list_runs(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<impl IntoResponse> {
    let runs = state.controller.gateway().list_runs(params.limit()).await?;
    Ok(Json(DataResponse { data: runs }))
}

/// GET /api/v1/runs/{id}
pub async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<RunId>,
) -> AppResult<impl IntoResponse> {
    let run = find_run(&state, run_id).await?;
    Ok(Json(DataResponse { data: run }))
}

/// GET /api/v1/runs/{id}/stages
pub async fn list_stage_logs(
    State(state): State<AppState>,
    Path(run_id): Path<RunId>,
) -> AppResult<impl IntoResponse> {
    find_run(&state, run_id).await?;
    let logs = state.controller.gateway().stage_logs(run_id).await?;
    Ok(Json(DataResponse { data: logs }))
}

/// GET /api/v1/runs/{id}/tool-calls
pub async fn list_tool_calls(
    State(state): State<AppState>,
    Path(run_id): Path<RunId>,
) -> AppResult<impl IntoResponse> {
    find_run(&state, run_id).await?;
    let calls = state.controller.gateway().tool_call_logs(run_id).await?;
    Ok(Json(DataResponse { data: calls }))
}

/// GET /api/v1/runs/{id}/hooks
pub async fn list_hook_executions(
    State(state): State<AppState>,
    Path(run_id): Path<RunId>,
) -> AppResult<impl IntoResponse> {
    find_run(&state, run_id).await?;
    let executions = state
        .controller
        .gateway()
        .hook_executions(Some(run_id))
        .await?;
    Ok(Json(DataResponse { data: executions }))
}

/// GET /api/v1/runs/{id}/quality
///
/// 404 until VALIDATE has produced a report.
pub async fn get_quality_report(
    State(state): State<AppState>,
    Path(run_id): Path<RunId>,
) -> AppResult<impl IntoResponse> {
    find_run(&state, run_id).await?;
    let report = state
        .controller
        .gateway()
        .quality_report(run_id)
        .await?
        .ok_or(AppError::Core(relift_core::error::CoreError::NotFound {
            entity: "QualityReport",
            id: run_id,
        }))?;
    Ok(Json(DataResponse { data: report }))
}

/// GET /api/v1/runs/{id}/progress
///
/// Polling view of the progress stream. History is kept in memory for
/// recent runs only.
pub async fn get_progress(
    State(state): State<AppState>,
    Path(run_id): Path<RunId>,
) -> AppResult<impl IntoResponse> {
    find_run(&state, run_id).await?;
    let progress = state.controller.progress();
    Ok(Json(DataResponse {
        data: ProgressResponse {
            latest: progress.latest(run_id),
            history: progress.history(run_id),
        },
    }))
}

// ---------------------------------------------------------------------------
// Cancel
// ---------------------------------------------------------------------------

/// POST /api/v1/runs/{id}/cancel
///
/// 202 when the run was in flight; 409 if it already finished.
pub async fn cancel_run(
    State(state): State<AppState>,
    Path(run_id): Path<RunId>,
) -> AppResult<impl IntoResponse> {
    let run = find_run(&state, run_id).await?;
    if !state.controller.cancel(run_id) {
        return Err(AppError::Conflict(format!(
            "Run {run_id} is not in progress (status {})",
            run.status
        )));
    }
    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: CancelResponse {
                run_id,
                cancelled: true,
            },
        }),
    ))
}
