//! Handlers for hook administration.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub loaded: usize,
}

/// GET /api/v1/hooks
pub async fn list_hooks(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let hooks = state.controller.hooks().definitions().await;
    Ok(Json(DataResponse { data: hooks }))
}

/// POST /api/v1/hooks/reload
///
/// Re-read the registry file. On error the current hooks stay active.
pub async fn reload_hooks(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let path = state.hooks_path.as_ref().ok_or_else(|| {
        AppError::BadRequest("No hook registry file configured (RELIFT_HOOKS)".to_string())
    })?;
    let loaded = state.controller.hooks().reload_from_path(path).await?;
    tracing::info!(loaded, path = %path.display(), "Hook registry reloaded");
    Ok(Json(DataResponse {
        data: ReloadResponse { loaded },
    }))
}

/// GET /api/v1/hooks/executions
///
/// Process-wide executions (provider lifecycle hooks), not tied to a run.
pub async fn list_process_executions(
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let executions = state.controller.gateway().hook_executions(None).await?;
    Ok(Json(DataResponse { data: executions }))
}
