use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use relift_core::error::CoreError;
use relift_core::types::RunId;
use relift_db::GatewayError;
use relift_events::HookError;
use relift_pipeline::PipelineError;

/// Application-level error type for HTTP handlers.
///
/// Produces `{ "error": ..., "code": ... }` JSON bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn run_not_found(run_id: RunId) -> Self {
        Self::Core(CoreError::NotFound {
            entity: "Run",
            id: run_id,
        })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut run_id = None;
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Gateway(err) => classify_gateway_error(err),

            AppError::Pipeline(err) => match err {
                PipelineError::InvalidInput(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                PipelineError::Config(core) => classify_core_error(core),
                PipelineError::Persistence(gateway) => classify_gateway_error(gateway),
                PipelineError::Stage { run_id: id, .. } | PipelineError::Cancelled { run_id: id } => {
                    run_id = Some(*id);
                    (StatusCode::UNPROCESSABLE_ENTITY, "RUN_FAILED", err.to_string())
                }
                PipelineError::Join(msg) => internal(msg),
            },

            AppError::Hook(err) => match err {
                HookError::Config(core) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", core.to_string())
                }
                HookError::Io(io) => (
                    StatusCode::BAD_REQUEST,
                    "BAD_REQUEST",
                    format!("Cannot read hook registry: {io}"),
                ),
                other => internal(&other.to_string()),
            },

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::InternalError(msg) => internal(msg),
        };

        let mut body = json!({
            "error": message,
            "code": code,
        });
        if let Some(id) = run_id {
            body["run_id"] = json!(id);
        }

        (status, axum::Json(body)).into_response()
    }
}

fn classify_core_error(err: &CoreError) -> (StatusCode, &'static str, String) {
    match err {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::InvalidTransition { .. } => {
            (StatusCode::CONFLICT, "CONFLICT", err.to_string())
        }
        CoreError::Internal(msg) => internal(msg),
    }
}

/// Database failures are logged and reported without detail.
fn classify_gateway_error(err: &GatewayError) -> (StatusCode, &'static str, String) {
    match err {
        GatewayError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        GatewayError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        GatewayError::Core(core) => classify_core_error(core),
        GatewayError::Database(_) | GatewayError::Decode(_) => internal(&err.to_string()),
    }
}

fn internal(detail: &str) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %detail, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
