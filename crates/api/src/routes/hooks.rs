use axum::routing::{get, post};
use axum::Router;

use crate::handlers::hooks;
use crate::state::AppState;

/// Routes mounted at `/hooks`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(hooks::list_hooks))
        .route("/reload", post(hooks::reload_hooks))
        .route("/executions", get(hooks::list_process_executions))
}
