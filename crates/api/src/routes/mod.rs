pub mod health;
pub mod hooks;
pub mod runs;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /runs                                  submit (?wait=true), list
/// /runs/{id}                             get
/// /runs/{id}/stages                      stage logs
/// /runs/{id}/tool-calls                  tool call logs
/// /runs/{id}/hooks                       hook executions
/// /runs/{id}/quality                     quality report
/// /runs/{id}/progress                    progress history
/// /runs/{id}/cancel                      cancel (POST)
///
/// /hooks                                 registered hooks
/// /hooks/reload                          reload registry (POST)
/// /hooks/executions                      process-wide executions
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/runs", runs::router())
        .nest("/hooks", hooks::router())
}
