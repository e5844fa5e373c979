use std::path::PathBuf;
use std::sync::Arc;

use relift_pipeline::PipelineController;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything behind an `Arc`. Gateway, tool manager,
/// hook dispatcher and progress channel are reached through the controller.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub controller: Arc<PipelineController>,
    /// Hook registry file, for `POST /hooks/reload`.
    pub hooks_path: Option<Arc<PathBuf>>,
}
