//! Everything a stage executor may touch.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde_json::json;

use relift_core::config::RunConfig;
use relift_core::providers::{BUILD_TOOL, OP_BUILD, OP_INIT_PROJECT};
use relift_core::records::NewToolCallLog;
use relift_core::sanitize::sanitize;
use relift_core::status::Stage;
use relift_core::types::RunId;
use relift_db::SharedGateway;
use relift_events::{ProgressChannel, ProgressEvent, ProgressStatus};
use relift_tools::{
    BuildOutput, BuildTool, BuildToolError, ToolCall, ToolConnectionManager, ToolError,
};

/// Default root of per-run work areas.
pub const DEFAULT_WORK_DIR: &str = "./relift-work";

/// Repository owner used when the source-control host does not report one.
pub const DEFAULT_REPOSITORY_OWNER: &str = "relift";

/// Process-wide pipeline settings.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Generated projects are written to `<work_dir>/<run_id>/`.
    pub work_dir: PathBuf,
    pub repository_owner: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            repository_owner: DEFAULT_REPOSITORY_OWNER.to_string(),
        }
    }
}

/// Per-run handle passed to every stage executor.
///
/// Executors never see provider connections, only [`StageContext::call`].
#[derive(Clone)]
pub struct StageContext {
    pub run_id: RunId,
    pub run_name: String,
    pub config: RunConfig,
    pub(crate) tools: Arc<ToolConnectionManager>,
    pub(crate) build_tool: Arc<dyn BuildTool>,
    pub(crate) gateway: SharedGateway,
    pub(crate) progress: Arc<ProgressChannel>,
    pub(crate) settings: Arc<PipelineSettings>,
}

impl StageContext {
    /// Invoke a provider operation on behalf of this run.
    pub async fn call(
        &self,
        provider: &str,
        operation: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let call = ToolCall::new(provider, operation, params).for_run(Some(self.run_id));
        self.tools.invoke(call).await
    }

    /// Publish a sub-progress point inside `stage`.
    pub fn report(&self, stage: Stage, percent: u8, message: impl Into<String>) {
        self.progress.publish(ProgressEvent::stage(
            self.run_id,
            stage,
            ProgressStatus::Running,
            message,
            percent,
        ));
    }

    /// Scaffold a project skeleton in `dir` with the build tool.
    pub async fn init_project(&self, dir: &Path) -> Result<BuildOutput, BuildToolError> {
        let started = Instant::now();
        let result = self.build_tool.init_project(dir, &self.run_name).await;
        self.record_build(OP_INIT_PROJECT, dir, started, &result).await;
        result
    }

    /// Build the project in `dir` with the build tool.
    pub async fn build_project(&self, dir: &Path) -> Result<BuildOutput, BuildToolError> {
        let started = Instant::now();
        let result = self.build_tool.build(dir).await;
        self.record_build(OP_BUILD, dir, started, &result).await;
        result
    }

    /// One tool call log per build-tool invocation. A non-zero exit is a
    /// completed call; only a process that could not run is an error.
    async fn record_build(
        &self,
        operation: &str,
        dir: &Path,
        started: Instant,
        result: &Result<BuildOutput, BuildToolError>,
    ) {
        let (output, error) = match result {
            Ok(out) => (
                Some(sanitize(&json!({
                    "exit_code": out.exit_code,
                    "output": out.combined(),
                }))),
                None,
            ),
            Err(e) => (None, Some(e.to_string())),
        };
        let log = NewToolCallLog {
            run_id: Some(self.run_id),
            provider: BUILD_TOOL.to_string(),
            operation: operation.to_string(),
            params: json!({ "dir": dir.display().to_string() }),
            result: output,
            error,
            attempts: 1,
            duration_ms: i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX),
        };
        if let Err(e) = self.gateway.append_tool_call_log(log).await {
            tracing::error!(
                run_id = %self.run_id,
                operation,
                error = %e,
                "Failed to record build tool call",
            );
        }
    }

    pub fn gateway(&self) -> &SharedGateway {
        &self.gateway
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Work area for this run's generated project.
    pub fn project_dir(&self) -> PathBuf {
        self.settings.work_dir.join(self.run_id.to_string())
    }
}
