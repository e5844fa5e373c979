//! The persistence seam shared by every writer in the orchestrator.
//!
//! Each write is independent and atomic per record. Runs are keyed by
//! [`RunId`]; log rows get a surrogate [`DbId`] on append.

use std::sync::Arc;

use async_trait::async_trait;
use relift_core::quality::QualityReport;
use relift_core::records::{
    HookExecution, NewHookExecution, NewRun, NewStageLog, NewToolCallLog, Run, RunMetrics,
    StageLog, StageLogOutcome, ToolCallLog,
};
use relift_core::status::RunStatus;
use relift_core::types::{DbId, RunId};

use crate::error::GatewayError;

pub type SharedGateway = Arc<dyn PersistenceGateway>;

#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    // -- writes --

    /// Insert a new run in `UPLOADED`.
    async fn create_run(&self, input: NewRun) -> Result<Run, GatewayError>;

    /// Move a run to `status`. Rejects regressions and exits from
    /// terminal states. `failure_reason` is stored when present.
    async fn update_run_status(
        &self,
        run_id: RunId,
        status: RunStatus,
        failure_reason: Option<String>,
    ) -> Result<Run, GatewayError>;

    /// Patch the derived attributes of a run.
    async fn update_run_metrics(
        &self,
        run_id: RunId,
        metrics: RunMetrics,
    ) -> Result<Run, GatewayError>;

    /// Open a `STARTED` stage log; returns its id.
    async fn append_stage_log(&self, input: NewStageLog) -> Result<DbId, GatewayError>;

    /// Finalise an open stage log. A log can be finalised only once.
    async fn finish_stage_log(
        &self,
        id: DbId,
        outcome: StageLogOutcome,
    ) -> Result<StageLog, GatewayError>;

    async fn append_tool_call_log(&self, input: NewToolCallLog)
        -> Result<ToolCallLog, GatewayError>;

    /// Store a run's quality report. At most one per run.
    async fn create_quality_report(&self, report: QualityReport) -> Result<(), GatewayError>;

    async fn append_hook_execution(
        &self,
        input: NewHookExecution,
    ) -> Result<HookExecution, GatewayError>;

    // -- reads --

    async fn get_run(&self, run_id: RunId) -> Result<Option<Run>, GatewayError>;

    /// Most recent runs first.
    async fn list_runs(&self, limit: i64) -> Result<Vec<Run>, GatewayError>;

    /// Stage logs in insertion order.
    async fn stage_logs(&self, run_id: RunId) -> Result<Vec<StageLog>, GatewayError>;

    async fn tool_call_logs(&self, run_id: RunId) -> Result<Vec<ToolCallLog>, GatewayError>;

    async fn quality_report(&self, run_id: RunId) -> Result<Option<QualityReport>, GatewayError>;

    /// Hook executions for a run, or process-wide ones when `run_id` is `None`.
    async fn hook_executions(
        &self,
        run_id: Option<RunId>,
    ) -> Result<Vec<HookExecution>, GatewayError>;
}
