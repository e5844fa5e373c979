//! In-process [`PersistenceGateway`] backed by a single lock-guarded store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use relift_core::quality::QualityReport;
use relift_core::records::{
    HookExecution, NewHookExecution, NewRun, NewStageLog, NewToolCallLog, Run, RunMetrics,
    StageLog, StageLogOutcome, ToolCallLog,
};
use relift_core::status::{RunStatus, StageStatus};
use relift_core::types::{DbId, RunId};

use crate::error::GatewayError;
use crate::gateway::PersistenceGateway;

#[derive(Default)]
struct Store {
    runs: HashMap<RunId, Run>,
    stage_logs: Vec<StageLog>,
    tool_calls: Vec<ToolCallLog>,
    reports: HashMap<RunId, QualityReport>,
    hooks: Vec<HookExecution>,
    next_id: DbId,
}

impl Store {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn run_mut(&mut self, run_id: RunId) -> Result<&mut Run, GatewayError> {
        self.runs
            .get_mut(&run_id)
            .ok_or_else(|| GatewayError::run_not_found(run_id))
    }
}

/// Memory-resident gateway. Data lives as long as the value.
#[derive(Default)]
pub struct MemoryGateway {
    store: RwLock<Store>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn create_run(&self, input: NewRun) -> Result<Run, GatewayError> {
        let run = Run::new(input);
        let mut store = self.store.write().await;
        store.runs.insert(run.id, run.clone());
        Ok(run)
    }

    async fn update_run_status(
        &self,
        run_id: RunId,
        status: RunStatus,
        failure_reason: Option<String>,
    ) -> Result<Run, GatewayError> {
        let mut store = self.store.write().await;
        let run = store.run_mut(run_id)?;
        run.status = run.status.transition_to(status)?;
        if failure_reason.is_some() {
            run.failure_reason = failure_reason;
        }
        run.updated_at = Utc::now();
        Ok(run.clone())
    }

    async fn update_run_metrics(
        &self,
        run_id: RunId,
        metrics: RunMetrics,
    ) -> Result<Run, GatewayError> {
        let mut store = self.store.write().await;
        let run = store.run_mut(run_id)?;
        run.apply_metrics(&metrics);
        Ok(run.clone())
    }

    async fn append_stage_log(&self, input: NewStageLog) -> Result<DbId, GatewayError> {
        let mut store = self.store.write().await;
        if !store.runs.contains_key(&input.run_id) {
            return Err(GatewayError::run_not_found(input.run_id));
        }
        let id = store.next_id();
        store.stage_logs.push(StageLog {
            id,
            run_id: input.run_id,
            stage: input.stage,
            status: StageStatus::Started,
            duration_ms: None,
            input_summary: input.input_summary,
            output_summary: None,
            error_message: None,
            created_at: Utc::now(),
            finished_at: None,
        });
        Ok(id)
    }

    async fn finish_stage_log(
        &self,
        id: DbId,
        outcome: StageLogOutcome,
    ) -> Result<StageLog, GatewayError> {
        let mut store = self.store.write().await;
        let log = store
            .stage_logs
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| GatewayError::NotFound {
                entity: "StageLog",
                id: id.to_string(),
            })?;
        if log.status != StageStatus::Started {
            return Err(GatewayError::Conflict(format!(
                "Stage log {id} already finalised as {}",
                log.status
            )));
        }
        log.status = outcome.status;
        log.duration_ms = Some(outcome.duration_ms);
        log.output_summary = outcome.output_summary;
        log.error_message = outcome.error_message;
        log.finished_at = Some(Utc::now());
        Ok(log.clone())
    }

    async fn append_tool_call_log(
        &self,
        input: NewToolCallLog,
    ) -> Result<ToolCallLog, GatewayError> {
        let mut store = self.store.write().await;
        let log = ToolCallLog {
            id: store.next_id(),
            run_id: input.run_id,
            provider: input.provider,
            operation: input.operation,
            params: input.params,
            result: input.result,
            error: input.error,
            attempts: input.attempts,
            duration_ms: input.duration_ms,
            created_at: Utc::now(),
        };
        store.tool_calls.push(log.clone());
        Ok(log)
    }

    async fn create_quality_report(&self, report: QualityReport) -> Result<(), GatewayError> {
        let mut store = self.store.write().await;
        if store.reports.contains_key(&report.run_id) {
            return Err(GatewayError::Conflict(format!(
                "Quality report for run {} already exists",
                report.run_id
            )));
        }
        store.reports.insert(report.run_id, report);
        Ok(())
    }

    async fn append_hook_execution(
        &self,
        input: NewHookExecution,
    ) -> Result<HookExecution, GatewayError> {
        let mut store = self.store.write().await;
        let record = HookExecution {
            id: store.next_id(),
            run_id: input.run_id,
            hook_id: input.hook_id,
            event: input.event,
            status: input.status,
            log: input.log,
            error: input.error,
            duration_ms: input.duration_ms,
            created_at: Utc::now(),
        };
        store.hooks.push(record.clone());
        Ok(record)
    }

    async fn get_run(&self, run_id: RunId) -> Result<Option<Run>, GatewayError> {
        Ok(self.store.read().await.runs.get(&run_id).cloned())
    }

    async fn list_runs(&self, limit: i64) -> Result<Vec<Run>, GatewayError> {
        let store = self.store.read().await;
        let mut runs: Vec<Run> = store.runs.values().cloned().collect();
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        runs.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(runs)
    }

    async fn stage_logs(&self, run_id: RunId) -> Result<Vec<StageLog>, GatewayError> {
        let store = self.store.read().await;
        Ok(store
            .stage_logs
            .iter()
            .filter(|l| l.run_id == run_id)
            .cloned()
            .collect())
    }

    async fn tool_call_logs(&self, run_id: RunId) -> Result<Vec<ToolCallLog>, GatewayError> {
        let store = self.store.read().await;
        Ok(store
            .tool_calls
            .iter()
            .filter(|l| l.run_id == Some(run_id))
            .cloned()
            .collect())
    }

    async fn quality_report(&self, run_id: RunId) -> Result<Option<QualityReport>, GatewayError> {
        Ok(self.store.read().await.reports.get(&run_id).cloned())
    }

    async fn hook_executions(
        &self,
        run_id: Option<RunId>,
    ) -> Result<Vec<HookExecution>, GatewayError> {
        let store = self.store.read().await;
        Ok(store
            .hooks
            .iter()
            .filter(|h| h.run_id == run_id)
            .cloned()
            .collect())
    }
}
