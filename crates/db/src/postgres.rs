//! PostgreSQL [`PersistenceGateway`] built on the repositories.

use async_trait::async_trait;

use relift_core::quality::QualityReport;
use relift_core::records::{
    HookExecution, NewHookExecution, NewRun, NewStageLog, NewToolCallLog, Run, RunMetrics,
    StageLog, StageLogOutcome, ToolCallLog,
};
use relift_core::status::RunStatus;
use relift_core::types::{DbId, RunId};

use crate::error::GatewayError;
use crate::gateway::PersistenceGateway;
use crate::repositories::{
    HookExecutionRepo, QualityReportRepo, RunRepo, StageLogRepo, ToolCallLogRepo,
};
use crate::DbPool;

#[derive(Clone)]
pub struct PgGateway {
    pool: DbPool,
}

impl PgGateway {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    async fn require_run(&self, run_id: RunId) -> Result<Run, GatewayError> {
        RunRepo::find_by_id(&self.pool, run_id)
            .await?
            .ok_or_else(|| GatewayError::run_not_found(run_id))?
            .try_into()
    }
}

#[async_trait]
impl PersistenceGateway for PgGateway {
    async fn create_run(&self, input: NewRun) -> Result<Run, GatewayError> {
        let run = Run::new(input);
        RunRepo::create(&self.pool, &run).await?.try_into()
    }

    async fn update_run_status(
        &self,
        run_id: RunId,
        status: RunStatus,
        failure_reason: Option<String>,
    ) -> Result<Run, GatewayError> {
        let current = self.require_run(run_id).await?;
        let next = current.status.transition_to(status)?;

        let row = RunRepo::update_status(
            &self.pool,
            run_id,
            current.status,
            next,
            failure_reason.as_deref(),
        )
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => Err(GatewayError::Conflict(format!(
                "Run {run_id} changed status concurrently (expected {})",
                current.status
            ))),
        }
    }

    async fn update_run_metrics(
        &self,
        run_id: RunId,
        metrics: RunMetrics,
    ) -> Result<Run, GatewayError> {
        RunRepo::update_metrics(&self.pool, run_id, &metrics)
            .await?
            .ok_or_else(|| GatewayError::run_not_found(run_id))?
            .try_into()
    }

    async fn append_stage_log(&self, input: NewStageLog) -> Result<DbId, GatewayError> {
        Ok(StageLogRepo::create(&self.pool, &input).await?)
    }

    async fn finish_stage_log(
        &self,
        id: DbId,
        outcome: StageLogOutcome,
    ) -> Result<StageLog, GatewayError> {
        match StageLogRepo::finish(&self.pool, id, &outcome).await? {
            Some(row) => row.try_into(),
            None if StageLogRepo::exists(&self.pool, id).await? => Err(GatewayError::Conflict(
                format!("Stage log {id} already finalised"),
            )),
            None => Err(GatewayError::NotFound {
                entity: "StageLog",
                id: id.to_string(),
            }),
        }
    }

    async fn append_tool_call_log(
        &self,
        input: NewToolCallLog,
    ) -> Result<ToolCallLog, GatewayError> {
        Ok(ToolCallLogRepo::create(&self.pool, &input).await?.into())
    }

    async fn create_quality_report(&self, report: QualityReport) -> Result<(), GatewayError> {
        if QualityReportRepo::create(&self.pool, &report).await? {
            Ok(())
        } else {
            Err(GatewayError::Conflict(format!(
                "Quality report for run {} already exists",
                report.run_id
            )))
        }
    }

    async fn append_hook_execution(
        &self,
        input: NewHookExecution,
    ) -> Result<HookExecution, GatewayError> {
        HookExecutionRepo::create(&self.pool, &input).await?.try_into()
    }

    async fn get_run(&self, run_id: RunId) -> Result<Option<Run>, GatewayError> {
        RunRepo::find_by_id(&self.pool, run_id)
            .await?
            .map(Run::try_from)
            .transpose()
    }

    async fn list_runs(&self, limit: i64) -> Result<Vec<Run>, GatewayError> {
        RunRepo::list(&self.pool, limit)
            .await?
            .into_iter()
            .map(Run::try_from)
            .collect()
    }

    async fn stage_logs(&self, run_id: RunId) -> Result<Vec<StageLog>, GatewayError> {
        StageLogRepo::list_for_run(&self.pool, run_id)
            .await?
            .into_iter()
            .map(StageLog::try_from)
            .collect()
    }

    async fn tool_call_logs(&self, run_id: RunId) -> Result<Vec<ToolCallLog>, GatewayError> {
        Ok(ToolCallLogRepo::list_for_run(&self.pool, run_id)
            .await?
            .into_iter()
            .map(ToolCallLog::from)
            .collect())
    }

    async fn quality_report(&self, run_id: RunId) -> Result<Option<QualityReport>, GatewayError> {
        QualityReportRepo::find_for_run(&self.pool, run_id)
            .await?
            .map(QualityReport::try_from)
            .transpose()
    }

    async fn hook_executions(
        &self,
        run_id: Option<RunId>,
    ) -> Result<Vec<HookExecution>, GatewayError> {
        let rows = match run_id {
            Some(id) => HookExecutionRepo::list_for_run(&self.pool, id).await?,
            None => HookExecutionRepo::list_process_wide(&self.pool).await?,
        };
        rows.into_iter().map(HookExecution::try_from).collect()
    }
}
