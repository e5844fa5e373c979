//! Repository for the `stage_logs` table.

use sqlx::PgPool;

use relift_core::records::{NewStageLog, StageLogOutcome};
use relift_core::status::StageStatus;
use relift_core::types::{DbId, RunId};

use crate::models::stage_log::StageLogRow;

const COLUMNS: &str = "id, run_id, stage, status, duration_ms, input_summary, \
    output_summary, error_message, created_at, finished_at";

pub struct StageLogRepo;

impl StageLogRepo {
    /// Open a `STARTED` log and return its id.
    pub async fn create(pool: &PgPool, input: &NewStageLog) -> Result<DbId, sqlx::Error> {
        let row: (DbId,) = sqlx::query_as(
            "INSERT INTO stage_logs (run_id, stage, status, input_summary)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(input.run_id)
        .bind(input.stage.as_str())
        .bind(StageStatus::Started.as_str())
        .bind(&input.input_summary)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Finalise a log still in `STARTED`. Returns `None` if the log does
    /// not exist or was already finalised.
    pub async fn finish(
        pool: &PgPool,
        id: DbId,
        outcome: &StageLogOutcome,
    ) -> Result<Option<StageLogRow>, sqlx::Error> {
        let query = format!(
            "UPDATE stage_logs
             SET status = $2, duration_ms = $3, output_summary = $4,
                 error_message = $5, finished_at = now()
             WHERE id = $1 AND status = '{started}'
             RETURNING {COLUMNS}",
            started = StageStatus::Started.as_str()
        );
        sqlx::query_as::<_, StageLogRow>(&query)
            .bind(id)
            .bind(outcome.status.as_str())
            .bind(outcome.duration_ms)
            .bind(&outcome.output_summary)
            .bind(&outcome.error_message)
            .fetch_optional(pool)
            .await
    }

    pub async fn exists(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let row: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM stage_logs WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }

    /// Logs for a run in insertion order.
    pub async fn list_for_run(pool: &PgPool, run_id: RunId) -> Result<Vec<StageLogRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM stage_logs WHERE run_id = $1 ORDER BY id ASC");
        sqlx::query_as::<_, StageLogRow>(&query)
            .bind(run_id)
            .fetch_all(pool)
            .await
    }
}
