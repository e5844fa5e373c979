//! Repository for the `hook_executions` table.

use sqlx::PgPool;

use relift_core::records::NewHookExecution;
use relift_core::types::RunId;

use crate::models::hook_execution::HookExecutionRow;

const COLUMNS: &str = "id, run_id, hook_id, event, status, log, error, duration_ms, created_at";

pub struct HookExecutionRepo;

impl HookExecutionRepo {
    pub async fn create(
        pool: &PgPool,
        input: &NewHookExecution,
    ) -> Result<HookExecutionRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO hook_executions
                (run_id, hook_id, event, status, log, error, duration_ms)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, HookExecutionRow>(&query)
            .bind(input.run_id)
            .bind(&input.hook_id)
            .bind(&input.event)
            .bind(input.status.as_str())
            .bind(&input.log)
            .bind(&input.error)
            .bind(input.duration_ms)
            .fetch_one(pool)
            .await
    }

    /// Executions for a run, oldest first.
    pub async fn list_for_run(
        pool: &PgPool,
        run_id: RunId,
    ) -> Result<Vec<HookExecutionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM hook_executions WHERE run_id = $1 ORDER BY id ASC");
        sqlx::query_as::<_, HookExecutionRow>(&query)
            .bind(run_id)
            .fetch_all(pool)
            .await
    }

    /// Executions not tied to any run (provider lifecycle hooks).
    pub async fn list_process_wide(pool: &PgPool) -> Result<Vec<HookExecutionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM hook_executions WHERE run_id IS NULL ORDER BY id ASC");
        sqlx::query_as::<_, HookExecutionRow>(&query)
            .fetch_all(pool)
            .await
    }
}
