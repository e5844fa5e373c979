//! Repository for the `tool_call_logs` table.

use sqlx::PgPool;

use relift_core::records::NewToolCallLog;
use relift_core::types::RunId;

use crate::models::tool_call_log::ToolCallLogRow;

const COLUMNS: &str = "id, run_id, provider, operation, params, result, error, \
    attempts, duration_ms, created_at";

pub struct ToolCallLogRepo;

impl ToolCallLogRepo {
    pub async fn create(pool: &PgPool, input: &NewToolCallLog) -> Result<ToolCallLogRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO tool_call_logs
                (run_id, provider, operation, params, result, error, attempts, duration_ms)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ToolCallLogRow>(&query)
            .bind(input.run_id)
            .bind(&input.provider)
            .bind(&input.operation)
            .bind(&input.params)
            .bind(&input.result)
            .bind(&input.error)
            .bind(input.attempts)
            .bind(input.duration_ms)
            .fetch_one(pool)
            .await
    }

    /// Calls for a run, oldest first.
    pub async fn list_for_run(
        pool: &PgPool,
        run_id: RunId,
    ) -> Result<Vec<ToolCallLogRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tool_call_logs WHERE run_id = $1 ORDER BY id ASC");
        sqlx::query_as::<_, ToolCallLogRow>(&query)
            .bind(run_id)
            .fetch_all(pool)
            .await
    }
}
