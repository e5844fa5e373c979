use sqlx::FromRow;

use relift_core::records::ToolCallLog;
use relift_core::types::{DbId, RunId, Timestamp};

/// A row from the `tool_call_logs` table. Maps one-to-one onto [`ToolCallLog`].
#[derive(Debug, Clone, FromRow)]
pub struct ToolCallLogRow {
    pub id: DbId,
    pub run_id: Option<RunId>,
    pub provider: String,
    pub operation: String,
    pub params: serde_json::Value,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub attempts: i32,
    pub duration_ms: i64,
    pub created_at: Timestamp,
}

impl From<ToolCallLogRow> for ToolCallLog {
    fn from(row: ToolCallLogRow) -> Self {
        ToolCallLog {
            id: row.id,
            run_id: row.run_id,
            provider: row.provider,
            operation: row.operation,
            params: row.params,
            result: row.result,
            error: row.error,
            attempts: row.attempts,
            duration_ms: row.duration_ms,
            created_at: row.created_at,
        }
    }
}
