use sqlx::FromRow;

use relift_core::records::StageLog;
use relift_core::status::{Stage, StageStatus};
use relift_core::types::{DbId, RunId, Timestamp};

use crate::error::GatewayError;

/// A row from the `stage_logs` table.
#[derive(Debug, Clone, FromRow)]
pub struct StageLogRow {
    pub id: DbId,
    pub run_id: RunId,
    pub stage: String,
    pub status: String,
    pub duration_ms: Option<i64>,
    pub input_summary: serde_json::Value,
    pub output_summary: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

impl TryFrom<StageLogRow> for StageLog {
    type Error = GatewayError;

    fn try_from(row: StageLogRow) -> Result<Self, Self::Error> {
        Ok(StageLog {
            id: row.id,
            run_id: row.run_id,
            stage: Stage::from_str(&row.stage)?,
            status: StageStatus::from_str(&row.status)?,
            duration_ms: row.duration_ms,
            input_summary: row.input_summary,
            output_summary: row.output_summary,
            error_message: row.error_message,
            created_at: row.created_at,
            finished_at: row.finished_at,
        })
    }
}
