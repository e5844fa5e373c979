use sqlx::FromRow;

use relift_core::records::HookExecution;
use relift_core::status::HookStatus;
use relift_core::types::{DbId, RunId, Timestamp};

use crate::error::GatewayError;

/// A row from the `hook_executions` table.
#[derive(Debug, Clone, FromRow)]
pub struct HookExecutionRow {
    pub id: DbId,
    pub run_id: Option<RunId>,
    pub hook_id: String,
    pub event: String,
    pub status: String,
    pub log: serde_json::Value,
    pub error: Option<String>,
    pub duration_ms: i64,
    pub created_at: Timestamp,
}

impl TryFrom<HookExecutionRow> for HookExecution {
    type Error = GatewayError;

    fn try_from(row: HookExecutionRow) -> Result<Self, Self::Error> {
        Ok(HookExecution {
            id: row.id,
            run_id: row.run_id,
            hook_id: row.hook_id,
            event: row.event,
            status: HookStatus::from_str(&row.status)?,
            log: row.log,
            error: row.error,
            duration_ms: row.duration_ms,
            created_at: row.created_at,
        })
    }
}
