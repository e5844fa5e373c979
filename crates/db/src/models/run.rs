use sqlx::FromRow;

use relift_core::records::Run;
use relift_core::status::RunStatus;
use relift_core::types::{RunId, Timestamp};

use crate::error::GatewayError;

/// A row from the `runs` table.
#[derive(Debug, Clone, FromRow)]
pub struct RunRow {
    pub id: RunId,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub module: Option<String>,
    pub complexity_score: Option<i32>,
    pub quality_score: Option<i32>,
    pub source_line_count: i64,
    pub transformed_line_count: Option<i64>,
    pub failure_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<RunRow> for Run {
    type Error = GatewayError;

    fn try_from(row: RunRow) -> Result<Self, Self::Error> {
        Ok(Run {
            id: row.id,
            name: row.name,
            description: row.description,
            status: RunStatus::from_str(&row.status)?,
            module: row.module,
            complexity_score: row.complexity_score,
            quality_score: row.quality_score,
            source_line_count: row.source_line_count,
            transformed_line_count: row.transformed_line_count,
            failure_reason: row.failure_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
