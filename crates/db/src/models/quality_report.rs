use sqlx::FromRow;

use relift_core::quality::QualityReport;
use relift_core::types::{RunId, Timestamp};

use crate::error::GatewayError;

/// A row from the `quality_reports` table. Issue and recommendation
/// lists are JSON arrays of strings.
#[derive(Debug, Clone, FromRow)]
pub struct QualityReportRow {
    pub run_id: RunId,
    pub score: i32,
    pub passed: bool,
    pub syntax_valid: bool,
    pub structure_valid: bool,
    pub domain_compliant: bool,
    pub logic_preserved: bool,
    pub error_count: i32,
    pub warning_count: i32,
    pub issues: serde_json::Value,
    pub recommendations: serde_json::Value,
    pub created_at: Timestamp,
}

impl TryFrom<QualityReportRow> for QualityReport {
    type Error = GatewayError;

    fn try_from(row: QualityReportRow) -> Result<Self, Self::Error> {
        let strings = |v: serde_json::Value, column: &str| {
            serde_json::from_value::<Vec<String>>(v)
                .map_err(|e| GatewayError::Decode(format!("quality_reports.{column}: {e}")))
        };
        Ok(QualityReport {
            run_id: row.run_id,
            score: row.score,
            passed: row.passed,
            syntax_valid: row.syntax_valid,
            structure_valid: row.structure_valid,
            domain_compliant: row.domain_compliant,
            logic_preserved: row.logic_preserved,
            error_count: row.error_count,
            warning_count: row.warning_count,
            issues: strings(row.issues, "issues")?,
            recommendations: strings(row.recommendations, "recommendations")?,
            created_at: row.created_at,
        })
    }
}
