//! Repository for the `quality_reports` table. One row per run.

use sqlx::PgPool;

use relift_core::quality::QualityReport;
use relift_core::types::RunId;

use crate::models::quality_report::QualityReportRow;

const COLUMNS: &str = "run_id, score, passed, syntax_valid, structure_valid, \
    domain_compliant, logic_preserved, error_count, warning_count, issues, \
    recommendations, created_at";

pub struct QualityReportRepo;

impl QualityReportRepo {
    /// Insert the report. Returns `false` if one already exists for the run.
    pub async fn create(pool: &PgPool, report: &QualityReport) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO quality_reports
                (run_id, score, passed, syntax_valid, structure_valid, domain_compliant,
                 logic_preserved, error_count, warning_count, issues, recommendations, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             ON CONFLICT (run_id) DO NOTHING",
        )
        .bind(report.run_id)
        .bind(report.score)
        .bind(report.passed)
        .bind(report.syntax_valid)
        .bind(report.structure_valid)
        .bind(report.domain_compliant)
        .bind(report.logic_preserved)
        .bind(report.error_count)
        .bind(report.warning_count)
        .bind(serde_json::json!(report.issues))
        .bind(serde_json::json!(report.recommendations))
        .bind(report.created_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn find_for_run(
        pool: &PgPool,
        run_id: RunId,
    ) -> Result<Option<QualityReportRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM quality_reports WHERE run_id = $1");
        sqlx::query_as::<_, QualityReportRow>(&query)
            .bind(run_id)
            .fetch_optional(pool)
            .await
    }
}
