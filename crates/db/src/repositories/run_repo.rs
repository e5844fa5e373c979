//! Repository for the `runs` table.

use sqlx::PgPool;

use relift_core::records::{Run, RunMetrics};
use relift_core::status::RunStatus;
use relift_core::types::RunId;

use crate::models::run::RunRow;

/// Column list for runs queries.
const COLUMNS: &str = "id, name, description, status, module, complexity_score, \
    quality_score, source_line_count, transformed_line_count, failure_reason, \
    created_at, updated_at";

pub struct RunRepo;

impl RunRepo {
    /// Insert a freshly built run.
    pub async fn create(pool: &PgPool, run: &Run) -> Result<RunRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO runs
                (id, name, description, status, source_line_count, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RunRow>(&query)
            .bind(run.id)
            .bind(&run.name)
            .bind(&run.description)
            .bind(run.status.as_str())
            .bind(run.source_line_count)
            .bind(run.created_at)
            .bind(run.updated_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: RunId) -> Result<Option<RunRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM runs WHERE id = $1");
        sqlx::query_as::<_, RunRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Newest first.
    pub async fn list(pool: &PgPool, limit: i64) -> Result<Vec<RunRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM runs ORDER BY created_at DESC, id DESC LIMIT $1");
        sqlx::query_as::<_, RunRow>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Compare-and-set the status. Returns `None` when the row is gone or
    /// its status no longer equals `expected`.
    pub async fn update_status(
        pool: &PgPool,
        id: RunId,
        expected: RunStatus,
        next: RunStatus,
        failure_reason: Option<&str>,
    ) -> Result<Option<RunRow>, sqlx::Error> {
        let query = format!(
            "UPDATE runs
             SET status = $3,
                 failure_reason = COALESCE($4, failure_reason),
                 updated_at = now()
             WHERE id = $1 AND status = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RunRow>(&query)
            .bind(id)
            .bind(expected.as_str())
            .bind(next.as_str())
            .bind(failure_reason)
            .fetch_optional(pool)
            .await
    }

    /// Patch derived attributes; `None` fields keep their value.
    pub async fn update_metrics(
        pool: &PgPool,
        id: RunId,
        metrics: &RunMetrics,
    ) -> Result<Option<RunRow>, sqlx::Error> {
        let query = format!(
            "UPDATE runs
             SET module = COALESCE($2, module),
                 complexity_score = COALESCE($3, complexity_score),
                 quality_score = COALESCE($4, quality_score),
                 transformed_line_count = COALESCE($5, transformed_line_count),
                 updated_at = now()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RunRow>(&query)
            .bind(id)
            .bind(&metrics.module)
            .bind(metrics.complexity_score)
            .bind(metrics.quality_score)
            .bind(metrics.transformed_line_count)
            .fetch_optional(pool)
            .await
    }
}
