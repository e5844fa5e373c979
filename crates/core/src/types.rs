/// Runs are keyed by a time-ordered UUID (v7) so ids sort by creation.
pub type RunId = uuid::Uuid;

/// Surrogate key for append-only log rows.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Allocate a fresh run identifier.
pub fn new_run_id() -> RunId {
    uuid::Uuid::now_v7()
}
