//! Persisted record types and their create/update DTOs.
//!
//! The persistence gateway stores these shapes verbatim; opaque summary
//! fields are plain JSON values.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::status::{HookStatus, RunStatus, Stage, StageStatus};
use crate::types::{new_run_id, DbId, RunId, Timestamp};

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// One execution of the pipeline for one source artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub name: String,
    pub description: Option<String>,
    pub status: RunStatus,
    /// Detected functional module tag (e.g. `"SD"`).
    pub module: Option<String>,
    /// Analyzer complexity, 1-10.
    pub complexity_score: Option<i32>,
    /// Validation quality score, 0-100.
    pub quality_score: Option<i32>,
    pub source_line_count: i64,
    pub transformed_line_count: Option<i64>,
    /// Human-readable reason, always set when `status == FAILED`.
    pub failure_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for creating a run in the `UPLOADED` state.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRun {
    pub name: String,
    pub description: Option<String>,
    pub source_line_count: i64,
}

impl Run {
    /// Build a fresh `UPLOADED` run with a newly allocated id.
    pub fn new(input: NewRun) -> Self {
        let now = Utc::now();
        Self {
            id: new_run_id(),
            name: input.name,
            description: input.description,
            status: RunStatus::Uploaded,
            module: None,
            complexity_score: None,
            quality_score: None,
            source_line_count: input.source_line_count,
            transformed_line_count: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a metrics patch; `None` fields leave the current value alone.
    pub fn apply_metrics(&mut self, metrics: &RunMetrics) {
        if let Some(module) = &metrics.module {
            self.module = Some(module.clone());
        }
        if let Some(score) = metrics.complexity_score {
            self.complexity_score = Some(score);
        }
        if let Some(score) = metrics.quality_score {
            self.quality_score = Some(score);
        }
        if let Some(lines) = metrics.transformed_line_count {
            self.transformed_line_count = Some(lines);
        }
        self.updated_at = Utc::now();
    }
}

/// Partial update of a run's derived attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub module: Option<String>,
    pub complexity_score: Option<i32>,
    pub quality_score: Option<i32>,
    pub transformed_line_count: Option<i64>,
}

// ---------------------------------------------------------------------------
// StageLog
// ---------------------------------------------------------------------------

/// One record per stage execution attempt.
///
/// Created as `STARTED` and finalised exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageLog {
    pub id: DbId,
    pub run_id: RunId,
    pub stage: Stage,
    pub status: StageStatus,
    pub duration_ms: Option<i64>,
    pub input_summary: serde_json::Value,
    pub output_summary: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

/// Input for opening a stage log at stage start.
#[derive(Debug, Clone)]
pub struct NewStageLog {
    pub run_id: RunId,
    pub stage: Stage,
    pub input_summary: serde_json::Value,
}

/// Terminal update applied to an open stage log.
#[derive(Debug, Clone)]
pub struct StageLogOutcome {
    pub status: StageStatus,
    pub duration_ms: i64,
    pub output_summary: Option<serde_json::Value>,
    pub error_message: Option<String>,
}

// ---------------------------------------------------------------------------
// ToolCallLog
// ---------------------------------------------------------------------------

/// One record per logical external-tool call.
///
/// Retries are folded in: `attempts` counts them and `duration_ms` is
/// the sum across every attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallLog {
    pub id: DbId,
    /// `None` for process-wide calls (e.g. hooks on provider events).
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

/// Input for appending a tool call log.
#[derive(Debug, Clone)]
pub struct NewToolCallLog {
    pub run_id: Option<RunId>,
    pub provider: String,
    pub operation: String,
    pub params: serde_json::Value,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub attempts: i32,
    pub duration_ms: i64,
}

// ---------------------------------------------------------------------------
// HookExecution
// ---------------------------------------------------------------------------

/// One record per fired hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookExecution {
    pub id: DbId,
    pub run_id: Option<RunId>,
    pub hook_id: String,
    pub event: String,
    pub status: HookStatus,
    /// Per-action output lines captured during execution.
    pub log: serde_json::Value,
    pub error: Option<String>,
    pub duration_ms: i64,
    pub created_at: Timestamp,
}

/// Input for appending a hook execution record.
#[derive(Debug, Clone)]
pub struct NewHookExecution {
    pub run_id: Option<RunId>,
    pub hook_id: String,
    pub event: String,
    pub status: HookStatus,
    pub log: serde_json::Value,
    pub error: Option<String>,
    pub duration_ms: i64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
