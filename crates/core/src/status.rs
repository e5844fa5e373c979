//! Lifecycle enums for runs, stages, and hook executions.
//!
//! Wire strings are upper-case (`"ANALYZING"`, `"COMPLETED"`) and match
//! the values stored by the persistence gateway.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// RunStatus
// ---------------------------------------------------------------------------

/// Position of a run in the pipeline state machine.
///
/// ```text
/// UPLOADED -> ANALYZING -> PLANNING -> GENERATING -> VALIDATING -> DEPLOYING -> COMPLETED
///        \__________\___________\___________\____________\____________\--> FAILED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Uploaded,
    Analyzing,
    Planning,
    Generating,
    Validating,
    Deploying,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "UPLOADED",
            Self::Analyzing => "ANALYZING",
            Self::Planning => "PLANNING",
            Self::Generating => "GENERATING",
            Self::Validating => "VALIDATING",
            Self::Deploying => "DEPLOYING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "UPLOADED" => Ok(Self::Uploaded),
            "ANALYZING" => Ok(Self::Analyzing),
            "PLANNING" => Ok(Self::Planning),
            "GENERATING" => Ok(Self::Generating),
            "VALIDATING" => Ok(Self::Validating),
            "DEPLOYING" => Ok(Self::Deploying),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            _ => Err(CoreError::Validation(format!("Invalid run status: '{s}'"))),
        }
    }

    /// Ordinal along the forward path. `FAILED` sits outside the order.
    fn ordinal(&self) -> Option<u8> {
        match self {
            Self::Uploaded => Some(0),
            Self::Analyzing => Some(1),
            Self::Planning => Some(2),
            Self::Generating => Some(3),
            Self::Validating => Some(4),
            Self::Deploying => Some(5),
            Self::Completed => Some(6),
            Self::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Check a transition against the state machine.
    ///
    /// Allowed: one step forward along the main path, or a jump to
    /// `FAILED` from any non-terminal state. Everything else (regression,
    /// skipping, re-entry, leaving a terminal state) is rejected.
    pub fn transition_to(self, next: RunStatus) -> Result<RunStatus, CoreError> {
        let invalid = || CoreError::InvalidTransition {
            from: self,
            to: next,
        };

        if self.is_terminal() {
            return Err(invalid());
        }
        if next == Self::Failed {
            return Ok(next);
        }

        match (self.ordinal(), next.ordinal()) {
            (Some(from), Some(to)) if to == from + 1 => Ok(next),
            _ => Err(invalid()),
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// One of the five pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Analyze,
    Plan,
    Generate,
    Validate,
    Deploy,
}

impl Stage {
    /// Every stage in pipeline order.
    pub const ALL: [Stage; 5] = [
        Stage::Analyze,
        Stage::Plan,
        Stage::Generate,
        Stage::Validate,
        Stage::Deploy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analyze => "ANALYZE",
            Self::Plan => "PLAN",
            Self::Generate => "GENERATE",
            Self::Validate => "VALIDATE",
            Self::Deploy => "DEPLOY",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "ANALYZE" => Ok(Self::Analyze),
            "PLAN" => Ok(Self::Plan),
            "GENERATE" => Ok(Self::Generate),
            "VALIDATE" => Ok(Self::Validate),
            "DEPLOY" => Ok(Self::Deploy),
            _ => Err(CoreError::Validation(format!(
                "Invalid stage: '{s}'. Must be one of: ANALYZE, PLAN, GENERATE, VALIDATE, DEPLOY"
            ))),
        }
    }

    /// Zero-based position in [`Stage::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// The run status held while this stage executes.
    pub fn running_status(&self) -> RunStatus {
        match self {
            Self::Analyze => RunStatus::Analyzing,
            Self::Plan => RunStatus::Planning,
            Self::Generate => RunStatus::Generating,
            Self::Validate => RunStatus::Validating,
            Self::Deploy => RunStatus::Deploying,
        }
    }

    /// Map a stage-local percentage (0-100) onto whole-run progress.
    ///
    /// Each stage owns an equal 20% slice of the run.
    pub fn overall_progress(&self, stage_percent: u8) -> u8 {
        let slice = 100 / Self::ALL.len() as u32;
        let base = self.index() as u32 * slice;
        let within = u32::from(stage_percent.min(100)) * slice / 100;
        (base + within) as u8
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// StageStatus
// ---------------------------------------------------------------------------

/// Outcome recorded on a [`StageLog`](crate::records::StageLog).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageStatus {
    Started,
    Completed,
    Failed,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "STARTED",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "STARTED" => Ok(Self::Started),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            _ => Err(CoreError::Validation(format!("Invalid stage status: '{s}'"))),
        }
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// HookStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a single hook firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HookStatus {
    Triggered,
    Running,
    Completed,
    Failed,
}

impl HookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Triggered => "TRIGGERED",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "TRIGGERED" => Ok(Self::Triggered),
            "RUNNING" => Ok(Self::Running),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            _ => Err(CoreError::Validation(format!("Invalid hook status: '{s}'"))),
        }
    }
}

impl std::fmt::Display for HookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
