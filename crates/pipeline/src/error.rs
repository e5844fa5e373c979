use relift_core::error::CoreError;
use relift_core::status::Stage;
use relift_core::types::RunId;
use relift_db::GatewayError;
use relift_tools::{BuildToolError, ToolError};

/// Why a single stage executor failed.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("Tool call failed: {0}")]
    Tool(#[from] ToolError),

    #[error("Build tool failed: {0}")]
    Build(#[from] BuildToolError),

    #[error("Work area I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unusable provider response: {0}")]
    InvalidOutput(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] GatewayError),

    /// The quality report did not pass. Carries the failed sub-checks.
    #[error("{0}")]
    ValidationFailed(String),

    #[error("Deployment failed: {0}")]
    Deploy(String),
}

/// Error returned from a controller entry point.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid run input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Config(#[from] CoreError),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] GatewayError),

    #[error("Stage {stage} failed: {source}")]
    Stage {
        run_id: RunId,
        stage: Stage,
        #[source]
        source: StageError,
    },

    #[error("Run {run_id} cancelled")]
    Cancelled { run_id: RunId },

    #[error("Run task aborted: {0}")]
    Join(String),
}

impl PipelineError {
    /// The run this error belongs to, when one was created.
    pub fn run_id(&self) -> Option<RunId> {
        match self {
            Self::Stage { run_id, .. } | Self::Cancelled { run_id } => Some(*run_id),
            _ => None,
        }
    }
}
