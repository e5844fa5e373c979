use relift_core::error::CoreError;
use relift_core::types::RunId;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt row: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn run_not_found(id: RunId) -> Self {
        Self::NotFound {
            entity: "Run",
            id: id.to_string(),
        }
    }
}
