//! Query parameter types shared by handlers.

use serde::Deserialize;

/// Default and maximum page size for run listings.
pub const DEFAULT_LIST_LIMIT: i64 = 50;
pub const MAX_LIST_LIMIT: i64 = 500;

/// `?limit=` for list endpoints. Clamped to `1..=MAX_LIST_LIMIT`.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

impl ListParams {
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }
}

/// `?wait=true` blocks the submission until the run is terminal.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitParams {
    #[serde(default)]
    pub wait: bool,
}
