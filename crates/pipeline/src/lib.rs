//! The five-stage pipeline and the controller that drives it.
//!
//! [`PipelineController`] owns a run's lifecycle: it creates the run
//! record, executes ANALYZE, PLAN, GENERATE, VALIDATE and DEPLOY in order,
//! persists a stage log around each stage, publishes progress, and fires
//! lifecycle hooks. Stage executors live in [`stages`] and only talk to
//! the outside world through a [`StageContext`].

pub mod artifacts;
pub mod context;
pub mod controller;
pub mod error;
pub mod heuristics;
pub mod stages;

pub use context::{PipelineSettings, StageContext};
pub use controller::{PipelineController, RunHandle, RunResult};
pub use error::{PipelineError, StageError};
