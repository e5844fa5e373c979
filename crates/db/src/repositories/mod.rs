//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod hook_execution_repo;
pub mod quality_report_repo;
pub mod run_repo;
pub mod stage_log_repo;
pub mod tool_call_log_repo;

pub use hook_execution_repo::HookExecutionRepo;
pub use quality_report_repo::QualityReportRepo;
pub use run_repo::RunRepo;
pub use stage_log_repo::StageLogRepo;
pub use tool_call_log_repo::ToolCallLogRepo;
