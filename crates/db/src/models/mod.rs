//! Row structs for the relift tables.
//!
//! Status columns are stored as text; each row converts into its
//! `relift_core` record through `TryFrom`, which rejects unknown values.

pub mod hook_execution;
pub mod quality_report;
pub mod run;
pub mod stage_log;
pub mod tool_call_log;
