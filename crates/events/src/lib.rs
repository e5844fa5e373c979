//! Progress reporting and lifecycle hooks.
//!
//! - [`ProgressChannel`]: fan-out stream of [`ProgressEvent`]s backed by
//!   `tokio::sync::broadcast`, plus a bounded per-run history for polling.
//! - [`HookDispatcher`]: runs the configured hooks for a lifecycle event
//!   and records one hook execution per fired hook. Never fails the caller.
//! - [`WebhookDelivery`]: HTTP POST delivery used by webhook hook actions.

pub mod hooks;
pub mod progress;
pub mod webhook;

pub use hooks::{
    AgentExecutor, HookContext, HookDispatchReport, HookDispatcher, HookError, HookOutcome,
    HookRegistry, ToolAgent,
};
pub use progress::{ProgressChannel, ProgressEvent, ProgressStatus};
pub use webhook::{WebhookDelivery, WebhookError};
