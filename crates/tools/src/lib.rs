//! External tool providers and the connection manager that owns them.
//!
//! Stage code never touches a provider directly. It goes through
//! [`ToolConnectionManager::invoke`], which applies the per-call timeout
//! and the retry policy and writes exactly one tool call log per logical
//! call. Provider lifecycle changes are broadcast as [`ToolEvent`]s.
//!
//! The build tool used to scaffold and compile generated projects is a
//! separate seam ([`BuildTool`]) since it is a local process rather than
//! a named provider.

pub mod build_tool;
pub mod error;
pub mod events;
pub mod http;
pub mod inprocess;
pub mod manager;
pub mod manifest;
pub mod provider;
pub mod retry;
pub mod rpc;
pub mod stdio;

pub use build_tool::{BuildOutput, BuildTool, BuildToolError, ProcessBuildTool};
pub use error::ToolError;
pub use events::ToolEvent;
pub use inprocess::InProcessProvider;
pub use manager::{ProviderSpec, ProviderState, ToolCall, ToolConnectionManager};
pub use provider::{ProviderHealth, ToolProvider};
pub use retry::RetryPolicy;
