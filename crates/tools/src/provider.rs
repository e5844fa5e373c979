//! The capability interface every named provider implements.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;

/// Result of a provider health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ProviderHealth {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

impl ProviderHealth {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// A connection to one external tool server.
///
/// Implementations must tolerate concurrent `call`s; the manager shares a
/// single instance across every run.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Bring the connection up. Called again after a transient failure.
    async fn connect(&self) -> Result<(), ToolError>;

    async fn health_check(&self) -> ProviderHealth;

    /// Invoke `operation` with JSON `params`, returning the raw JSON result.
    async fn call(
        &self,
        operation: &str,
        params: &serde_json::Value,
    ) -> Result<serde_json::Value, ToolError>;

    /// Release the connection. Must be safe to call on a provider that
    /// never connected.
    async fn disconnect(&self);
}
