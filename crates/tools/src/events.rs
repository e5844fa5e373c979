//! Provider lifecycle events broadcast by the connection manager.

use relift_core::hooks::{
    EVENT_PROVIDER_CONNECTED, EVENT_PROVIDER_DISCONNECTED, EVENT_PROVIDER_FAILED,
};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolEvent {
    Connected { provider: String },
    Failed {
        provider: String,
        required: bool,
        error: String,
    },
    Disconnected { provider: String },
}

impl ToolEvent {
    /// Lifecycle event name hooks subscribe to.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => EVENT_PROVIDER_CONNECTED,
            Self::Failed { .. } => EVENT_PROVIDER_FAILED,
            Self::Disconnected { .. } => EVENT_PROVIDER_DISCONNECTED,
        }
    }

    pub fn provider(&self) -> &str {
        match self {
            Self::Connected { provider }
            | Self::Failed { provider, .. }
            | Self::Disconnected { provider } => provider,
        }
    }

    /// Flat context handed to hook templates.
    pub fn context(&self) -> serde_json::Value {
        let mut ctx = serde_json::json!({
            "event": self.event_name(),
            "provider": self.provider(),
        });
        if let Self::Failed { required, error, .. } = self {
            ctx["required"] = serde_json::json!(required);
            ctx["error"] = serde_json::json!(error);
        }
        ctx
    }
}
