//! Hook registry, dispatch, and the agent collaborator seam.

mod agent;
mod dispatcher;
mod registry;

pub use agent::{AgentExecutor, ToolAgent};
pub use dispatcher::{HookDispatchReport, HookDispatcher, HookOutcome};
pub use registry::HookRegistry;

use relift_core::error::CoreError;
use relift_core::types::RunId;
use relift_tools::ToolError;

use crate::webhook::WebhookError;

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("Invalid hook configuration: {0}")]
    Config(#[from] CoreError),

    #[error("Failed to read hook registry: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tool action failed: {0}")]
    Tool(#[from] ToolError),

    #[error("Webhook action failed: {0}")]
    Webhook(#[from] WebhookError),

    #[error("Agent action failed: {0}")]
    Agent(String),

    #[error("Hook timed out after {0}s")]
    Timeout(u64),
}

/// Values available to a firing hook, for `{{key}}` templates and for the
/// agent/webhook payloads.
#[derive(Debug, Clone, Default)]
pub struct HookContext {
    pub run_id: Option<RunId>,
    fields: serde_json::Map<String, serde_json::Value>,
}

impl HookContext {
    pub fn for_run(run_id: RunId) -> Self {
        Self {
            run_id: Some(run_id),
            fields: serde_json::Map::new(),
        }
    }

    /// Context for a hook not tied to a run. Object fields of `value` are
    /// copied in; anything else is ignored.
    pub fn process_wide(value: serde_json::Value) -> Self {
        let fields = match value {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        Self {
            run_id: None,
            fields,
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }

    /// Flat JSON object including `event` and `run_id`.
    pub fn to_value(&self, event: &str) -> serde_json::Value {
        let mut map = self.fields.clone();
        map.insert("event".to_string(), event.into());
        map.insert(
            "run_id".to_string(),
            self.run_id
                .map(|id| serde_json::Value::String(id.to_string()))
                .unwrap_or(serde_json::Value::Null),
        );
        serde_json::Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relift_core::types::new_run_id;

    #[test]
    fn context_value_carries_run_and_event() {
        let run_id = new_run_id();
        let ctx = HookContext::for_run(run_id).with("status", "FAILED");
        let value = ctx.to_value("run.failed");
        assert_eq!(value["event"], "run.failed");
        assert_eq!(value["run_id"], run_id.to_string());
        assert_eq!(value["status"], "FAILED");
    }

    #[test]
    fn process_wide_context_has_null_run() {
        let ctx = HookContext::process_wide(serde_json::json!({"provider": "llm"}));
        let value = ctx.to_value("provider.failed");
        assert!(value["run_id"].is_null());
        assert_eq!(value["provider"], "llm");
    }

    #[test]
    fn non_object_context_is_ignored() {
        let ctx = HookContext::process_wide(serde_json::json!("oops"));
        assert!(ctx.get("provider").is_none());
    }
}
