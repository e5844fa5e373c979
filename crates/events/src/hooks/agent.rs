use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use relift_core::providers::{LANGUAGE_MODEL, OP_COMPLETE};
use relift_core::types::RunId;
use relift_tools::{ToolCall, ToolConnectionManager};

use super::HookError;

/// Executes free-text `agent` hook actions.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    async fn execute(
        &self,
        instruction: &str,
        context: &serde_json::Value,
        run_id: Option<RunId>,
    ) -> Result<serde_json::Value, HookError>;
}

/// Delegates agent instructions to the language-model provider.
pub struct ToolAgent {
    tools: Arc<ToolConnectionManager>,
}

impl ToolAgent {
    pub fn new(tools: Arc<ToolConnectionManager>) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl AgentExecutor for ToolAgent {
    async fn execute(
        &self,
        instruction: &str,
        context: &serde_json::Value,
        run_id: Option<RunId>,
    ) -> Result<serde_json::Value, HookError> {
        let call = ToolCall::new(
            LANGUAGE_MODEL,
            OP_COMPLETE,
            json!({ "prompt": instruction, "context": context }),
        )
        .for_run(run_id);
        Ok(self.tools.invoke(call).await?)
    }
}
