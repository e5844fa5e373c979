use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::json;
use tokio::sync::{broadcast, RwLock};

use relift_core::hooks::{
    render_str, render_template, HookAction, HookDefinition, MAX_OUTPUT_CAPTURE_LENGTH,
};
use relift_core::records::NewHookExecution;
use relift_core::sanitize::{sanitize, truncate};
use relift_core::status::HookStatus;
use relift_core::types::RunId;
use relift_db::SharedGateway;
use relift_tools::{ToolCall, ToolConnectionManager, ToolEvent};

use super::{AgentExecutor, HookContext, HookError, HookRegistry};
use crate::webhook::WebhookDelivery;

/// Result of one fired hook.
#[derive(Debug, Clone, Serialize)]
pub struct HookOutcome {
    pub hook_id: String,
    pub status: HookStatus,
    pub error: Option<String>,
    pub duration_ms: i64,
}

/// Everything that happened for one `trigger` call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HookDispatchReport {
    pub event: String,
    pub outcomes: Vec<HookOutcome>,
}

impl HookDispatchReport {
    pub fn fired(&self) -> usize {
        self.outcomes.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| o.status == HookStatus::Completed)
    }
}

/// Runs the hooks registered for lifecycle events.
///
/// Hooks for one event run sequentially in registry order; the actions of
/// one hook run in order under the hook's overall timeout and stop at the
/// first failure. Every fired hook produces exactly one hook execution
/// record. Nothing here ever returns an error to the triggering code.
pub struct HookDispatcher {
    registry: RwLock<HookRegistry>,
    tools: Arc<ToolConnectionManager>,
    agent: Arc<dyn AgentExecutor>,
    webhooks: WebhookDelivery,
    gateway: SharedGateway,
}

impl HookDispatcher {
    pub fn new(
        registry: HookRegistry,
        tools: Arc<ToolConnectionManager>,
        agent: Arc<dyn AgentExecutor>,
        gateway: SharedGateway,
    ) -> Self {
        Self {
            registry: RwLock::new(registry),
            tools,
            agent,
            webhooks: WebhookDelivery::new(),
            gateway,
        }
    }

    pub fn with_webhooks(mut self, webhooks: WebhookDelivery) -> Self {
        self.webhooks = webhooks;
        self
    }

    /// Swap in a new set of hooks. In-flight dispatches keep the old set.
    pub async fn replace(&self, registry: HookRegistry) {
        let count = registry.len();
        *self.registry.write().await = registry;
        tracing::info!(hooks = count, "Hook registry replaced");
    }

    /// Re-read the registry file. On error the current hooks stay active.
    pub async fn reload_from_path(&self, path: &Path) -> Result<usize, HookError> {
        let registry = HookRegistry::load_from_path(path)?;
        let count = registry.len();
        self.replace(registry).await;
        Ok(count)
    }

    /// Snapshot of the configured hooks.
    pub async fn definitions(&self) -> Vec<HookDefinition> {
        self.registry.read().await.all().cloned().collect()
    }

    /// Fire every enabled hook subscribed to `event`.
    pub async fn trigger(&self, event: &str, ctx: HookContext) -> HookDispatchReport {
        let hooks: Vec<HookDefinition> = self
            .registry
            .read()
            .await
            .hooks_for(event)
            .iter()
            .filter(|h| h.enabled)
            .cloned()
            .collect();

        let mut report = HookDispatchReport {
            event: event.to_string(),
            outcomes: Vec::with_capacity(hooks.len()),
        };
        if hooks.is_empty() {
            return report;
        }

        let context = ctx.to_value(event);
        for hook in &hooks {
            let outcome = self.execute(hook, event, ctx.run_id, &context).await;
            report.outcomes.push(outcome);
        }
        report
    }

    async fn execute(
        &self,
        hook: &HookDefinition,
        event: &str,
        run_id: Option<RunId>,
        context: &serde_json::Value,
    ) -> HookOutcome {
        let start = Instant::now();
        let timeout_secs = hook.timeout_secs();
        let mut log: Vec<serde_json::Value> = Vec::with_capacity(hook.actions.len());

        let result = match tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            self.run_actions(hook, run_id, context, &mut log),
        )
        .await
        {
            Ok(result) => result,
            Err(_elapsed) => Err(HookError::Timeout(timeout_secs)),
        };
        let duration_ms = start.elapsed().as_millis() as i64;

        let (status, error) = match result {
            Ok(()) => {
                tracing::info!(hook_id = %hook.hook_id, event, duration_ms, "Hook completed");
                (HookStatus::Completed, None)
            }
            Err(e) => {
                tracing::warn!(hook_id = %hook.hook_id, event, error = %e, "Hook failed");
                (HookStatus::Failed, Some(e.to_string()))
            }
        };

        let record = NewHookExecution {
            run_id,
            hook_id: hook.hook_id.clone(),
            event: event.to_string(),
            status,
            log: serde_json::Value::Array(log),
            error: error.clone(),
            duration_ms,
        };
        if let Err(e) = self.gateway.append_hook_execution(record).await {
            tracing::error!(hook_id = %hook.hook_id, error = %e, "Failed to record hook execution");
        }

        HookOutcome {
            hook_id: hook.hook_id.clone(),
            status,
            error,
            duration_ms,
        }
    }

    async fn run_actions(
        &self,
        hook: &HookDefinition,
        run_id: Option<RunId>,
        context: &serde_json::Value,
        log: &mut Vec<serde_json::Value>,
    ) -> Result<(), HookError> {
        for action in &hook.actions {
            let label = action.label();
            match self.run_action(action, run_id, context).await {
                Ok(output) => log.push(json!({
                    "action": label,
                    "status": "ok",
                    "output": capture(&output),
                })),
                Err(e) => {
                    log.push(json!({
                        "action": label,
                        "status": "error",
                        "error": e.to_string(),
                    }));
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    async fn run_action(
        &self,
        action: &HookAction,
        run_id: Option<RunId>,
        context: &serde_json::Value,
    ) -> Result<serde_json::Value, HookError> {
        match action {
            HookAction::Tool {
                provider,
                operation,
                params,
            } => {
                let call = ToolCall::new(
                    provider.as_str(),
                    operation.as_str(),
                    render_template(params, context),
                )
                .for_run(run_id);
                Ok(self.tools.invoke(call).await?)
            }
            HookAction::Agent { instruction } => {
                let instruction = render_str(instruction, context);
                self.agent.execute(&instruction, context, run_id).await
            }
            HookAction::Webhook { url } => {
                let status = self.webhooks.deliver(url, context).await?;
                Ok(json!({ "http_status": status }))
            }
        }
    }

    /// Fire `provider.*` hooks for connection-manager lifecycle events.
    ///
    /// Runs until the manager's event channel closes.
    pub async fn run_tool_event_listener(
        self: Arc<Self>,
        mut receiver: broadcast::Receiver<ToolEvent>,
    ) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let ctx = HookContext::process_wide(event.context());
                    self.trigger(event.event_name(), ctx).await;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Hook listener lagged, provider events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Tool event channel closed, hook listener shutting down");
                    break;
                }
            }
        }
    }
}

/// Sanitised, length-capped rendering of an action's output.
fn capture(output: &serde_json::Value) -> String {
    let rendered = match sanitize(output) {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    };
    truncate(&rendered, MAX_OUTPUT_CAPTURE_LENGTH)
}
