//! Hook definitions, lifecycle event names, validation, and parameter
//! templating.
//!
//! A hook is a declarative `{hook_id, trigger_event, enabled, actions[]}`
//! record loaded from configuration. Actions either call an external
//! tool provider, hand a free-text instruction to an agent, or POST the
//! event to a webhook URL.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum length of a hook identifier.
pub const MAX_HOOK_ID_LENGTH: usize = 200;

/// Maximum number of actions a single hook may carry.
pub const MAX_ACTIONS_PER_HOOK: usize = 20;

/// Default overall timeout for one hook's actions, in seconds.
pub const DEFAULT_HOOK_TIMEOUT_SECS: u64 = 30;

/// Maximum captured output length per action, in bytes.
pub const MAX_OUTPUT_CAPTURE_LENGTH: usize = 100_000;

// ---------------------------------------------------------------------------
// Lifecycle events
// ---------------------------------------------------------------------------

pub const EVENT_RUN_STARTED: &str = "run.started";
pub const EVENT_RUN_COMPLETED: &str = "run.completed";
pub const EVENT_RUN_FAILED: &str = "run.failed";
pub const EVENT_STAGE_COMPLETED: &str = "stage.completed";
pub const EVENT_VALIDATION_PASSED: &str = "validation.passed";
pub const EVENT_VALIDATION_FAILED: &str = "validation.failed";
pub const EVENT_PROVIDER_CONNECTED: &str = "provider.connected";
pub const EVENT_PROVIDER_FAILED: &str = "provider.failed";
pub const EVENT_PROVIDER_DISCONNECTED: &str = "provider.disconnected";

/// Every event name a hook may subscribe to.
pub const KNOWN_EVENTS: &[&str] = &[
    EVENT_RUN_STARTED,
    EVENT_RUN_COMPLETED,
    EVENT_RUN_FAILED,
    EVENT_STAGE_COMPLETED,
    EVENT_VALIDATION_PASSED,
    EVENT_VALIDATION_FAILED,
    EVENT_PROVIDER_CONNECTED,
    EVENT_PROVIDER_FAILED,
    EVENT_PROVIDER_DISCONNECTED,
];

// ---------------------------------------------------------------------------
// HookAction
// ---------------------------------------------------------------------------

/// One step executed when a hook fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HookAction {
    /// Invoke an operation on a registered tool provider.
    Tool {
        provider: String,
        operation: String,
        #[serde(default = "empty_object")]
        params: serde_json::Value,
    },
    /// Delegate a free-text instruction to the agent collaborator.
    Agent { instruction: String },
    /// POST the event context to an external URL.
    Webhook { url: String },
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

impl HookAction {
    /// Short label used in execution logs.
    pub fn label(&self) -> String {
        match self {
            Self::Tool {
                provider,
                operation,
                ..
            } => format!("tool:{provider}.{operation}"),
            Self::Agent { .. } => "agent".to_string(),
            Self::Webhook { url } => format!("webhook:{url}"),
        }
    }
}

// ---------------------------------------------------------------------------
// HookDefinition
// ---------------------------------------------------------------------------

/// A configured hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookDefinition {
    pub hook_id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub trigger_event: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    pub actions: Vec<HookAction>,
}

fn default_enabled() -> bool {
    true
}

impl HookDefinition {
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(DEFAULT_HOOK_TIMEOUT_SECS)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a hook id: non-empty and within the length limit.
pub fn validate_hook_id(id: &str) -> Result<(), CoreError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Hook id must not be empty".to_string()));
    }
    if trimmed.len() > MAX_HOOK_ID_LENGTH {
        return Err(CoreError::Validation(format!(
            "Hook id exceeds maximum length of {MAX_HOOK_ID_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validate a single action's required fields.
pub fn validate_hook_action(action: &HookAction) -> Result<(), CoreError> {
    match action {
        HookAction::Tool {
            provider,
            operation,
            params,
        } => {
            if provider.trim().is_empty() || operation.trim().is_empty() {
                return Err(CoreError::Validation(
                    "tool action requires 'provider' and 'operation'".to_string(),
                ));
            }
            if !params.is_object() {
                return Err(CoreError::Validation(
                    "tool action 'params' must be a JSON object".to_string(),
                ));
            }
        }
        HookAction::Agent { instruction } => {
            if instruction.trim().is_empty() {
                return Err(CoreError::Validation(
                    "agent action requires a non-empty 'instruction'".to_string(),
                ));
            }
        }
        HookAction::Webhook { url } => {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(CoreError::Validation(format!(
                    "webhook action url must be http(s), got '{url}'"
                )));
            }
        }
    }
    Ok(())
}

/// Validate a whole hook definition.
pub fn validate_hook_definition(hook: &HookDefinition) -> Result<(), CoreError> {
    validate_hook_id(&hook.hook_id)?;
    if !KNOWN_EVENTS.contains(&hook.trigger_event.as_str()) {
        return Err(CoreError::Validation(format!(
            "Hook '{}' has unknown trigger_event '{}'",
            hook.hook_id, hook.trigger_event
        )));
    }
    if hook.actions.is_empty() {
        return Err(CoreError::Validation(format!(
            "Hook '{}' must define at least one action",
            hook.hook_id
        )));
    }
    if hook.actions.len() > MAX_ACTIONS_PER_HOOK {
        return Err(CoreError::Validation(format!(
            "Hook '{}' exceeds {MAX_ACTIONS_PER_HOOK} actions",
            hook.hook_id
        )));
    }
    if hook.timeout_secs == Some(0) {
        return Err(CoreError::Validation(format!(
            "Hook '{}' timeout_secs must be positive",
            hook.hook_id
        )));
    }
    hook.actions.iter().try_for_each(validate_hook_action)
}

/// Parse and validate a JSON hook registry. Duplicate ids are rejected.
pub fn parse_hook_registry(json: &str) -> Result<Vec<HookDefinition>, CoreError> {
    let hooks: Vec<HookDefinition> = serde_json::from_str(json)
        .map_err(|e| CoreError::Validation(format!("Malformed hook registry: {e}")))?;

    let mut seen: Vec<&str> = Vec::with_capacity(hooks.len());
    for hook in &hooks {
        validate_hook_definition(hook)?;
        if seen.contains(&hook.hook_id.as_str()) {
            return Err(CoreError::Validation(format!(
                "Duplicate hook id '{}'",
                hook.hook_id
            )));
        }
        seen.push(&hook.hook_id);
    }
    Ok(hooks)
}

// ---------------------------------------------------------------------------
// Templating
// ---------------------------------------------------------------------------

/// Substitute `{{key}}` placeholders in every string inside `value`
/// using top-level scalar fields of `context`.
///
/// Unknown placeholders are left untouched.
pub fn render_template(value: &serde_json::Value, context: &serde_json::Value) -> serde_json::Value {
    use serde_json::Value;

    match value {
        Value::String(s) => Value::String(render_str(s, context)),
        Value::Array(items) => Value::Array(items.iter().map(|v| render_template(v, context)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), render_template(v, context)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// String form of [`render_template`].
pub fn render_str(template: &str, context: &serde_json::Value) -> String {
    let Some(fields) = context.as_object() else {
        return template.to_string();
    };

    let mut out = template.to_string();
    for (key, value) in fields {
        let placeholder = format!("{{{{{key}}}}}");
        if !out.contains(&placeholder) {
            continue;
        }
        let replacement = match value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        };
        out = out.replace(&placeholder, &replacement);
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
