use std::collections::HashMap;
use std::path::Path;

use relift_core::error::CoreError;
use relift_core::hooks::{parse_hook_registry, validate_hook_definition, HookDefinition};

use super::HookError;

/// Hooks grouped by trigger event, in configuration order.
#[derive(Debug, Clone, Default)]
pub struct HookRegistry {
    by_event: HashMap<String, Vec<HookDefinition>>,
    len: usize,
}

impl HookRegistry {
    /// Build a registry from already-parsed definitions. Every definition
    /// is validated and ids must be unique.
    pub fn from_definitions(hooks: Vec<HookDefinition>) -> Result<Self, CoreError> {
        let mut registry = Self::default();
        for hook in hooks {
            validate_hook_definition(&hook)?;
            if registry.get(&hook.hook_id).is_some() {
                return Err(CoreError::Validation(format!(
                    "Duplicate hook id '{}'",
                    hook.hook_id
                )));
            }
            registry
                .by_event
                .entry(hook.trigger_event.clone())
                .or_default()
                .push(hook);
            registry.len += 1;
        }
        Ok(registry)
    }

    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        Self::from_definitions(parse_hook_registry(json)?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, HookError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&raw)?)
    }

    /// Hooks subscribed to `event`, enabled or not.
    pub fn hooks_for(&self, event: &str) -> &[HookDefinition] {
        self.by_event.get(event).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, hook_id: &str) -> Option<&HookDefinition> {
        self.by_event
            .values()
            .flatten()
            .find(|h| h.hook_id == hook_id)
    }

    pub fn all(&self) -> impl Iterator<Item = &HookDefinition> {
        self.by_event.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
