//! JSON provider manifest: which providers exist, how to reach them, and
//! whether each one is required.
//!
//! ```json
//! [
//!   { "name": "code-analyzer", "required": true, "timeout_secs": 60,
//!     "transport": { "kind": "stdio", "command": "node", "args": ["analyzer.js"] } },
//!   { "name": "source-control", "required": false,
//!     "transport": { "kind": "http", "base_url": "http://localhost:7000",
//!                    "health_path": "/health", "token_env": "SCM_TOKEN" } }
//! ]
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ToolError;
use crate::http::HttpProvider;
use crate::manager::{ProviderSpec, ToolConnectionManager, DEFAULT_CALL_TIMEOUT};
use crate::provider::ToolProvider;
use crate::stdio::StdioProvider;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportConfig {
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
    },
    Http {
        base_url: String,
        #[serde(default)]
        health_path: Option<String>,
        /// Name of the environment variable holding a bearer token.
        #[serde(default)]
        token_env: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProviderEntry {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    pub transport: TransportConfig,
}

impl ProviderEntry {
    pub fn spec(&self) -> ProviderSpec {
        ProviderSpec {
            name: self.name.clone(),
            required: self.required,
            timeout: self
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_CALL_TIMEOUT),
        }
    }

    /// Build the transport. Reads the token variable, if any, now.
    pub fn build(&self) -> Arc<dyn ToolProvider> {
        match &self.transport {
            TransportConfig::Stdio { command, args, env } => Arc::new(StdioProvider::new(
                self.name.clone(),
                command.clone(),
                args.clone(),
                env.clone(),
            )),
            TransportConfig::Http {
                base_url,
                health_path,
                token_env,
            } => {
                let token = token_env.as_ref().and_then(|var| std::env::var(var).ok());
                Arc::new(HttpProvider::new(
                    self.name.clone(),
                    base_url.clone(),
                    health_path.clone(),
                    token,
                ))
            }
        }
    }
}

/// Parse a manifest document.
pub fn parse_manifest(json: &str) -> Result<Vec<ProviderEntry>, ToolError> {
    let entries: Vec<ProviderEntry> = serde_json::from_str(json)
        .map_err(|e| ToolError::Permanent(format!("malformed provider manifest: {e}")))?;
    for entry in &entries {
        if entry.name.trim().is_empty() {
            return Err(ToolError::Permanent(
                "provider manifest entry with empty name".to_string(),
            ));
        }
        if entry.timeout_secs == Some(0) {
            return Err(ToolError::Permanent(format!(
                "provider '{}' timeout_secs must be positive",
                entry.name
            )));
        }
    }
    Ok(entries)
}

/// Read and parse a manifest file.
pub fn load_manifest(path: &Path) -> Result<Vec<ProviderEntry>, ToolError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        ToolError::Permanent(format!("cannot read provider manifest {}: {e}", path.display()))
    })?;
    parse_manifest(&raw)
}

/// Register every manifest entry with the manager.
pub async fn register_manifest(
    manager: &ToolConnectionManager,
    entries: &[ProviderEntry],
) -> Result<(), ToolError> {
    for entry in entries {
        manager.register(entry.spec(), entry.build()).await?;
    }
    Ok(())
}
