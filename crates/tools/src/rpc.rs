//! JSON-RPC 2.0 client-side message types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ToolError;

pub const JSONRPC_VERSION: &str = "2.0";

/// Standard and implementation-defined error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    /// Inclusive bounds of the server-error range.
    pub const SERVER_ERROR_MIN: i64 = -32099;
    pub const SERVER_ERROR_MAX: i64 = -32000;
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: &'a Value,
}

impl<'a> JsonRpcRequest<'a> {
    pub fn new(id: u64, method: &'a str, params: &'a Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    /// Absent on notifications.
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Server-range errors are treated as retryable; everything else
    /// (parse, invalid request/params, unknown method) is not.
    pub fn into_tool_error(self) -> ToolError {
        let msg = format!("{} (code {})", self.message, self.code);
        if (error_codes::SERVER_ERROR_MIN..=error_codes::SERVER_ERROR_MAX).contains(&self.code) {
            ToolError::Transient(msg)
        } else {
            ToolError::Permanent(msg)
        }
    }
}

impl JsonRpcResponse {
    /// Whether this response answers request `id`.
    pub fn matches(&self, id: u64) -> bool {
        self.id.as_ref().and_then(Value::as_u64) == Some(id)
    }

    pub fn into_result(self) -> Result<Value, ToolError> {
        if let Some(err) = self.error {
            return Err(err.into_tool_error());
        }
        self.result
            .ok_or_else(|| ToolError::Protocol("response has neither result nor error".to_string()))
    }
}
