//! Redaction and truncation applied to payloads before they are persisted.

use serde_json::Value;

/// Strings longer than this are cut and suffixed with a marker.
pub const MAX_STRING_LENGTH: usize = 2000;

/// Replacement value for redacted fields.
pub const REDACTED: &str = "[REDACTED]";

/// Substrings that mark an object key as sensitive (case-insensitive).
const SENSITIVE_KEY_MARKERS: &[&str] = &["token", "password", "secret", "api_key", "apikey", "authorization"];

/// Whether an object key holds a credential.
pub fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    SENSITIVE_KEY_MARKERS.iter().any(|m| lower.contains(m))
}

/// Return a copy of `value` with sensitive fields redacted and long
/// strings truncated.
pub fn sanitize(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(truncate(s, MAX_STRING_LENGTH)),
        Value::Array(items) => Value::Array(items.iter().map(sanitize).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let v = if is_sensitive_key(k) {
                        Value::String(REDACTED.to_string())
                    } else {
                        sanitize(v)
                    };
                    (k.clone(), v)
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Truncate `s` to at most `max` characters, appending a marker when cut.
pub fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((idx, _)) => {
            let dropped = s[idx..].chars().count();
            format!("{}...[truncated {dropped} chars]", &s[..idx])
        }
    }
}
