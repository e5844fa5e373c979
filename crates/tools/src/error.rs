use std::time::Duration;

/// Failure classes for external tool calls.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolError {
    /// Connection refused, dropped pipe, 5xx, and similar. Retried.
    #[error("Transient provider error: {0}")]
    Transient(String),

    /// Bad input, permission denied, not found. Never retried.
    #[error("Provider rejected the call: {0}")]
    Permanent(String),

    /// The call did not finish within its deadline. Retried.
    #[error("Provider call timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The provider could not be brought up.
    #[error("Provider '{provider}' is unavailable ({})", requirement(.required))]
    Unavailable { provider: String, required: bool },

    #[error("Provider '{0}' is not registered")]
    NotRegistered(String),

    /// The provider answered with something that is not a valid response.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

fn requirement(required: &bool) -> &'static str {
    if *required {
        "required"
    } else {
        "optional"
    }
}

impl ToolError {
    /// Whether the retry policy should try again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout(_))
    }

    /// Whether this is the non-fatal "optional provider missing" kind
    /// that callers may route to a fallback path.
    pub fn is_optional_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable {
                required: false,
                ..
            } | Self::NotRegistered(_)
        )
    }
}
