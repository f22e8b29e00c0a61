/// Fixed text shown for 401/403 responses; raw auth bodies are never surfaced.
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please log in again.";
/// Fallback when the audit service cannot be reached or answers garbage.
pub const TRANSPORT_MESSAGE: &str =
    "Unable to reach the audit service. Check your connection and try again.";
/// Fallback when a server error carries no usable message.
pub const GENERIC_FAILURE_MESSAGE: &str = "The audit could not be completed. Please try again.";

/// Typed error hierarchy for remote audit, benchmark and settings calls.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuditError {
    #[error("authentication failed ({status})")]
    Authentication { status: u16 },
    #[error("validation error {status}: {message}")]
    Validation { status: u16, message: String },
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("decode error: {0}")]
    Decode(String),
}

impl AuditError {
    /// Classify an HTTP status code and response body.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => Self::Authentication { status },
            400..=499 => Self::Validation {
                status,
                message: extract_message(body).unwrap_or_else(|| format!("request rejected ({status})")),
            },
            _ => Self::Server {
                status,
                message: extract_message(body).unwrap_or_default(),
            },
        }
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Text stored as the session's error message. Never empty.
    pub fn user_message(&self) -> String {
        match self {
            Self::Authentication { .. } => SESSION_EXPIRED_MESSAGE.to_string(),
            Self::Validation { message, .. } | Self::Server { message, .. }
                if !message.trim().is_empty() =>
            {
                message.clone()
            }
            Self::Validation { .. } | Self::Server { .. } => GENERIC_FAILURE_MESSAGE.to_string(),
            Self::Transport(_) | Self::Decode(_) => TRANSPORT_MESSAGE.to_string(),
        }
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Authentication { .. } => "authentication",
            Self::Validation { .. } => "validation",
            Self::Server { .. } => "server",
            Self::Transport(_) => "transport",
            Self::Decode(_) => "decode",
        }
    }
}

/// Pull the most specific message out of an error body.
///
/// Looks at JSON `detail`, `message` and `error` fields (string values, or
/// `detail.message` when `detail` is an object), then falls back to the raw
/// body text.
fn extract_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for key in ["detail", "message", "error"] {
            match json.get(key) {
                Some(serde_json::Value::String(s)) if !s.trim().is_empty() => {
                    return Some(s.clone());
                }
                Some(serde_json::Value::Object(obj)) => {
                    if let Some(serde_json::Value::String(s)) = obj.get("message") {
                        if !s.trim().is_empty() {
                            return Some(s.clone());
                        }
                    }
                }
                _ => {}
            }
        }
        if json.is_object() || json.is_array() {
            return None;
        }
    }
    Some(trimmed.to_string())
}
