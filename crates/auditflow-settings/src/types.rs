//! Settings type definitions.
//!
//! All types use camelCase JSON field names and implement [`Default`] with
//! production values, so partial files only need the keys they change.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Root client settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientSettings {
    pub api: ApiSettings,
    pub audit: AuditSettings,
    pub logging: LoggingSettings,
}

/// Remote audit service connection.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiSettings {
    pub base_url: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    /// Bearer token. Only read from the file or env, never written back out.
    #[serde(skip_serializing)]
    pub auth_token: Option<SecretString>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            connect_timeout_ms: 10_000,
            request_timeout_ms: 120_000,
            auth_token: None,
        }
    }
}

/// Built-in session defaults used until practice settings arrive.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuditSettings {
    pub default_materiality_threshold: f64,
    /// `strict` or `lenient`.
    pub default_display_mode: String,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            default_materiality_threshold: 500.0,
            default_display_mode: "strict".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
