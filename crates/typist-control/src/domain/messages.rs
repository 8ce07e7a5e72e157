//! JSON bodies of the control API.
//!
//! ```text
//! GET  /status                          → StatusResponse
//! POST /type     {"text":"Hi","delay":0.05} → CommandResponse
//! POST /keypress {"key":"enter"}           → CommandResponse
//! ```
//!
//! Request fields are all optional at the serde level so that a missing
//! field becomes a 400 with a readable message instead of a parse error.

use serde::{Deserialize, Serialize};

/// Body of `POST /type`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeRequest {
    #[serde(default)]
    pub text: Option<String>,
    /// Seconds between characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,
}

/// Body of `POST /keypress`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeypressRequest {
    #[serde(default)]
    pub key: Option<String>,
}

/// Reply to `/type` and `/keypress`, and to every error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Reply to `GET /status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Always `"online"`.
    pub status: String,
    /// Seconds since the server started.
    pub uptime: f64,
    /// `uptime` as `"{h}h {m}m {s}s"`.
    pub uptime_formatted: String,
    pub commands_executed: u64,
    /// Unix time of the last command, in seconds, or `null` before the first.
    pub last_command_time: Option<f64>,
}
