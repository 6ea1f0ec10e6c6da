//! Response type definitions
//!
//! Defines the payloads the service sends back: SSE event bodies for the QR
//! stream and JSON bodies for the plain endpoints.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Provider code for a confirmed login
pub const CODE_SUCCESS: i64 = 0;
/// Provider code for an expired challenge
pub const CODE_EXPIRED: i64 = 86038;
/// Provider code for "scanned, waiting for confirmation"
pub const CODE_NOT_CONFIRMED: i64 = 86090;
/// Provider code for "waiting for scan"
pub const CODE_NOT_SCANNED: i64 = 86101;
/// Local sentinel for a failed outbound call
pub const CODE_TRANSPORT: i64 = -1;

/// Local classification of a poll response code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    Success,
    NotScanned,
    NotConfirmed,
    Expired,
    /// The call itself failed; retry on the next tick
    Transport,
    /// Any other provider code, terminal
    Other(i64),
}

impl PollStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            CODE_SUCCESS => Self::Success,
            CODE_NOT_SCANNED => Self::NotScanned,
            CODE_NOT_CONFIRMED => Self::NotConfirmed,
            CODE_EXPIRED => Self::Expired,
            CODE_TRANSPORT => Self::Transport,
            other => Self::Other(other),
        }
    }

    /// Whether this status ends the session
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::NotScanned | Self::NotConfirmed | Self::Transport)
    }
}

/// Result of the challenge-generate call, sent as the `generate` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResult {
    pub code: i64,
    pub msg: String,
    pub url: String,
    pub key: String,
}

impl GenerateResult {
    /// Successful generation with a challenge
    pub fn success(url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            code: CODE_SUCCESS,
            msg: String::new(),
            url: url.into(),
            key: key.into(),
        }
    }

    /// Failed generation with an empty challenge
    pub fn failure(code: i64, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            url: String::new(),
            key: String::new(),
        }
    }

    /// Transport failure with an empty challenge
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::failure(CODE_TRANSPORT, msg)
    }

    pub fn is_success(&self) -> bool {
        self.code == CODE_SUCCESS
    }
}

/// Result of one poll tick, sent as a `poll` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOutcome {
    pub code: i64,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookie: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookie_validation: Option<ValidationResult>,
}

impl PollOutcome {
    pub fn new(code: i64, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            cookie: None,
            cookie_validation: None,
        }
    }

    /// Transport failure on this tick
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::new(CODE_TRANSPORT, msg)
    }

    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    pub fn with_validation(mut self, validation: ValidationResult) -> Self {
        self.cookie_validation = Some(validation);
        self
    }

    pub fn status(&self) -> PollStatus {
        PollStatus::from_code(self.code)
    }
}

/// Outcome of the post-login credential probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationOutcome {
    #[serde(rename = "success")]
    Verified,
    #[serde(rename = "failed")]
    Rejected,
    #[serde(rename = "error")]
    Indeterminate,
}

/// Informational result of probing the assembled credential
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub status: ValidationOutcome,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ValidationResult {
    pub fn verified(message: impl Into<String>) -> Self {
        Self {
            status: ValidationOutcome::Verified,
            message: message.into(),
            details: None,
        }
    }

    pub fn rejected(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            status: ValidationOutcome::Rejected,
            message: message.into(),
            details: Some(details.into()),
        }
    }

    pub fn indeterminate(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            status: ValidationOutcome::Indeterminate,
            message: message.into(),
            details: Some(details.into()),
        }
    }
}

/// One structured cookie produced by the conversion endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertedCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub expires: f64,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: String,
}

/// One storage slot of the conversion result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookieStoreEntry {
    pub key: String,
    pub value: Vec<ConvertedCookie>,
}

/// Body of the conversion endpoint, shaped as a cookie-editor import file:
/// `{ "_default": { "1": { "key": "cookie", "value": [...] } } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertCookieResponse {
    #[serde(rename = "_default")]
    pub default: BTreeMap<String, CookieStoreEntry>,
}

impl ConvertCookieResponse {
    pub fn new(cookies: Vec<ConvertedCookie>) -> Self {
        let mut default = BTreeMap::new();
        default.insert(
            "1".to_string(),
            CookieStoreEntry {
                key: "cookie".to_string(),
                value: cookies,
            },
        );
        Self { default }
    }

    /// The converted cookies
    pub fn cookies(&self) -> &[ConvertedCookie] {
        self.default
            .get("1")
            .map(|entry| entry.value.as_slice())
            .unwrap_or_default()
    }
}

/// Ping response for health checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {
    /// Server uptime in seconds
    pub server_uptime: u64,

    /// Server version
    pub version: String,

    /// QR sessions currently streaming
    pub active_sessions: usize,
}

impl PingResponse {
    /// Create a new ping response
    pub fn new(server_uptime: u64, version: impl Into<String>, active_sessions: usize) -> Self {
        Self {
            server_uptime,
            version: version.into(),
            active_sessions,
        }
    }
}

/// Error response for API errors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
