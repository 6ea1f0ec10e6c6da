//! Provider wire types
//!
//! Typed shapes of the remote provider's `{code, message, data}` envelope for
//! each endpoint the login clients call. Everything is decoded here at the
//! boundary; the rest of the crate never inspects raw JSON.

use crate::types::serde_helpers::deserialize_flexible_i64;
use serde::{Deserialize, Serialize};

/// Standard provider response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(deserialize_with = "deserialize_flexible_i64")]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// Take the payload of a successful envelope
    pub fn into_data(self) -> crate::Result<T> {
        if !self.is_success() {
            return Err(crate::Error::provider(self.code, self.message));
        }
        self.data
            .ok_or_else(|| crate::Error::malformed_response("success envelope has no data"))
    }
}

/// `data` of the web challenge-generate endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebGenerateData {
    #[serde(default)]
    pub url: String,
    pub qrcode_key: String,
}

/// `data` of the web status-poll endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebPollData {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(deserialize_with = "deserialize_flexible_i64")]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// `data` of the fingerprint endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerSpiData {
    pub b_3: String,
    #[serde(default)]
    pub b_4: Option<String>,
}

/// `data` of the TV challenge-generate endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TvAuthCodeData {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub auth_code: String,
}

/// `data` of a successful TV status poll
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TvPollData {
    pub mid: u64,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub cookie_info: Option<TvCookieInfo>,
}

/// Cookies handed out by the TV token exchange
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TvCookieInfo {
    #[serde(default)]
    pub cookies: Vec<TvCookie>,
    #[serde(default)]
    pub domains: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TvCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub expires: Option<i64>,
}

/// `data` of the navigation endpoint used by the credential probe
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavData {
    #[serde(default)]
    pub is_login: bool,
    #[serde(default)]
    pub mid: Option<u64>,
    #[serde(default)]
    pub uname: Option<String>,
}
