//! Request type definitions
//!
//! Defines the inbound request shapes: the QR stream query and the cookie
//! conversion body.

use crate::types::serde_helpers::deserialize_flexible_bool;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which login flow a QR session uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientKind {
    /// Browser QR login
    #[default]
    Web,
    /// TV QR login with signed requests and token exchange
    Tv,
}

impl fmt::Display for ClientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Web => f.write_str("web"),
            Self::Tv => f.write_str("tv"),
        }
    }
}

/// Query string of `GET /api/qr`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QrQuery {
    /// Login flow variant, `web` when absent
    #[serde(default)]
    pub client: ClientKind,
}

/// Body of `POST /api/convert`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConvertCookieRequest {
    /// Raw `name=value; name=value` string or a list of cookie objects
    pub cookies: Option<CookieInput>,
    /// Fallback domain for names that match no known pattern
    pub domain: Option<String>,
    /// Path applied to cookies parsed from a string
    pub path: Option<String>,
    /// Expiry (Unix seconds) applied to cookies parsed from a string
    pub expires: Option<f64>,
}

/// Either form the conversion endpoint accepts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CookieInput {
    Text(String),
    List(Vec<CookieEntry>),
}

/// One cookie object as pasted by a user; every field but the name is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieEntry {
    pub name: String,
    #[serde(default)]
    pub value: String,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub expires: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_flexible_bool")]
    pub http_only: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_flexible_bool")]
    pub secure: Option<bool>,
    pub same_site: Option<String>,
}

impl ConvertCookieRequest {
    /// Decode a raw JSON body, reporting shape problems as invalid input
    pub fn from_value(value: serde_json::Value) -> crate::Result<Self> {
        let request: Self = serde_json::from_value(value)
            .map_err(|e| crate::Error::invalid_input(format!("Invalid cookie data: {}", e)))?;
        match &request.cookies {
            None => {
                return Err(crate::Error::invalid_input("Invalid cookie data: `cookies` is required"));
            }
            Some(CookieInput::Text(text)) if text.trim().is_empty() => {
                return Err(crate::Error::invalid_input("Invalid cookie data: `cookies` is empty"));
            }
            Some(_) => {}
        }
        Ok(request)
    }

    pub fn with_cookies(mut self, cookies: CookieInput) -> Self {
        self.cookies = Some(cookies);
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }
}
