//! Cross-window credential delivery
//!
//! The page that shows the QR code runs either in a popup (`mode=window`) or
//! an iframe (`mode=iframe`). When the login succeeds it hands the credential
//! to its opener or top window with a cross-window message. This module holds
//! the pieces of that hand-off that do not depend on a browser: the message
//! shape, the policy choosing target origins, the receiver's acceptance
//! check, and a consumer of the QR event stream that drives them.

pub mod client;
pub mod policy;

pub use client::{QrClient, QrStatus, SseFrame, parse_frames};
pub use policy::{
    BroadcastPlan, MessageReceiver, PageContext, PlanSource, TargetWindow, WindowHost, dispatch,
    plan_broadcast,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the QR page is embedded, from its `mode` query parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowMode {
    /// Opened with `window.open`; deliver to the opener
    Window,
    /// Embedded in a frame; deliver to the top window
    Iframe,
}

impl WindowMode {
    /// Parse the `mode` query parameter. Unknown values mean no delivery.
    pub fn from_param(value: Option<&str>) -> Option<Self> {
        match value?.trim() {
            "window" => Some(Self::Window),
            "iframe" => Some(Self::Iframe),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Window => "window",
            Self::Iframe => "iframe",
        }
    }
}

impl fmt::Display for WindowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message kinds a QR page sends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Success,
}

/// Cross-window message carrying the credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub mode: WindowMode,
    /// The assembled cookie string
    pub data: String,
}

impl QrMessage {
    pub fn success(mode: WindowMode, credential: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Success,
            mode,
            data: credential.into(),
        }
    }
}
