//! Post-login credential probe
//!
//! Calls an endpoint that only answers meaningfully for an authenticated
//! cookie and classifies the answer. The result is informational: it rides
//! along with the success outcome and never changes it.

use super::network::{CallContext, fetch_envelope};
use crate::types::{ApiEnvelope, ValidationResult, internal::NavData};
use reqwest::{Client, header::COOKIE};
use std::time::Duration;

/// Not logged in
pub const CODE_NOT_LOGGED_IN: i64 = -101;
/// CSRF check failed
pub const CODE_CSRF_FAILED: i64 = -111;
/// Malformed request
pub const CODE_BAD_REQUEST: i64 = -400;
/// Access denied
pub const CODE_ACCESS_DENIED: i64 = -403;

/// Checks a freshly assembled credential against the navigation endpoint
#[derive(Debug, Clone)]
pub struct CredentialProbe {
    /// HTTP client
    http: Client,
    /// Base URL of the general API
    api_base_url: String,
    /// Upper bound for the probe call
    timeout: Duration,
}

impl CredentialProbe {
    pub fn new(http: Client, api_base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            api_base_url: api_base_url.into(),
            timeout,
        }
    }

    /// Probe `credential` and classify the provider's answer
    pub async fn check(&self, ctx: &CallContext, credential: &str) -> ValidationResult {
        let url = format!("{}/x/web-interface/nav", self.api_base_url.trim_end_matches('/'));
        let request = self
            .http
            .get(url)
            .headers(ctx.headers())
            .header(COOKIE, credential);

        let result = match fetch_envelope::<NavData>(request, "credential probe", self.timeout).await {
            Ok((_, envelope)) => classify(&envelope),
            Err(e) => ValidationResult::indeterminate(
                "Could not verify the credential",
                e.to_string(),
            ),
        };

        tracing::info!(
            session_id = ctx.session_id,
            status = ?result.status,
            "Credential probe finished: {}",
            result.message
        );
        result
    }
}

/// Map the navigation endpoint's envelope to a validation result
pub fn classify(envelope: &ApiEnvelope<NavData>) -> ValidationResult {
    let details = format!("code {}: {}", envelope.code, envelope.message);
    match envelope.code {
        0 => {
            let data = envelope.data.clone().unwrap_or_default();
            if data.is_login {
                let who = data
                    .uname
                    .map(|name| format!(" as {}", name))
                    .unwrap_or_default();
                ValidationResult::verified(format!("Credential is valid, logged in{}", who))
            } else {
                ValidationResult::rejected("Credential was accepted but is not logged in", details)
            }
        }
        CODE_NOT_LOGGED_IN => {
            ValidationResult::rejected("Credential is not logged in or has expired", details)
        }
        CODE_CSRF_FAILED => ValidationResult::rejected("Credential failed the CSRF check", details),
        CODE_BAD_REQUEST => ValidationResult::rejected("Credential request was rejected", details),
        CODE_ACCESS_DENIED => ValidationResult::rejected("Credential has no access", details),
        _ => ValidationResult::indeterminate("Unexpected response while verifying", details),
    }
}
