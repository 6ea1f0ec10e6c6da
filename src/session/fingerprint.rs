//! Fingerprint (`buvid3`) lookup
//!
//! A logged-in cookie set is only usable together with a device fingerprint
//! the login endpoints do not hand out, so it is fetched from a side endpoint.

use super::network::{CallContext, fetch_envelope};
use crate::{Result, types::internal::FingerSpiData};
use reqwest::Client;
use std::time::Duration;

/// Fetches the device fingerprint merged into every credential
#[derive(Debug, Clone)]
pub struct FingerprintClient {
    /// HTTP client
    http: Client,
    /// Base URL of the general API
    api_base_url: String,
    /// Upper bound for the fingerprint call
    timeout: Duration,
}

impl FingerprintClient {
    pub fn new(http: Client, api_base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            api_base_url: api_base_url.into(),
            timeout,
        }
    }

    /// Fetch the `buvid3` value for a new credential
    pub async fn fetch(&self, ctx: &CallContext) -> Result<String> {
        let url = format!("{}/x/frontend/finger/spi", self.api_base_url.trim_end_matches('/'));
        tracing::debug!(session_id = ctx.session_id, "Fetching fingerprint");

        let request = self.http.get(url).headers(ctx.headers());
        let (_, envelope) =
            fetch_envelope::<FingerSpiData>(request, "fingerprint fetch", self.timeout).await?;
        let data = envelope.into_data()?;

        tracing::debug!(
            session_id = ctx.session_id,
            has_buvid3 = !data.b_3.is_empty(),
            "Fingerprint fetched"
        );
        Ok(data.b_3)
    }
}
