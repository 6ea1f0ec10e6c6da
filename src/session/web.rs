//! Browser QR login flow
//!
//! Plain GET requests against the passport API. The login cookies arrive as
//! `Set-Cookie` headers on the successful poll response.

use super::{
    fingerprint::FingerprintClient,
    network::{CallContext, fetch_envelope, set_cookies},
    probe::CredentialProbe,
    provider::{CredentialPipeline, LoginProvider},
};
use crate::{
    Error, Result,
    config::Settings,
    types::{
        ClientKind, GenerateResult, PollOutcome,
        internal::{WebGenerateData, WebPollData},
        response::{CODE_EXPIRED, CODE_SUCCESS},
    },
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};

const SOURCE: &str = "main-fe-header";

/// Web QR login client
#[derive(Debug, Clone)]
pub struct WebLoginClient {
    /// HTTP client
    http: Client,
    /// Base URL of the passport API
    passport_base_url: String,
    /// Upper bound for the challenge-generate call
    generate_timeout: Duration,
    /// Upper bound for each status poll
    poll_timeout: Duration,
    /// Fingerprint, merge and probe steps run after a confirmed login
    pipeline: CredentialPipeline,
}

impl WebLoginClient {
    /// Create a client from settings, sharing `http`
    pub fn new(http: Client, settings: &Settings) -> Self {
        let polling = &settings.polling;
        let api_base_url = settings.provider.api_base_url.clone();
        let fingerprint =
            FingerprintClient::new(http.clone(), api_base_url.clone(), polling.poll_timeout());
        let probe = polling.validate_credential.then(|| {
            CredentialProbe::new(http.clone(), api_base_url, polling.probe_timeout())
        });

        Self {
            http,
            passport_base_url: settings.provider.passport_base_url.trim_end_matches('/').to_string(),
            generate_timeout: polling.generate_timeout(),
            poll_timeout: polling.poll_timeout(),
            pipeline: CredentialPipeline::new(fingerprint, probe),
        }
    }

    async fn request_generate(&self, ctx: &CallContext) -> Result<GenerateResult> {
        let url = format!("{}/x/passport-login/web/qrcode/generate", self.passport_base_url);
        let request = self
            .http
            .get(url)
            .query(&[("source", SOURCE)])
            .headers(ctx.headers());

        let (_, envelope) =
            fetch_envelope::<WebGenerateData>(request, "qrcode generate", self.generate_timeout)
                .await?;

        if !envelope.is_success() {
            return Ok(GenerateResult::failure(envelope.code, envelope.message));
        }

        let message = envelope.message.clone();
        let data = envelope.into_data()?;
        if data.qrcode_key.is_empty() {
            return Err(Error::malformed_response("qrcode generate returned an empty key"));
        }
        Ok(GenerateResult {
            code: CODE_SUCCESS,
            msg: message,
            url: data.url,
            key: data.qrcode_key,
        })
    }

    async fn request_poll(&self, ctx: &CallContext, key: &str) -> Result<PollOutcome> {
        let url = format!("{}/x/passport-login/web/qrcode/poll", self.passport_base_url);
        let request = self
            .http
            .get(url)
            .query(&[("qrcode_key", key), ("source", SOURCE)])
            .headers(ctx.headers());

        let (headers, envelope) =
            fetch_envelope::<WebPollData>(request, "qrcode poll", self.poll_timeout).await?;

        // A zero envelope code carries the login status in `data`.
        let outcome = if envelope.is_success() {
            let data = envelope.into_data()?;
            PollOutcome::new(data.code, data.message)
        } else {
            PollOutcome::new(envelope.code, envelope.message)
        };

        if outcome.code != CODE_SUCCESS {
            if outcome.code == CODE_EXPIRED {
                tracing::info!(session_id = ctx.session_id, "QR code expired");
            }
            return Ok(outcome);
        }

        tracing::info!(session_id = ctx.session_id, "Login confirmed, assembling credential");
        let (cookie, validation) = self
            .pipeline
            .complete(ctx, set_cookies(&headers), &[])
            .await;

        let outcome = outcome.with_cookie(cookie);
        Ok(match validation {
            Some(validation) => outcome.with_validation(validation),
            None => outcome,
        })
    }
}

#[async_trait]
impl LoginProvider for WebLoginClient {
    fn kind(&self) -> ClientKind {
        ClientKind::Web
    }

    async fn generate(&self, ctx: &CallContext) -> GenerateResult {
        let started = Instant::now();
        match self.request_generate(ctx).await {
            Ok(result) => {
                tracing::debug!(
                    session_id = ctx.session_id,
                    code = result.code,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "QR code generate returned"
                );
                result
            }
            Err(e) => {
                tracing::warn!(session_id = ctx.session_id, "QR code generate failed: {}", e);
                GenerateResult::transport(format!("Request failed, possibly network trouble or rate limiting: {}", e))
            }
        }
    }

    async fn poll(&self, ctx: &CallContext, key: &str) -> Result<PollOutcome> {
        match self.request_poll(ctx, key).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_transport() => {
                tracing::warn!(session_id = ctx.session_id, "QR code poll failed: {}", e);
                Ok(PollOutcome::transport(format!("Poll failed: {}", e)))
            }
            Err(e) => Err(e),
        }
    }
}
