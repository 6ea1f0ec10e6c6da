//! TV QR login flow
//!
//! Signed form POSTs against the TV passport endpoints. A confirmed login
//! returns tokens and a cookie list in the body instead of `Set-Cookie`.

use super::{
    fingerprint::FingerprintClient,
    network::{CallContext, fetch_envelope},
    probe::CredentialProbe,
    provider::{CredentialPipeline, LoginProvider},
    sign::{Signer, params},
};
use crate::{
    Error, Result,
    config::Settings,
    types::{
        ClientKind, GenerateResult, PollOutcome,
        internal::{TvAuthCodeData, TvPollData},
        response::{CODE_NOT_SCANNED, CODE_SUCCESS},
    },
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// TV code for "waiting for scan"
pub const TV_CODE_NOT_SCANNED: i64 = 86039;

const LOCAL_ID: &str = "0";

/// Map a TV status code onto the shared code space
pub fn normalize_code(code: i64) -> i64 {
    if code == TV_CODE_NOT_SCANNED {
        CODE_NOT_SCANNED
    } else {
        code
    }
}

/// TV QR login client
#[derive(Debug, Clone)]
pub struct TvLoginClient {
    /// HTTP client
    http: Client,
    /// Base URL of the passport API
    passport_base_url: String,
    /// Signs every form body with the TV app key pair
    signer: Signer,
    /// Upper bound for the auth code call
    generate_timeout: Duration,
    /// Upper bound for each status poll
    poll_timeout: Duration,
    /// Fingerprint, merge and probe steps run after a confirmed login
    pipeline: CredentialPipeline,
}

impl TvLoginClient {
    pub fn new(http: Client, settings: &Settings) -> Self {
        let polling = &settings.polling;
        let provider = &settings.provider;
        let fingerprint = FingerprintClient::new(
            http.clone(),
            provider.api_base_url.clone(),
            polling.poll_timeout(),
        );
        let probe = polling.validate_credential.then(|| {
            CredentialProbe::new(
                http.clone(),
                provider.api_base_url.clone(),
                polling.probe_timeout(),
            )
        });

        Self {
            http,
            passport_base_url: provider.passport_base_url.trim_end_matches('/').to_string(),
            signer: Signer::new(provider.tv_appkey.clone(), provider.tv_appsec.clone()),
            generate_timeout: polling.generate_timeout(),
            poll_timeout: polling.poll_timeout(),
            pipeline: CredentialPipeline::new(fingerprint, probe),
        }
    }

    async fn request_generate(&self, ctx: &CallContext) -> Result<GenerateResult> {
        let url = format!("{}/x/passport-tv-login/qrcode/auth_code", self.passport_base_url);
        let form = self.signer.sign_request(params([("local_id", LOCAL_ID)]));
        let request = self.http.post(url).headers(ctx.headers()).form(&form);

        let (_, envelope) =
            fetch_envelope::<TvAuthCodeData>(request, "tv auth_code", self.generate_timeout)
                .await?;

        if !envelope.is_success() {
            return Ok(GenerateResult::failure(envelope.code, envelope.message));
        }

        let data = envelope
            .data
            .ok_or_else(|| Error::malformed_response("auth_code response has no data"))?;
        if data.auth_code.is_empty() {
            return Err(Error::malformed_response("auth_code response has an empty key"));
        }
        Ok(GenerateResult {
            code: CODE_SUCCESS,
            msg: envelope.message,
            url: data.url,
            key: data.auth_code,
        })
    }

    async fn request_poll(&self, ctx: &CallContext, key: &str) -> Result<PollOutcome> {
        let url = format!("{}/x/passport-tv-login/qrcode/poll", self.passport_base_url);
        let form = self
            .signer
            .sign_request(params([("auth_code", key), ("local_id", LOCAL_ID)]));
        let request = self.http.post(url).headers(ctx.headers()).form(&form);

        let (_, envelope) =
            fetch_envelope::<TvPollData>(request, "tv poll", self.poll_timeout).await?;

        let code = normalize_code(envelope.code);
        if code != CODE_SUCCESS {
            return Ok(PollOutcome::new(code, envelope.message));
        }

        let data = envelope
            .data
            .ok_or_else(|| Error::session("TV login confirmed without a token payload"))?;
        tracing::info!(
            session_id = ctx.session_id,
            mid = data.mid,
            "TV login confirmed, assembling credential"
        );

        let cookies: Vec<String> = data
            .cookie_info
            .as_ref()
            .map(|info| {
                info.cookies
                    .iter()
                    .map(|c| format!("{}={}", c.name, c.value))
                    .collect()
            })
            .unwrap_or_default();
        let tokens = token_fields(&data);

        let (cookie, validation) = self.pipeline.complete(ctx, cookies, &tokens).await;
        let outcome = PollOutcome::new(code, envelope.message).with_cookie(cookie);
        Ok(match validation {
            Some(validation) => outcome.with_validation(validation),
            None => outcome,
        })
    }
}

/// Token fields merged into the credential after the cookies
fn token_fields(data: &TvPollData) -> Vec<(&'static str, String)> {
    vec![
        ("access_token", data.access_token.clone()),
        ("refresh_token", data.refresh_token.clone()),
        ("mid", data.mid.to_string()),
        ("expires_in", data.expires_in.to_string()),
    ]
}

#[async_trait]
impl LoginProvider for TvLoginClient {
    fn kind(&self) -> ClientKind {
        ClientKind::Tv
    }

    async fn generate(&self, ctx: &CallContext) -> GenerateResult {
        match self.request_generate(ctx).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(session_id = ctx.session_id, "TV auth code request failed: {}", e);
                GenerateResult::transport(format!(
                    "Request failed, possibly network trouble or rate limiting: {}",
                    e
                ))
            }
        }
    }

    async fn poll(&self, ctx: &CallContext, key: &str) -> Result<PollOutcome> {
        match self.request_poll(ctx, key).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_transport() => {
                tracing::warn!(session_id = ctx.session_id, "TV poll failed: {}", e);
                Ok(PollOutcome::transport(format!("Poll failed: {}", e)))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code(86039), 86101);
        assert_eq!(normalize_code(86090), 86090);
        assert_eq!(normalize_code(86038), 86038);
        assert_eq!(normalize_code(0), 0);
    }

    #[test]
    fn test_token_fields_order() {
        let data = TvPollData {
            mid: 42,
            access_token: "at".to_string(),
            refresh_token: "rt".to_string(),
            expires_in: 100,
            cookie_info: None,
        };
        let fields = token_fields(&data);
        let names: Vec<_> = fields.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["access_token", "refresh_token", "mid", "expires_in"]);
        assert_eq!(fields[2].1, "42");
    }
}
