//! Login provider seam
//!
//! [`LoginProvider`] is the contract both login flows implement and the
//! poller drives. Expected transport and provider conditions are folded into
//! the returned values; `Err` from [`LoginProvider::poll`] means something
//! unexpected happened and the session should end.

use super::{
    cookie,
    fingerprint::FingerprintClient,
    network::CallContext,
    probe::CredentialProbe,
};
use crate::{
    Result,
    types::{ClientKind, GenerateResult, PollOutcome, ValidationResult},
};
use async_trait::async_trait;
use std::sync::Arc;

/// One QR login flow against the remote provider
#[async_trait]
pub trait LoginProvider: Send + Sync + std::fmt::Debug {
    /// Which flow this provider implements
    fn kind(&self) -> ClientKind;

    /// Request a new challenge
    async fn generate(&self, ctx: &CallContext) -> GenerateResult;

    /// Check the status of the challenge identified by `key`
    async fn poll(&self, ctx: &CallContext, key: &str) -> Result<PollOutcome>;
}

/// Providers for every supported flow
#[derive(Debug, Clone)]
pub struct ProviderSet {
    /// Browser flow
    pub web: Arc<dyn LoginProvider>,
    /// TV flow
    pub tv: Arc<dyn LoginProvider>,
}

impl ProviderSet {
    pub fn new(web: Arc<dyn LoginProvider>, tv: Arc<dyn LoginProvider>) -> Self {
        Self { web, tv }
    }

    pub fn get(&self, kind: ClientKind) -> Arc<dyn LoginProvider> {
        match kind {
            ClientKind::Web => Arc::clone(&self.web),
            ClientKind::Tv => Arc::clone(&self.tv),
        }
    }
}

/// Post-success steps shared by both flows: fingerprint, merge, probe
#[derive(Debug, Clone)]
pub struct CredentialPipeline {
    /// Source of the `buvid3` field
    fingerprint: FingerprintClient,
    /// Validity check, absent when disabled
    probe: Option<CredentialProbe>,
}

impl CredentialPipeline {
    pub fn new(fingerprint: FingerprintClient, probe: Option<CredentialProbe>) -> Self {
        Self { fingerprint, probe }
    }

    /// Build the credential and, when enabled, probe it.
    ///
    /// A failed fingerprint fetch is logged and the credential is assembled
    /// from the remaining fragments.
    pub async fn complete(
        &self,
        ctx: &CallContext,
        cookies: Vec<String>,
        tokens: &[(&str, String)],
    ) -> (String, Option<ValidationResult>) {
        let fingerprint = match self.fingerprint.fetch(ctx).await {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(
                    session_id = ctx.session_id,
                    "Fingerprint fetch failed, continuing without it: {}",
                    e
                );
                None
            }
        };

        let credential = cookie::assemble(fingerprint.as_deref(), cookies, tokens).to_string();
        tracing::info!(
            session_id = ctx.session_id,
            credential_len = credential.len(),
            "Credential assembled"
        );

        let validation = match &self.probe {
            Some(probe) => Some(probe.check(ctx, &credential).await),
            None => None,
        };

        (credential, validation)
    }
}
