//! QR login sessions
//!
//! Everything between an inbound stream request and the remote provider:
//! request signing, credential assembly, the two login flows, the poll state
//! machine and the registry of open sessions.

pub mod cookie;
pub mod fingerprint;
pub mod network;
pub mod poller;
pub mod probe;
pub mod provider;
pub mod registry;
pub mod sign;
pub mod tv;
pub mod web;

pub use cookie::Credential;
pub use network::CallContext;
pub use poller::{EndReason, PollerConfig, QrPoller, SessionEvent, SessionState};
pub use provider::{CredentialPipeline, LoginProvider, ProviderSet};
pub use registry::{ClientSession, RegistryStats, SessionRegistry};
pub use sign::Signer;
pub use tv::TvLoginClient;
pub use web::WebLoginClient;

use crate::{Result, config::Settings};
use std::sync::Arc;

/// Build both login flows over one shared HTTP client
pub fn default_providers(settings: &Settings) -> Result<ProviderSet> {
    let http = network::build_client()?;
    Ok(ProviderSet::new(
        Arc::new(WebLoginClient::new(http.clone(), settings)),
        Arc::new(TvLoginClient::new(http, settings)),
    ))
}
