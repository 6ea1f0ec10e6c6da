//! Admission control for the QR stream
//!
//! Decides from the request's `Host`, `Origin` and `Referer` headers whether
//! a page may open a login stream. Precedence: development mode, explicit
//! allow-list, same-host referer, wildcard, deny.

use crate::origin::{TrustPolicy, normalize_origin, url_host};
use axum::http::{
    HeaderMap, HeaderName,
    header::{HOST, ORIGIN, REFERER},
};

/// Why a request was admitted or refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    Development,
    AllowListed,
    SameHost,
    Wildcard,
    Denied,
}

impl AdmissionDecision {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Self::Denied)
    }
}

/// Headers admission looks at
#[derive(Debug, Clone, Default)]
pub struct RequestOrigin {
    pub host: Option<String>,
    pub origin: Option<String>,
    pub referer: Option<String>,
}

impl RequestOrigin {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let get = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Self {
            host: get(HOST),
            origin: get(ORIGIN),
            referer: get(REFERER),
        }
    }

    /// Origin of the requesting page: the `Origin` header, else the referer's
    fn page_origin(&self) -> Option<String> {
        self.origin
            .as_deref()
            .and_then(normalize_origin)
            .or_else(|| self.referer.as_deref().and_then(normalize_origin))
    }
}

/// Decide whether `request` may open a stream
pub fn decide(request: &RequestOrigin, policy: &TrustPolicy, development: bool) -> AdmissionDecision {
    if development {
        return AdmissionDecision::Development;
    }

    if policy.has_allow_list()
        && request
            .page_origin()
            .is_some_and(|origin| policy.is_listed(&origin))
    {
        return AdmissionDecision::AllowListed;
    }

    let same_host = match (&request.host, request.referer.as_deref().and_then(url_host)) {
        (Some(host), Some(referer_host)) => host.eq_ignore_ascii_case(&referer_host),
        _ => false,
    };
    if same_host {
        return AdmissionDecision::SameHost;
    }

    if policy.trusts_all() {
        return AdmissionDecision::Wildcard;
    }

    AdmissionDecision::Denied
}
