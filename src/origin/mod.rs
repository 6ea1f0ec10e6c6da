//! Trusted origin policy
//!
//! One policy type is shared by server-side admission control and the
//! client-side credential broadcaster, so both read the same
//! `TRUST_ORIGIN` list the same way.

use url::Url;

/// Wildcard entry that trusts every origin
pub const WILDCARD: &str = "*";

/// Parsed trusted-origin configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustPolicy {
    trust_all: bool,
    origins: Vec<String>,
}

impl TrustPolicy {
    /// Build a policy from raw configured entries.
    ///
    /// Entries are normalized to their `scheme://host[:port]` form; `*` turns on
    /// wildcard trust and unparsable entries are ignored.
    pub fn from_origins<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut policy = Self::default();
        for entry in entries {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            if entry == WILDCARD {
                policy.trust_all = true;
                continue;
            }
            match normalize_origin(entry) {
                Some(origin) if !policy.origins.contains(&origin) => policy.origins.push(origin),
                Some(_) => {}
                None => tracing::warn!("Ignoring unparsable trusted origin: {}", entry),
            }
        }
        policy
    }

    /// Policy that trusts every origin
    pub fn wildcard() -> Self {
        Self {
            trust_all: true,
            origins: Vec::new(),
        }
    }

    pub fn trusts_all(&self) -> bool {
        self.trust_all
    }

    /// Explicitly listed origins, normalized
    pub fn origins(&self) -> &[String] {
        &self.origins
    }

    pub fn has_allow_list(&self) -> bool {
        !self.origins.is_empty()
    }

    /// Exact match against the explicit allow-list (wildcard not considered)
    pub fn is_listed(&self, origin: &str) -> bool {
        normalize_origin(origin).is_some_and(|o| self.origins.contains(&o))
    }
}

/// Reduce a URL or origin string to its serialized origin.
///
/// Returns `None` for unparsable input and for opaque origins.
pub fn normalize_origin(value: &str) -> Option<String> {
    let url = Url::parse(value.trim()).ok()?;
    let origin = url.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

/// Host (with port, if any) of a URL string, as a `Host` header would carry it
pub fn url_host(value: &str) -> Option<String> {
    let url = Url::parse(value.trim()).ok()?;
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}
