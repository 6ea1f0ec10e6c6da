//! Request signing for the TV login flow
//!
//! The TV endpoints authenticate each request with an MD5 checksum over the
//! sorted parameter set followed by the app secret. This matches the
//! provider's existing scheme; it is not a security boundary of this service.

use std::collections::BTreeMap;

/// Public app key of the TV client
pub const TV_APPKEY: &str = "4409e2ce8ffd12b8";
/// Secret paired with [`TV_APPKEY`]
pub const TV_APPSEC: &str = "59b43e04ad6965f34319062b478f83dd";

/// Request parameters, kept sorted by key
pub type Params = BTreeMap<String, String>;

/// Compute the signature of `params` with `appsec`.
///
/// Keys are sorted lexicographically, joined as `k=v` with `&`, the secret
/// is appended and the result is MD5 hashed to lowercase hex.
pub fn sign(params: &Params, appsec: &str) -> String {
    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    format!("{:x}", md5::compute(format!("{}{}", query, appsec)))
}

/// Signs parameter sets for one app key pair
#[derive(Debug, Clone)]
pub struct Signer {
    appkey: String,
    appsec: String,
}

impl Signer {
    pub fn new(appkey: impl Into<String>, appsec: impl Into<String>) -> Self {
        Self {
            appkey: appkey.into(),
            appsec: appsec.into(),
        }
    }

    /// Signer for the TV client key pair
    pub fn tv() -> Self {
        Self::new(TV_APPKEY, TV_APPSEC)
    }

    pub fn appkey(&self) -> &str {
        &self.appkey
    }

    /// Signature of `params` as given
    pub fn sign(&self, params: &Params) -> String {
        sign(params, &self.appsec)
    }

    /// Add `appkey` and the current Unix time, then append `sign`
    pub fn sign_request(&self, params: Params) -> Params {
        self.sign_request_at(params, chrono::Utc::now().timestamp())
    }

    /// [`Signer::sign_request`] with an explicit timestamp
    pub fn sign_request_at(&self, mut params: Params, ts: i64) -> Params {
        params.insert("appkey".to_string(), self.appkey.clone());
        params.insert("ts".to_string(), ts.to_string());
        let signature = self.sign(&params);
        params.insert("sign".to_string(), signature);
        params
    }
}

impl Default for Signer {
    fn default() -> Self {
        Self::tv()
    }
}

/// Build a [`Params`] map from string pairs
pub fn params<'a, I>(pairs: I) -> Params
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
