//! Outbound HTTP plumbing shared by the login clients
//!
//! Every remote call goes through [`with_deadline`], so no await on the
//! provider can outlive its configured bound.

use crate::{Error, Result, types::ApiEnvelope};
use reqwest::{
    Client, RequestBuilder,
    header::{HeaderMap, HeaderValue, ORIGIN, REFERER, SET_COOKIE, USER_AGENT},
};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;

/// User agent sent upstream when the inbound request carries none
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

const SITE_ORIGIN: &str = "https://www.bilibili.com";
const SITE_REFERER: &str = "https://www.bilibili.com/";

/// Per-request data the clients forward upstream
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Bookkeeping id of the owning QR session, used in logs
    pub session_id: u64,
    /// User agent of the inbound request
    pub user_agent: String,
}

impl CallContext {
    pub fn new(session_id: u64, user_agent: impl Into<String>) -> Self {
        Self {
            session_id,
            user_agent: user_agent.into(),
        }
    }

    /// Headers that make upstream calls look like they come from the site itself
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let user_agent = HeaderValue::from_str(&self.user_agent)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_USER_AGENT));
        headers.insert(USER_AGENT, user_agent);
        headers.insert(ORIGIN, HeaderValue::from_static(SITE_ORIGIN));
        headers.insert(REFERER, HeaderValue::from_static(SITE_REFERER));
        headers
    }
}

/// Build the shared HTTP client
pub fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(DEFAULT_USER_AGENT)
        .build()
        .map_err(Error::from)
}

/// Run `fut`, failing with [`Error::Timeout`] once `limit` elapses.
///
/// The inner future is dropped on timeout, which aborts the request.
pub async fn with_deadline<F, T>(operation: &str, limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| Error::timeout(operation, limit.as_secs()))?
}

/// Send a request and decode the provider envelope, bounded by `limit`.
///
/// Non-2xx statuses become [`Error::HttpStatus`]. The response headers are
/// returned alongside the envelope so callers can read `Set-Cookie`.
pub async fn fetch_envelope<T>(
    request: RequestBuilder,
    operation: &str,
    limit: Duration,
) -> Result<(HeaderMap, ApiEnvelope<T>)>
where
    T: DeserializeOwned,
{
    with_deadline(operation, limit, async {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::http_status(status));
        }
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        tracing::trace!(operation, bytes = body.len(), "provider response received");
        let envelope = serde_json::from_slice(&body)?;
        Ok((headers, envelope))
    })
    .await
}

/// All `Set-Cookie` header values that are valid UTF-8
pub fn set_cookies(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_headers() {
        let ctx = CallContext::new(1, "TestAgent/1.0");
        let headers = ctx.headers();
        assert_eq!(headers[USER_AGENT], "TestAgent/1.0");
        assert_eq!(headers[ORIGIN], SITE_ORIGIN);
        assert_eq!(headers[REFERER], SITE_REFERER);
    }

    #[test]
    fn test_context_headers_fallback_user_agent() {
        let ctx = CallContext::new(1, "");
        assert_eq!(ctx.headers()[USER_AGENT], DEFAULT_USER_AGENT);

        let ctx = CallContext::new(1, "bad\nagent");
        assert_eq!(ctx.headers()[USER_AGENT], DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_set_cookies() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("a=1; Path=/"));
        headers.append(SET_COOKIE, HeaderValue::from_static("b=2"));
        assert_eq!(set_cookies(&headers), vec!["a=1; Path=/", "b=2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_deadline_times_out() {
        let result: Result<()> = with_deadline("slow call", Duration::from_secs(10), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, Error::Timeout { seconds: 10, .. }));
    }

    #[tokio::test]
    async fn test_with_deadline_passes_through() {
        let result = with_deadline("fast call", Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn test_build_client() {
        assert!(build_client().is_ok());
    }
}
