//! Cookie string to cookie-editor conversion
//!
//! Turns a `name=value; name=value` header string, or a loosely filled list
//! of cookie objects, into fully attributed cookies ready for import into a
//! browser cookie editor.

use crate::{
    Error, Result,
    types::{ConvertCookieRequest, ConvertCookieResponse, ConvertedCookie, CookieEntry, CookieInput},
};

/// Domain used when nothing more specific is known
pub const DEFAULT_DOMAIN: &str = ".bilibili.com";

const ANALYTICS_DOMAIN: &str = ".hm.baidu.com";
const COMIC_DOMAIN: &str = ".bilicomic.com";
const GAME_DOMAIN: &str = ".biligame.com";

/// Lifetime given to string-parsed cookies without an explicit expiry
const DEFAULT_LIFETIME_SECS: f64 = 86_400.0 * 30.0;

fn is_site_cookie(name: &str) -> bool {
    ["bili_", "SESSDATA", "DedeUserID", "buvid"]
        .iter()
        .any(|needle| name.contains(needle))
        || matches!(name, "sid" | "fingerprint" | "b_lsid" | "b_nut" | "_uuid")
}

/// Guess the domain a cookie belongs to from its name
pub fn guess_domain(name: &str, fallback: Option<&str>) -> String {
    if name.starts_with("HMACCOUNT") || name.starts_with("Hm_") {
        return ANALYTICS_DOMAIN.to_string();
    }

    if is_site_cookie(name) {
        let domain = if name.contains("comic") {
            COMIC_DOMAIN
        } else if name.contains("game") {
            GAME_DOMAIN
        } else {
            DEFAULT_DOMAIN
        };
        return domain.to_string();
    }

    fallback
        .filter(|d| !d.is_empty())
        .unwrap_or(DEFAULT_DOMAIN)
        .to_string()
}

/// Convert a request body, with `now` as the current Unix time in seconds
pub fn convert_at(request: &ConvertCookieRequest, now: f64) -> Result<ConvertCookieResponse> {
    let cookies = match &request.cookies {
        Some(CookieInput::Text(text)) if text.trim().is_empty() => {
            return Err(Error::invalid_input("Invalid cookie data: `cookies` is empty"));
        }
        Some(CookieInput::Text(text)) => from_text(text, request, now),
        Some(CookieInput::List(entries)) => entries
            .iter()
            .map(|entry| from_entry(entry, request.domain.as_deref()))
            .collect(),
        None => return Err(Error::invalid_input("Invalid cookie data: `cookies` is required")),
    };
    Ok(ConvertCookieResponse::new(cookies))
}

/// [`convert_at`] with the current time
pub fn convert(request: &ConvertCookieRequest) -> Result<ConvertCookieResponse> {
    convert_at(request, chrono::Utc::now().timestamp_millis() as f64 / 1000.0)
}

fn from_text(text: &str, request: &ConvertCookieRequest, now: f64) -> Vec<ConvertedCookie> {
    text.split("; ")
        .filter(|piece| !piece.trim().is_empty())
        .map(|piece| {
            let (name, value) = piece.split_once('=').unwrap_or((piece, ""));
            let domain = guess_domain(name, request.domain.as_deref());
            let session_cookie = name == "SESSDATA";
            let same_site = if domain == DEFAULT_DOMAIN { "Lax" } else { "None" };

            ConvertedCookie {
                name: name.to_string(),
                value: value.to_string(),
                path: request
                    .path
                    .clone()
                    .filter(|p| !p.is_empty())
                    .unwrap_or_else(|| "/".to_string()),
                expires: request
                    .expires
                    .filter(|e| *e != 0.0)
                    .unwrap_or(now + DEFAULT_LIFETIME_SECS),
                http_only: session_cookie,
                secure: session_cookie,
                same_site: same_site.to_string(),
                domain,
            }
        })
        .collect()
}

fn from_entry(entry: &CookieEntry, fallback_domain: Option<&str>) -> ConvertedCookie {
    ConvertedCookie {
        name: entry.name.clone(),
        value: entry.value.clone(),
        domain: entry
            .domain
            .clone()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| guess_domain(&entry.name, fallback_domain)),
        path: entry
            .path
            .clone()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "/".to_string()),
        expires: entry.expires.filter(|e| *e != 0.0).unwrap_or(-1.0),
        http_only: entry.http_only.unwrap_or(false),
        secure: entry.secure.unwrap_or(false),
        same_site: entry
            .same_site
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Lax".to_string()),
    }
}
