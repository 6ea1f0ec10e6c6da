//! HTTP request handlers
//!
//! Implementation of HTTP endpoints for the QR login server.

use crate::{
    Error,
    server::{
        admission::{self, RequestOrigin},
        app::AppState,
        stream::{self, StreamRequest},
    },
    types::{ConvertCookieRequest, ConvertCookieResponse, ErrorResponse, PingResponse, QrQuery},
    utils::{cookie_convert, version},
};
use axum::{
    extract::{Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::USER_AGENT},
    response::{IntoResponse, Json, Response},
};

/// Headers consulted, in order, for the client address behind a proxy
const FORWARDED_FOR_HEADERS: [&str; 3] = ["cf-connecting-ip", "x-forwarded-for", "x-real-ip"];

const LAST_EVENT_ID: &str = "last-event-id";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Client address as reported by the fronting proxy
fn remote_address(headers: &HeaderMap) -> String {
    FORWARDED_FOR_HEADERS
        .iter()
        .find_map(|name| header_str(headers, name))
        .unwrap_or("unknown")
        .to_string()
}

/// QR login stream endpoint
///
/// GET /api/qr?client=web|tv
///
/// Streams `generate`, `poll` and `end` events for one login attempt.
/// Requests refused by admission control get an empty 403.
#[axum_macros::debug_handler]
pub async fn qr_stream(
    State(state): State<AppState>,
    Query(query): Query<QrQuery>,
    headers: HeaderMap,
) -> Response {
    let origin = RequestOrigin::from_headers(&headers);
    let decision = admission::decide(
        &origin,
        &state.trust,
        state.settings.server.development,
    );

    if !decision.is_allowed() {
        tracing::warn!(
            host = ?origin.host,
            origin = ?origin.origin,
            referer = ?origin.referer,
            "QR stream refused by admission control"
        );
        return StatusCode::FORBIDDEN.into_response();
    }
    tracing::debug!(decision = ?decision, client = %query.client, "QR stream admitted");

    let request = StreamRequest {
        client: query.client,
        resume_key: header_str(&headers, LAST_EVENT_ID).map(str::to_string),
        remote_address: remote_address(&headers),
        user_agent: header_str(&headers, USER_AGENT.as_str())
            .unwrap_or_default()
            .to_string(),
    };
    stream::open(&state, request).await
}

/// Cookie conversion endpoint
///
/// POST /api/convert
///
/// Converts a cookie string or list into a cookie-editor import document.
#[axum_macros::debug_handler]
pub async fn convert_cookie(
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<ConvertCookieResponse>, (StatusCode, Json<ErrorResponse>)> {
    let Json(value) = body.map_err(|e| {
        tracing::warn!("Rejected cookie conversion body: {}", e);
        error_response(&Error::invalid_input(e.body_text()))
    })?;

    let request = ConvertCookieRequest::from_value(value).map_err(|e| error_response(&e))?;
    match cookie_convert::convert(&request) {
        Ok(response) => {
            tracing::debug!(count = response.cookies().len(), "Converted cookies");
            Ok(Json(response))
        }
        Err(e) => {
            tracing::error!("Failed to convert cookies: {}", e);
            Err(error_response(&e))
        }
    }
}

/// Map an error to a status code and JSON body
fn error_response(error: &Error) -> (StatusCode, Json<ErrorResponse>) {
    let status = match error {
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse::new(format_error(error))))
}

fn format_error(error: &Error) -> String {
    match error {
        Error::InvalidInput(msg) => msg.clone(),
        Error::Internal(_) | Error::Session(_) => "Failed to process cookies".to_string(),
        other => other.to_string(),
    }
}

/// Ping endpoint for health checks
///
/// GET /ping
///
/// Returns server status, uptime and the number of open QR streams.
#[axum_macros::debug_handler]
pub async fn ping(State(state): State<AppState>) -> Json<PingResponse> {
    let uptime = state.start_time.elapsed().as_secs();
    let active = state.registry.len().await;
    let response = PingResponse::new(uptime, version::get_version(), active);

    tracing::debug!(
        "Ping response: uptime={}s, version={}, active_sessions={}",
        uptime,
        version::get_version(),
        active
    );
    Json(response)
}
