//! QR login event stream
//!
//! Binds one SSE response to one [`QrPoller`]. The poller runs in its own
//! task under a supervisor that guarantees a single `end` event and a single
//! registry removal. The response body owns a drop guard on the session's
//! cancellation token, so a client disconnect stops the poller before its
//! next remote call.

use super::app::AppState;
use crate::{
    session::{CallContext, EndReason, PollerConfig, QrPoller, SessionEvent},
    types::ClientKind,
};
use axum::{
    http::{HeaderValue, header::CONTENT_TYPE},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

/// SSE event names
pub const EVENT_GENERATE: &str = "generate";
pub const EVENT_POLL: &str = "poll";
pub const EVENT_END: &str = "end";

const EVENT_BUFFER: usize = 16;

/// Everything the controller needs from the inbound request
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub client: ClientKind,
    /// `Last-Event-ID`: the challenge key of an interrupted stream
    pub resume_key: Option<String>,
    pub remote_address: String,
    pub user_agent: String,
}

/// Register a session, start its poller and return the SSE response
pub async fn open(state: &AppState, request: StreamRequest) -> Response {
    let registry = state.registry.clone();
    let id = registry
        .register(&request.remote_address, &request.user_agent, request.client)
        .await;

    if let Some(key) = &request.resume_key {
        tracing::info!(session_id = id, last_event_id = %key, "Client reconnected");
    }

    let provider = state.providers.get(request.client);
    let config = PollerConfig::from(&state.settings.polling);
    let mut poller = QrPoller::new(provider, CallContext::new(id, request.user_agent), config)
        .with_registry(registry.clone());

    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);

    let worker_cancel = cancel.clone();
    let worker_tx = tx.clone();
    let resume_key = request.resume_key;
    tokio::spawn(async move {
        let worker = tokio::spawn(async move {
            poller.run(resume_key, &worker_cancel, &worker_tx).await
        });

        let reason = match worker.await {
            Ok(Ok(reason)) => reason,
            Ok(Err(e)) => EndReason::Internal(e.to_string()),
            Err(e) if e.is_panic() => {
                tracing::error!(session_id = id, "Session task panicked");
                EndReason::Internal("session task panicked".to_string())
            }
            Err(_) => EndReason::Cancelled,
        };

        tracing::info!(session_id = id, reason = %reason, "Session finished");
        if reason != EndReason::Cancelled {
            // The client may already be gone.
            let _ = tx.send(SessionEvent::Finished(reason)).await;
        }
        registry.remove(id).await;
    });

    let guard = cancel.drop_guard();
    let stream = ReceiverStream::new(rx).map(move |event| {
        let _guard = &guard;
        to_sse_event(event)
    });

    let mut response = Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response();
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream; charset=utf-8"),
    );
    response
}

/// Whether `id` can be carried in an SSE `id:` field
fn is_valid_event_id(id: &str) -> bool {
    !id.is_empty() && !id.contains(['\n', '\r', '\0'])
}

/// Render a session event as an SSE frame
pub fn to_sse_event(event: SessionEvent) -> Result<Event, axum::Error> {
    match event {
        SessionEvent::Generated(generated) => {
            let mut frame = Event::default().event(EVENT_GENERATE);
            if is_valid_event_id(&generated.key) {
                frame = frame.id(generated.key.as_str());
            }
            frame.json_data(&generated)
        }
        SessionEvent::Polled(outcome) => Event::default().event(EVENT_POLL).json_data(&outcome),
        SessionEvent::Finished(reason) => {
            Ok(Event::default().event(EVENT_END).data(reason.message()))
        }
    }
}
