//! QR stream consumer
//!
//! Reads the `generate`/`poll`/`end` events of a QR login stream, tracks the
//! display status, and produces the broadcast plan once a credential
//! arrives.

use super::policy::{BroadcastPlan, PageContext, plan_broadcast};
use crate::{
    Result,
    origin::TrustPolicy,
    types::{
        GenerateResult, PollOutcome, PollStatus, ValidationOutcome, ValidationResult,
    },
};

/// What the QR page shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QrStatus {
    Loading,
    /// Code shown, waiting for a scan
    Wait,
    Scanned,
    Expired,
    Success,
    Error,
}

/// One server-sent event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
    pub id: Option<String>,
}

/// Split an event-stream body into frames.
///
/// Comment lines (keep-alives) are skipped, and so are frames that carry
/// neither an event name nor data.
pub fn parse_frames(body: &str) -> Vec<SseFrame> {
    let body = body.replace("\r\n", "\n");
    let mut frames = Vec::new();

    for block in body.split("\n\n") {
        let mut frame = SseFrame::default();
        let mut data: Vec<&str> = Vec::new();
        let mut seen = false;

        for line in block.lines() {
            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            let (field, value) = line.split_once(':').unwrap_or((line, ""));
            let value = value.strip_prefix(' ').unwrap_or(value);
            match field {
                "event" => {
                    frame.event = value.to_string();
                    seen = true;
                }
                "data" => {
                    data.push(value);
                    seen = true;
                }
                "id" => frame.id = Some(value.to_string()),
                _ => {}
            }
        }

        if seen {
            if frame.event.is_empty() {
                frame.event = "message".to_string();
            }
            frame.data = data.join("\n");
            frames.push(frame);
        }
    }
    frames
}

/// Stream consumer for one QR page
#[derive(Debug, Clone)]
pub struct QrClient {
    context: PageContext,
    policy: TrustPolicy,
    status: QrStatus,
    url: String,
    credential: Option<String>,
    validation: Option<ValidationResult>,
    error: Option<String>,
    last_event_id: Option<String>,
    finished: bool,
}

impl QrClient {
    pub fn new(context: PageContext, policy: TrustPolicy) -> Self {
        Self {
            context,
            policy,
            status: QrStatus::Loading,
            url: String::new(),
            credential: None,
            validation: None,
            error: None,
            last_event_id: None,
            finished: false,
        }
    }

    pub fn status(&self) -> QrStatus {
        self.status
    }

    /// Login URL to render as a QR code
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    pub fn validation(&self) -> Option<&ValidationResult> {
        self.validation.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Id to send as `Last-Event-ID` when reconnecting
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Whether the stream delivered its `end` event
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Start over for a new stream, keeping the last QR url on screen
    pub fn restart(&mut self) {
        let url = std::mem::take(&mut self.url);
        *self = Self::new(self.context.clone(), self.policy.clone());
        self.url = url;
    }

    /// Apply one frame; returns the broadcast plan when it carried the
    /// credential
    pub fn handle(&mut self, frame: &SseFrame) -> Result<Option<BroadcastPlan>> {
        if let Some(id) = &frame.id {
            self.last_event_id = Some(id.clone());
        }
        self.handle_event(&frame.event, &frame.data)
    }

    pub fn handle_event(&mut self, event: &str, data: &str) -> Result<Option<BroadcastPlan>> {
        match event {
            "generate" => {
                let generated: GenerateResult = serde_json::from_str(data)?;
                self.on_generate(generated);
                Ok(None)
            }
            "poll" => {
                let outcome: PollOutcome = serde_json::from_str(data)?;
                Ok(self.on_poll(outcome))
            }
            "end" => {
                self.on_end(data);
                Ok(None)
            }
            other => {
                tracing::debug!(event = other, "Ignoring unknown stream event");
                Ok(None)
            }
        }
    }

    fn fail(&mut self, message: &str) {
        let message = if message.is_empty() { "Unknown error" } else { message };
        self.error = Some(message.to_string());
        self.status = QrStatus::Error;
    }

    fn on_generate(&mut self, generated: GenerateResult) {
        if !generated.is_success() {
            self.fail(&generated.msg);
            return;
        }
        self.url = generated.url;
        self.status = QrStatus::Wait;
    }

    fn on_poll(&mut self, outcome: PollOutcome) -> Option<BroadcastPlan> {
        match outcome.status() {
            PollStatus::NotScanned => self.status = QrStatus::Wait,
            PollStatus::NotConfirmed => self.status = QrStatus::Scanned,
            PollStatus::Expired => self.status = QrStatus::Expired,
            PollStatus::Success => {
                self.status = QrStatus::Success;
                if let Some(validation) = &outcome.cookie_validation {
                    log_validation(validation);
                }
                self.validation = outcome.cookie_validation;
                let credential = outcome.cookie.unwrap_or_default();
                let plan = plan_broadcast(&credential, &self.context, &self.policy);
                self.credential = Some(credential);
                return plan;
            }
            PollStatus::Transport | PollStatus::Other(_) => self.fail(&outcome.msg),
        }
        None
    }

    fn on_end(&mut self, data: &str) {
        if !data.is_empty() {
            self.fail(data);
        }
        self.finished = true;
    }
}

fn log_validation(validation: &ValidationResult) {
    match validation.status {
        ValidationOutcome::Verified => tracing::info!("Credential check passed: {}", validation.message),
        ValidationOutcome::Rejected => tracing::warn!(
            details = ?validation.details,
            "Credential check failed: {}",
            validation.message
        ),
        ValidationOutcome::Indeterminate => tracing::error!(
            details = ?validation.details,
            "Credential check could not complete: {}",
            validation.message
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::{PlanSource, WindowMode};
    use pretty_assertions::assert_eq;

    fn client() -> QrClient {
        QrClient::new(
            PageContext::new(Some(WindowMode::Window), "https://qr.example.com"),
            TrustPolicy::from_origins(["https://app.example.com"]),
        )
    }

    #[test]
    fn test_parse_frames() {
        let body = "event: generate\nid: abc\ndata: {\"code\":0}\n\n: keep-alive\n\nevent: end\ndata: \n\n";
        let frames = parse_frames(body);

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].event, "generate");
        assert_eq!(frames[0].id.as_deref(), Some("abc"));
        assert_eq!(frames[0].data, "{\"code\":0}");
        assert_eq!(frames[1].event, "end");
        assert_eq!(frames[1].data, "");
    }

    #[test]
    fn test_parse_multiline_data() {
        let frames = parse_frames("data: one\r\ndata: two\r\n\r\n");
        assert_eq!(frames[0].event, "message");
        assert_eq!(frames[0].data, "one\ntwo");
    }

    #[test]
    fn test_status_progression_and_broadcast() {
        let mut client = client();
        assert_eq!(client.status(), QrStatus::Loading);

        client
            .handle_event("generate", r#"{"code":0,"msg":"","url":"https://x/y","key":"abc"}"#)
            .unwrap();
        assert_eq!(client.status(), QrStatus::Wait);
        assert_eq!(client.url(), "https://x/y");

        client.handle_event("poll", r#"{"code":86090,"msg":""}"#).unwrap();
        assert_eq!(client.status(), QrStatus::Scanned);

        let plan = client
            .handle_event(
                "poll",
                r#"{"code":0,"msg":"","cookie":"SESSDATA=foo","cookieValidation":{"status":"success","message":"ok"}}"#,
            )
            .unwrap()
            .unwrap();
        assert_eq!(client.status(), QrStatus::Success);
        assert_eq!(client.credential(), Some("SESSDATA=foo"));
        assert_eq!(client.validation().unwrap().status, ValidationOutcome::Verified);
        assert_eq!(plan.message.data, "SESSDATA=foo");
        assert_eq!(plan.origins, vec!["https://app.example.com"]);
        assert_eq!(plan.source, PlanSource::AllowList);

        client.handle_event("end", "").unwrap();
        assert!(client.is_finished());
        assert_eq!(client.status(), QrStatus::Success);
    }

    #[test]
    fn test_generate_failure_and_end_message() {
        let mut client = client();
        client
            .handle_event("generate", r#"{"code":-1,"msg":"network down","url":"","key":""}"#)
            .unwrap();
        assert_eq!(client.status(), QrStatus::Error);
        assert_eq!(client.error(), Some("network down"));

        let mut client = self::client();
        client.handle_event("end", "polling timed out").unwrap();
        assert_eq!(client.status(), QrStatus::Error);
        assert_eq!(client.error(), Some("polling timed out"));
    }

    #[test]
    fn test_expired_and_unknown_codes() {
        let mut client = client();
        client.handle_event("poll", r#"{"code":86038,"msg":"expired"}"#).unwrap();
        assert_eq!(client.status(), QrStatus::Expired);

        client.handle_event("poll", r#"{"code":-412,"msg":"blocked"}"#).unwrap();
        assert_eq!(client.status(), QrStatus::Error);
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        let mut client = client();
        assert!(client.handle_event("poll", "not json").is_err());
    }

    #[test]
    fn test_restart_keeps_url_and_tracks_event_id() {
        let mut client = client();
        let frame = SseFrame {
            event: "generate".to_string(),
            data: r#"{"code":0,"msg":"","url":"https://x/y","key":"abc"}"#.to_string(),
            id: Some("abc".to_string()),
        };
        client.handle(&frame).unwrap();
        assert_eq!(client.last_event_id(), Some("abc"));

        client.restart();
        assert_eq!(client.status(), QrStatus::Loading);
        assert_eq!(client.url(), "https://x/y");
        assert_eq!(client.last_event_id(), None);
    }
}
