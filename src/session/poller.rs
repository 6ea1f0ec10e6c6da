//! QR login state machine
//!
//! [`QrPoller`] drives one login attempt: generate a challenge (unless
//! resuming), then poll it on a fixed interval until the provider reports a
//! terminal code, the tick ceiling is reached, or the caller cancels.
//! Events are pushed in order through an `mpsc` channel.

use super::{network::CallContext, provider::LoginProvider, registry::SessionRegistry};
use crate::{
    Result,
    config::settings::PollingSettings,
    types::{GenerateResult, PollOutcome, PollStatus},
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Lifecycle of one login attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Pending,
    Generated,
    Polling,
    /// Scanned, waiting for the user to confirm
    Scanned,
    Expired,
    Succeeded,
    Failed,
    TimedOut,
    /// The client went away
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Expired | Self::Succeeded | Self::Failed | Self::TimedOut | Self::Cancelled
        )
    }
}

/// Why a session ended
#[derive(Debug, Clone, PartialEq)]
pub enum EndReason {
    Succeeded,
    Expired,
    GenerateFailed { code: i64, message: String },
    ProviderFailed { code: i64, message: String },
    TimedOut,
    Cancelled,
    Internal(String),
}

impl EndReason {
    /// Payload of the `end` event. Empty for a normal finish.
    pub fn message(&self) -> String {
        match self {
            Self::Succeeded | Self::Expired | Self::Cancelled => String::new(),
            Self::GenerateFailed { code, message } => {
                format!("Failed to generate QR code ({}): {}", code, message)
            }
            Self::ProviderFailed { code, message } => {
                format!("Login failed ({}): {}", code, message)
            }
            Self::TimedOut => "polling timed out".to_string(),
            Self::Internal(message) => format!("Internal error: {}", message),
        }
    }

    pub fn state(&self) -> SessionState {
        match self {
            Self::Succeeded => SessionState::Succeeded,
            Self::Expired => SessionState::Expired,
            Self::TimedOut => SessionState::TimedOut,
            Self::Cancelled => SessionState::Cancelled,
            Self::GenerateFailed { .. } | Self::ProviderFailed { .. } | Self::Internal(_) => {
                SessionState::Failed
            }
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => f.write_str("succeeded"),
            Self::Expired => f.write_str("expired"),
            Self::Cancelled => f.write_str("cancelled"),
            other => f.write_str(&other.message()),
        }
    }
}

/// Events relayed to the stream, in order
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Generated(GenerateResult),
    Polled(PollOutcome),
    Finished(EndReason),
}

/// Timing parameters of the poll loop
#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    pub max_ticks: u32,
    pub interval: Duration,
    pub first_poll_delay: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            max_ticks: 100,
            interval: Duration::from_secs(2),
            first_poll_delay: Duration::from_secs(2),
        }
    }
}

impl From<&PollingSettings> for PollerConfig {
    fn from(settings: &PollingSettings) -> Self {
        Self {
            max_ticks: settings.max_ticks,
            interval: settings.interval(),
            first_poll_delay: settings.first_poll_delay(),
        }
    }
}

/// Drives one login attempt against one provider
#[derive(Debug)]
pub struct QrPoller {
    provider: Arc<dyn LoginProvider>,
    ctx: CallContext,
    config: PollerConfig,
    registry: Option<Arc<SessionRegistry>>,
    state: SessionState,
    end: Option<EndReason>,
    ticks: u32,
}

impl QrPoller {
    pub fn new(provider: Arc<dyn LoginProvider>, ctx: CallContext, config: PollerConfig) -> Self {
        Self {
            provider,
            ctx,
            config,
            registry: None,
            state: SessionState::Pending,
            end: None,
            ticks: 0,
        }
    }

    /// Touch the session in `registry` on every tick
    pub fn with_registry(mut self, registry: Arc<SessionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Poll calls issued so far
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            tracing::info!(
                session_id = self.ctx.session_id,
                from = ?self.state,
                to = ?next,
                "Session state changed"
            );
            self.state = next;
        }
    }

    fn finish(&mut self, reason: EndReason) -> EndReason {
        self.transition(reason.state());
        self.end = Some(reason.clone());
        reason
    }

    /// Run the session to completion.
    ///
    /// Emits `Generated` and `Polled` events; the end of the session is
    /// returned rather than sent so the caller can emit exactly one end
    /// event whatever happens to this future. An `Err` means the provider
    /// failed unexpectedly.
    pub async fn run(
        &mut self,
        resume_key: Option<String>,
        cancel: &CancellationToken,
        events: &mpsc::Sender<SessionEvent>,
    ) -> Result<EndReason> {
        if let Some(end) = &self.end {
            return Ok(end.clone());
        }

        let key = match resume_key {
            Some(key) => {
                tracing::info!(session_id = self.ctx.session_id, key = %key, "Resuming session");
                self.transition(SessionState::Generated);
                key
            }
            None => {
                if cancel.is_cancelled() {
                    return Ok(self.finish(EndReason::Cancelled));
                }
                let generated = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    generated = self.provider.generate(&self.ctx) => Some(generated),
                };
                let Some(generated) = generated else {
                    return Ok(self.finish(EndReason::Cancelled));
                };

                let success = generated.is_success();
                let key = generated.key.clone();
                let (code, message) = (generated.code, generated.msg.clone());
                if events.send(SessionEvent::Generated(generated)).await.is_err() {
                    return Ok(self.finish(EndReason::Cancelled));
                }

                if !success {
                    tracing::warn!(
                        session_id = self.ctx.session_id,
                        code,
                        "QR code generation failed: {}",
                        message
                    );
                    return Ok(self.finish(EndReason::GenerateFailed { code, message }));
                }
                self.transition(SessionState::Generated);

                if !self.pause(self.config.first_poll_delay, cancel).await {
                    return Ok(self.finish(EndReason::Cancelled));
                }
                key
            }
        };

        self.transition(SessionState::Polling);
        while self.ticks < self.config.max_ticks {
            if cancel.is_cancelled() {
                return Ok(self.finish(EndReason::Cancelled));
            }
            self.ticks += 1;
            if let Some(registry) = &self.registry {
                registry.touch(self.ctx.session_id).await;
            }

            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                polled = self.provider.poll(&self.ctx, &key) => Some(polled),
            };
            let outcome = match polled {
                None => return Ok(self.finish(EndReason::Cancelled)),
                Some(Ok(outcome)) => outcome,
                Some(Err(e)) => {
                    tracing::error!(
                        session_id = self.ctx.session_id,
                        tick = self.ticks,
                        "Poll failed unexpectedly: {}",
                        e
                    );
                    self.finish(EndReason::Internal(e.to_string()));
                    return Err(e);
                }
            };

            let status = outcome.status();
            if status == PollStatus::Transport {
                tracing::warn!(
                    session_id = self.ctx.session_id,
                    tick = self.ticks,
                    "Poll tick failed, retrying: {}",
                    outcome.msg
                );
            } else {
                tracing::debug!(
                    session_id = self.ctx.session_id,
                    tick = self.ticks,
                    code = outcome.code,
                    "Poll tick"
                );
                let (code, message) = (outcome.code, outcome.msg.clone());
                if events.send(SessionEvent::Polled(outcome)).await.is_err() {
                    return Ok(self.finish(EndReason::Cancelled));
                }

                match status {
                    PollStatus::Success => return Ok(self.finish(EndReason::Succeeded)),
                    PollStatus::Expired => return Ok(self.finish(EndReason::Expired)),
                    PollStatus::NotConfirmed => self.transition(SessionState::Scanned),
                    PollStatus::NotScanned => self.transition(SessionState::Polling),
                    PollStatus::Other(_) => {
                        return Ok(self.finish(EndReason::ProviderFailed { code, message }));
                    }
                    PollStatus::Transport => {}
                }
            }

            if self.ticks < self.config.max_ticks && !self.pause(self.config.interval, cancel).await {
                return Ok(self.finish(EndReason::Cancelled));
            }
        }

        tracing::warn!(
            session_id = self.ctx.session_id,
            ticks = self.ticks,
            "Polling reached the tick ceiling"
        );
        Ok(self.finish(EndReason::TimedOut))
    }

    /// Sleep for `duration`; false when cancelled first
    async fn pause(&self, duration: Duration, cancel: &CancellationToken) -> bool {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}
