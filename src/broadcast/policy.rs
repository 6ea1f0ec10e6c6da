//! Delivery policy for the credential message
//!
//! [`plan_broadcast`] decides which window receives the message and under
//! which target origin(s). The host environment performs the actual post
//! through [`WindowHost`].

use super::{QrMessage, WindowMode};
use crate::{
    Result,
    origin::{TrustPolicy, WILDCARD, normalize_origin},
};

/// Window a message is posted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetWindow {
    Opener,
    Top,
}

impl From<WindowMode> for TargetWindow {
    fn from(mode: WindowMode) -> Self {
        match mode {
            WindowMode::Window => Self::Opener,
            WindowMode::Iframe => Self::Top,
        }
    }
}

/// What the QR page knows about where it is running
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    /// `mode` query parameter, parsed
    pub mode: Option<WindowMode>,
    /// `targetOrigin` query parameter, if given
    pub target_origin: Option<String>,
    /// Origin of the opener or parent, when readable
    pub parent_origin: Option<String>,
    /// `document.referrer`
    pub referrer: Option<String>,
    /// Origin of the QR page itself
    pub own_origin: String,
}

impl PageContext {
    pub fn new(mode: Option<WindowMode>, own_origin: impl Into<String>) -> Self {
        Self {
            mode,
            own_origin: own_origin.into(),
            ..Self::default()
        }
    }

    pub fn with_target_origin(mut self, origin: impl Into<String>) -> Self {
        self.target_origin = Some(origin.into());
        self
    }

    pub fn with_parent_origin(mut self, origin: impl Into<String>) -> Self {
        self.parent_origin = Some(origin.into());
        self
    }

    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    fn target_origin(&self) -> Option<&str> {
        self.target_origin.as_deref().filter(|o| !o.trim().is_empty())
    }

    /// Parent origin, falling back to the referrer's origin
    fn detected_parent_origin(&self) -> Option<String> {
        self.parent_origin
            .as_deref()
            .and_then(normalize_origin)
            .or_else(|| self.referrer.as_deref().and_then(normalize_origin))
    }
}

/// Which rule produced a plan's origins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanSource {
    /// Wildcard trust, parameter or `*`
    Wildcard,
    /// Parameter checked against the allow-list
    AllowListed,
    /// Parameter not listed; every listed origin instead
    AllowListFallback,
    /// Every listed origin, no parameter given
    AllowList,
    /// Parameter with no allow-list configured
    Parameter,
    /// Detected opener or parent origin
    Detected,
    /// The page's own origin
    OwnOrigin,
}

/// Where and how the credential message goes
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastPlan {
    pub window: TargetWindow,
    pub message: QrMessage,
    /// Target origins, one post each
    pub origins: Vec<String>,
    pub source: PlanSource,
}

/// Decide the delivery of `credential`.
///
/// Returns `None` when the page was not opened for delivery.
pub fn plan_broadcast(
    credential: &str,
    context: &PageContext,
    policy: &TrustPolicy,
) -> Option<BroadcastPlan> {
    let Some(mode) = context.mode else {
        tracing::debug!("No delivery mode, skipping credential broadcast");
        return None;
    };
    let param = context.target_origin();

    let (origins, source) = if policy.trusts_all() {
        let origin = param.unwrap_or(WILDCARD).to_string();
        (vec![origin], PlanSource::Wildcard)
    } else if policy.has_allow_list() {
        match param {
            Some(origin) if policy.is_listed(origin) => {
                (vec![origin.to_string()], PlanSource::AllowListed)
            }
            Some(origin) => {
                tracing::warn!(
                    requested = origin,
                    "Target origin is not trusted, delivering to the trusted origins instead"
                );
                (policy.origins().to_vec(), PlanSource::AllowListFallback)
            }
            None => (policy.origins().to_vec(), PlanSource::AllowList),
        }
    } else if let Some(origin) = param {
        (vec![origin.to_string()], PlanSource::Parameter)
    } else if let Some(origin) = context.detected_parent_origin() {
        (vec![origin], PlanSource::Detected)
    } else {
        (vec![context.own_origin.clone()], PlanSource::OwnOrigin)
    };

    tracing::debug!(mode = %mode, source = ?source, origins = ?origins, "Credential broadcast planned");
    Some(BroadcastPlan {
        window: mode.into(),
        message: QrMessage::success(mode, credential),
        origins,
        source,
    })
}

/// The host side of cross-window messaging
pub trait WindowHost {
    /// Whether `window` exists for this page
    fn has_window(&self, window: TargetWindow) -> bool;

    /// Post `message` to `window`, restricted to `target_origin`
    fn post_message(&self, window: TargetWindow, message: &QrMessage, target_origin: &str)
    -> Result<()>;
}

/// Carry out `plan`, returning how many posts succeeded
pub fn dispatch(plan: &BroadcastPlan, host: &dyn WindowHost) -> usize {
    if !host.has_window(plan.window) {
        tracing::error!(
            window = ?plan.window,
            mode = %plan.message.mode,
            "No target window to deliver the credential to"
        );
        return 0;
    }

    let mut delivered = 0;
    for origin in &plan.origins {
        match host.post_message(plan.window, &plan.message, origin) {
            Ok(()) => delivered += 1,
            Err(e) => tracing::error!(target_origin = %origin, "Failed to post credential: {}", e),
        }
    }
    tracing::info!(delivered, planned = plan.origins.len(), "Credential broadcast sent");
    delivered
}

/// Receiving side of the hand-off: accepts credential messages only from
/// expected origins
#[derive(Debug, Clone, Default)]
pub struct MessageReceiver {
    expected: Vec<String>,
}

impl MessageReceiver {
    /// `expected` are the origins the QR page may be served from
    pub fn new<'a, I>(expected: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self {
            expected: expected.into_iter().filter_map(normalize_origin).collect(),
        }
    }

    /// Decode `payload` if it came from an expected origin and is a
    /// success message
    pub fn accept(&self, event_origin: &str, payload: &str) -> Option<QrMessage> {
        let origin = normalize_origin(event_origin)?;
        if !self.expected.contains(&origin) {
            tracing::warn!(origin = %origin, "Ignoring message from unexpected origin");
            return None;
        }
        match serde_json::from_str::<QrMessage>(payload) {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::debug!(origin = %origin, "Ignoring non-credential message: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    const OWN: &str = "https://qr.example.com";

    fn iframe() -> PageContext {
        PageContext::new(Some(WindowMode::Iframe), OWN)
    }

    #[test]
    fn test_no_mode_means_no_broadcast() {
        let context = PageContext::new(None, OWN);
        assert!(plan_broadcast("c", &context, &TrustPolicy::wildcard()).is_none());
    }

    #[test]
    fn test_wildcard_uses_parameter_or_star() {
        let policy = TrustPolicy::wildcard();

        let plan = plan_broadcast("c", &iframe(), &policy).unwrap();
        assert_eq!(plan.origins, vec!["*"]);
        assert_eq!(plan.window, TargetWindow::Top);

        let context = iframe().with_target_origin("https://app.example.com");
        let plan = plan_broadcast("c", &context, &policy).unwrap();
        assert_eq!(plan.origins, vec!["https://app.example.com"]);
        assert_eq!(plan.source, PlanSource::Wildcard);
    }

    #[test]
    fn test_allow_list_accepts_listed_parameter() {
        let policy = TrustPolicy::from_origins(["https://a.example", "https://b.example"]);
        let context = iframe().with_target_origin("https://b.example");

        let plan = plan_broadcast("c", &context, &policy).unwrap();
        assert_eq!(plan.origins, vec!["https://b.example"]);
        assert_eq!(plan.source, PlanSource::AllowListed);
    }

    #[test]
    fn test_allow_list_falls_back_for_unlisted_parameter() {
        let policy = TrustPolicy::from_origins(["https://a.example", "https://b.example"]);
        let context = iframe().with_target_origin("https://evil.example");

        let plan = plan_broadcast("c", &context, &policy).unwrap();
        assert_eq!(plan.origins, vec!["https://a.example", "https://b.example"]);
        assert_eq!(plan.source, PlanSource::AllowListFallback);
    }

    #[test]
    fn test_allow_list_without_parameter() {
        let policy = TrustPolicy::from_origins(["https://a.example"]);
        let plan = plan_broadcast("c", &iframe(), &policy).unwrap();
        assert_eq!(plan.source, PlanSource::AllowList);
    }

    #[test]
    fn test_untrusted_config_detection_chain() {
        let policy = TrustPolicy::default();

        let context = iframe().with_target_origin("https://p.example");
        assert_eq!(plan_broadcast("c", &context, &policy).unwrap().source, PlanSource::Parameter);

        let context = PageContext::new(Some(WindowMode::Window), OWN)
            .with_referrer("https://opener.example/page?x=1");
        let plan = plan_broadcast("c", &context, &policy).unwrap();
        assert_eq!(plan.origins, vec!["https://opener.example"]);
        assert_eq!(plan.window, TargetWindow::Opener);

        let plan = plan_broadcast("c", &iframe(), &policy).unwrap();
        assert_eq!(plan.origins, vec![OWN]);
        assert_eq!(plan.source, PlanSource::OwnOrigin);
    }

    #[derive(Default)]
    struct RecordingHost {
        has_window: bool,
        fail_for: Option<&'static str>,
        posts: RefCell<Vec<(TargetWindow, String)>>,
    }

    impl WindowHost for RecordingHost {
        fn has_window(&self, _window: TargetWindow) -> bool {
            self.has_window
        }

        fn post_message(&self, window: TargetWindow, _message: &QrMessage, target_origin: &str) -> Result<()> {
            if self.fail_for == Some(target_origin) {
                return Err(Error::internal("postMessage failed"));
            }
            self.posts.borrow_mut().push((window, target_origin.to_string()));
            Ok(())
        }
    }

    #[test]
    fn test_dispatch_posts_each_origin() {
        let policy = TrustPolicy::from_origins(["https://a.example", "https://b.example"]);
        let plan = plan_broadcast("c", &iframe(), &policy).unwrap();
        let host = RecordingHost {
            has_window: true,
            fail_for: Some("https://b.example"),
            ..RecordingHost::default()
        };

        assert_eq!(dispatch(&plan, &host), 1);
        assert_eq!(
            host.posts.borrow().as_slice(),
            &[(TargetWindow::Top, "https://a.example".to_string())]
        );
    }

    #[test]
    fn test_dispatch_without_window() {
        let plan = plan_broadcast("c", &iframe(), &TrustPolicy::wildcard()).unwrap();
        assert_eq!(dispatch(&plan, &RecordingHost::default()), 0);
    }

    #[test]
    fn test_receiver_checks_origin_and_shape() {
        let receiver = MessageReceiver::new([OWN]);
        let payload = r#"{"type":"success","mode":"window","data":"SESSDATA=foo"}"#;

        let message = receiver.accept("https://qr.example.com", payload).unwrap();
        assert_eq!(message.data, "SESSDATA=foo");

        assert!(receiver.accept("https://evil.example", payload).is_none());
        assert!(receiver.accept(OWN, r#"{"type":"other"}"#).is_none());
        assert!(receiver.accept("null", payload).is_none());
    }
}
