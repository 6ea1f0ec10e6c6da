//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

/// Test helper functions
pub mod helpers {
    use axum::{
        Router,
        body::Body,
        http::{Request, Response},
    };
    use bili_qr_login::{
        broadcast::{SseFrame, parse_frames},
        config::Settings,
    };
    use tower::ServiceExt;

    /// Settings pointed at a mock provider with fast polling
    pub fn create_test_settings(base_url: &str) -> Settings {
        let mut settings = Settings::default();
        settings.provider.passport_base_url = base_url.to_string();
        settings.provider.api_base_url = base_url.to_string();
        settings.polling.interval_ms = 20;
        settings.polling.first_poll_delay_ms = 20;
        settings.polling.generate_timeout_secs = 2;
        settings.polling.poll_timeout_secs = 2;
        settings.polling.probe_timeout_secs = 2;
        settings
    }

    /// Same as [`create_test_settings`] with admission disabled
    pub fn create_dev_settings(base_url: &str) -> Settings {
        let mut settings = create_test_settings(base_url);
        settings.server.development = true;
        settings
    }

    /// GET `uri` with the given headers
    pub async fn get(app: Router, uri: &str, headers: &[(&str, &str)]) -> Response<Body> {
        let mut request = Request::builder().uri(uri);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        app.oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    /// Read a whole response body as text
    pub async fn body_text(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    /// Read an event stream to its end and split it into frames
    pub async fn read_frames(response: Response<Body>) -> Vec<SseFrame> {
        parse_frames(&body_text(response).await)
    }

    pub fn event_names(frames: &[SseFrame]) -> Vec<&str> {
        frames.iter().map(|f| f.event.as_str()).collect()
    }
}

/// Scripted login provider for driving the stream without a network
pub mod provider {
    use async_trait::async_trait;
    use bili_qr_login::{
        Result,
        session::{CallContext, LoginProvider},
        types::{ClientKind, GenerateResult, PollOutcome},
    };
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// What a scripted poll does
    #[derive(Debug)]
    pub enum Step {
        Outcome(PollOutcome),
        Fail(String),
        Panic,
    }

    #[derive(Debug)]
    pub struct ScriptedProvider {
        kind: ClientKind,
        generate: GenerateResult,
        steps: Mutex<VecDeque<Step>>,
        generate_calls: AtomicU32,
        poll_calls: AtomicU32,
    }

    impl ScriptedProvider {
        /// Challenge `abc`, then the given poll codes, then "not scanned" forever
        pub fn with_codes(codes: &[i64]) -> Self {
            let steps = codes.iter().map(|&code| {
                let outcome = PollOutcome::new(code, format!("code {}", code));
                if code == 0 {
                    Step::Outcome(outcome.with_cookie("SESSDATA=foo; bili_jct=bar"))
                } else {
                    Step::Outcome(outcome)
                }
            });
            Self::new(GenerateResult::success("https://qr.test/login", "abc"), steps)
        }

        pub fn new(generate: GenerateResult, steps: impl IntoIterator<Item = Step>) -> Self {
            Self {
                kind: ClientKind::Web,
                generate,
                steps: Mutex::new(steps.into_iter().collect()),
                generate_calls: AtomicU32::new(0),
                poll_calls: AtomicU32::new(0),
            }
        }

        pub fn tv(mut self) -> Self {
            self.kind = ClientKind::Tv;
            self
        }

        pub fn generate_calls(&self) -> u32 {
            self.generate_calls.load(Ordering::SeqCst)
        }

        pub fn poll_calls(&self) -> u32 {
            self.poll_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LoginProvider for ScriptedProvider {
        fn kind(&self) -> ClientKind {
            self.kind
        }

        async fn generate(&self, _ctx: &CallContext) -> GenerateResult {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            self.generate.clone()
        }

        async fn poll(&self, _ctx: &CallContext, _key: &str) -> Result<PollOutcome> {
            self.poll_calls.fetch_add(1, Ordering::SeqCst);
            let step = self.steps.lock().unwrap().pop_front();
            match step {
                Some(Step::Outcome(outcome)) => Ok(outcome),
                Some(Step::Fail(message)) => Err(bili_qr_login::Error::session(message)),
                Some(Step::Panic) => panic!("scripted provider panic"),
                None => Ok(PollOutcome::new(86101, "未扫码")),
            }
        }
    }
}

/// Provider response bodies shaped like the real API
pub mod fixtures {
    use serde_json::{Value, json};

    pub fn envelope(code: i64, data: Value) -> Value {
        json!({"code": code, "message": "0", "ttl": 1, "data": data})
    }

    pub fn web_generate(key: &str) -> Value {
        envelope(0, json!({"url": format!("https://account.bilibili.com/h5/account-h5/auth/scan-web?qrcode_key={}", key), "qrcode_key": key}))
    }

    pub fn web_poll(code: i64, message: &str) -> Value {
        envelope(0, json!({"url": "", "refresh_token": "", "timestamp": 0, "code": code, "message": message}))
    }

    pub fn finger_spi(b3: &str) -> Value {
        envelope(0, json!({"b_3": b3, "b_4": "B4"}))
    }

    pub fn nav(is_login: bool) -> Value {
        envelope(0, json!({"isLogin": is_login, "mid": 42, "uname": "tester"}))
    }
}
