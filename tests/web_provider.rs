//! Web login flow against a mock passport API

mod common;

use bili_qr_login::{
    session::{CallContext, LoginProvider, WebLoginClient, network},
    types::{PollStatus, ValidationOutcome},
};
use common::{fixtures, helpers::create_test_settings};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> WebLoginClient {
    WebLoginClient::new(network::build_client().unwrap(), &create_test_settings(&server.uri()))
}

async fn mount_fingerprint(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/x/frontend/finger/spi"))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn mount_nav(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/x/web-interface/nav"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_success_poll(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/x/passport-login/web/qrcode/poll"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(fixtures::web_poll(0, ""))
                .append_header("set-cookie", "SESSDATA=foo; Path=/; HttpOnly")
                .append_header("set-cookie", "bili_jct=bar; Path=/")
                .append_header("set-cookie", "i-wanna-go-back=-1; Path=/"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_generate_returns_challenge() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/x/passport-login/web/qrcode/generate"))
        .and(query_param("source", "main-fe-header"))
        .and(header("referer", "https://www.bilibili.com/"))
        .and(header("user-agent", "TestAgent/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::web_generate("abc")))
        .expect(1)
        .mount(&server)
        .await;

    let result = client_for(&server)
        .generate(&CallContext::new(1, "TestAgent/1.0"))
        .await;

    assert!(result.is_success());
    assert_eq!(result.key, "abc");
    assert!(result.url.ends_with("qrcode_key=abc"));
}

#[tokio::test]
async fn test_generate_provider_failure_keeps_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/x/passport-login/web/qrcode/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"code": -412, "message": "request blocked"})),
        )
        .mount(&server)
        .await;

    let result = client_for(&server).generate(&CallContext::new(1, "")).await;

    assert_eq!(result.code, -412);
    assert_eq!(result.msg, "request blocked");
    assert!(result.key.is_empty());
}

#[tokio::test]
async fn test_generate_http_error_is_transport() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/x/passport-login/web/qrcode/generate"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = client_for(&server).generate(&CallContext::new(1, "")).await;

    assert_eq!(result.code, -1);
    assert!(!result.msg.is_empty());
}

#[tokio::test]
async fn test_poll_reports_inner_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/x/passport-login/web/qrcode/poll"))
        .and(query_param("qrcode_key", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::web_poll(86101, "未扫码")))
        .mount(&server)
        .await;

    let outcome = client_for(&server)
        .poll(&CallContext::new(1, ""), "abc")
        .await
        .unwrap();

    assert_eq!(outcome.status(), PollStatus::NotScanned);
    assert_eq!(outcome.msg, "未扫码");
    assert!(outcome.cookie.is_none());
}

#[tokio::test]
async fn test_poll_envelope_error_wins() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/x/passport-login/web/qrcode/poll"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"code": -400, "message": "bad key"})),
        )
        .mount(&server)
        .await;

    let outcome = client_for(&server)
        .poll(&CallContext::new(1, ""), "abc")
        .await
        .unwrap();
    assert_eq!(outcome.code, -400);
}

#[tokio::test]
async fn test_poll_success_assembles_credential() {
    let server = MockServer::start().await;
    mount_success_poll(&server).await;
    mount_fingerprint(
        &server,
        ResponseTemplate::new(200).set_body_json(fixtures::finger_spi("B3")),
    )
    .await;
    mount_nav(&server, fixtures::nav(true)).await;

    let outcome = client_for(&server)
        .poll(&CallContext::new(1, ""), "abc")
        .await
        .unwrap();

    assert_eq!(outcome.status(), PollStatus::Success);
    assert_eq!(
        outcome.cookie.as_deref(),
        Some("buvid3=B3; SESSDATA=foo; bili_jct=bar")
    );
    let validation = outcome.cookie_validation.unwrap();
    assert_eq!(validation.status, ValidationOutcome::Verified);
}

#[tokio::test]
async fn test_poll_success_without_fingerprint() {
    let server = MockServer::start().await;
    mount_success_poll(&server).await;
    mount_fingerprint(&server, ResponseTemplate::new(503)).await;
    mount_nav(&server, fixtures::nav(true)).await;

    let outcome = client_for(&server)
        .poll(&CallContext::new(1, ""), "abc")
        .await
        .unwrap();

    assert_eq!(outcome.cookie.as_deref(), Some("SESSDATA=foo; bili_jct=bar"));
}

#[tokio::test]
async fn test_probe_rejects_logged_out_credential() {
    let server = MockServer::start().await;
    mount_success_poll(&server).await;
    mount_fingerprint(
        &server,
        ResponseTemplate::new(200).set_body_json(fixtures::finger_spi("B3")),
    )
    .await;
    mount_nav(&server, json!({"code": -101, "message": "账号未登录"})).await;

    let outcome = client_for(&server)
        .poll(&CallContext::new(1, ""), "abc")
        .await
        .unwrap();

    assert_eq!(outcome.status(), PollStatus::Success);
    assert_eq!(
        outcome.cookie_validation.unwrap().status,
        ValidationOutcome::Rejected
    );
}

#[tokio::test]
async fn test_probe_can_be_disabled() {
    let server = MockServer::start().await;
    mount_success_poll(&server).await;
    mount_fingerprint(
        &server,
        ResponseTemplate::new(200).set_body_json(fixtures::finger_spi("B3")),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/x/web-interface/nav"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::nav(true)))
        .expect(0)
        .mount(&server)
        .await;

    let mut settings = create_test_settings(&server.uri());
    settings.polling.validate_credential = false;
    let client = WebLoginClient::new(network::build_client().unwrap(), &settings);

    let outcome = client.poll(&CallContext::new(1, ""), "abc").await.unwrap();
    assert!(outcome.cookie.is_some());
    assert!(outcome.cookie_validation.is_none());
}

#[tokio::test]
async fn test_slow_poll_becomes_transport_tick() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/x/passport-login/web/qrcode/poll"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(fixtures::web_poll(86101, ""))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut settings = create_test_settings(&server.uri());
    settings.polling.poll_timeout_secs = 1;
    let client = WebLoginClient::new(network::build_client().unwrap(), &settings);

    let outcome = client.poll(&CallContext::new(1, ""), "abc").await.unwrap();
    assert_eq!(outcome.status(), PollStatus::Transport);
}

#[rstest::rstest]
#[case::missing_data(json!({"code": 0, "message": "0"}))]
#[case::null_data(json!({"code": 0, "message": "0", "data": null}))]
#[case::empty_data(json!({"code": 0, "message": "0", "data": {}}))]
#[tokio::test]
async fn test_success_envelope_without_status_is_transport_tick(#[case] body: serde_json::Value) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/x/passport-login/web/qrcode/poll"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/x/frontend/finger/spi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::finger_spi("B3")))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = client_for(&server)
        .poll(&CallContext::new(1, ""), "abc")
        .await
        .unwrap();

    assert_eq!(outcome.status(), PollStatus::Transport);
    assert!(outcome.cookie.is_none());
}

#[rstest::rstest]
#[case::missing_data(json!({"code": 0, "message": "0"}))]
#[case::empty_data(json!({"code": 0, "message": "0", "data": {}}))]
#[case::empty_key(json!({"code": 0, "message": "0", "data": {"url": "https://x/y", "qrcode_key": ""}}))]
#[tokio::test]
async fn test_generate_without_challenge_is_transport_failure(#[case] body: serde_json::Value) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/x/passport-login/web/qrcode/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let result = client_for(&server).generate(&CallContext::new(1, "")).await;

    assert_eq!(result.code, -1);
    assert!(!result.is_success());
    assert!(result.key.is_empty());
}
