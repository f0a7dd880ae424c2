//! Error handling integration tests
//!
//! Each failure kind maps to its own status code, and every error payload
//! carries the same correlation id as the `X-Request-ID` response header.

use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestResponse;
use bytes::Bytes;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use gemini_proxy::Config;

use crate::common::{
    constants::MOUNT, test_config, test_server, test_server_with_transport, CountingTransport,
    StallingTransport,
};
use crate::mocks::MockGemini;

/// Assert the error code and that body and header agree on the request id
fn assert_error(response: &TestResponse, status: StatusCode, code: &str) -> Value {
    assert_eq!(response.status_code(), status);

    let headers = response.headers();
    assert_eq!(headers.get("content-type").unwrap(), "application/json");
    assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
    let request_id = headers
        .get("x-request-id")
        .expect("missing x-request-id")
        .to_str()
        .unwrap()
        .to_string();

    let body: Value = response.json();
    assert_eq!(body["error"]["code"], code);
    assert!(body["error"]["message"].is_string());
    assert_eq!(body["requestId"], request_id.as_str());
    body
}

#[tokio::test]
async fn test_missing_api_key_is_configuration_error() {
    let transport = CountingTransport::new();
    let server = test_server_with_transport(Config::default(), transport.clone());

    let response = server.get(&format!("{MOUNT}/v1beta/models")).await;

    assert_error(&response, StatusCode::INTERNAL_SERVER_ERROR, "CONFIGURATION_ERROR");
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_malformed_body_is_rejected_before_upstream() {
    let transport = CountingTransport::new();
    let server = test_server_with_transport(test_config("http://unused.test"), transport.clone());

    for (method_path, body) in [
        ("/v1beta/models/gemini-2.5-flash:generateContent", "{\"contents\": ["),
        ("/v1beta/models/gemini-2.5-flash:countTokens", "not json at all"),
        ("/v1beta/cachedContents", "   "),
    ] {
        let response = server
            .post(&format!("{MOUNT}{method_path}"))
            .bytes(Bytes::from_static(body.as_bytes()))
            .await;

        assert_error(&response, StatusCode::BAD_REQUEST, "INVALID_JSON");
    }

    let response = server
        .put(&format!("{MOUNT}/v1beta/cachedContents/abc"))
        .bytes(Bytes::from_static(b"{oops"))
        .await;
    assert_error(&response, StatusCode::BAD_REQUEST, "INVALID_JSON");

    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_upstream_error_status_is_preserved() {
    let gemini = MockGemini::start().await;
    gemini
        .mock_error("GET", "/v1beta/models/does-not-exist", 404)
        .await;
    let server = test_server(test_config(&gemini.uri()));

    let response = server
        .get(&format!("{MOUNT}/v1beta/models/does-not-exist"))
        .await;

    let body = assert_error(&response, StatusCode::NOT_FOUND, "UPSTREAM_ERROR");
    assert_eq!(
        body["error"]["details"]["error"]["message"],
        "Mock upstream failure 404"
    );
}

#[tokio::test]
async fn test_upstream_error_on_generation_keeps_status() {
    let gemini = MockGemini::start().await;
    gemini
        .mock_error(
            "POST",
            "/v1beta/models/gemini-2.5-flash:generateContent",
            429,
        )
        .await;
    let server = test_server(test_config(&gemini.uri()));

    let response = server
        .post(&format!("{MOUNT}/v1beta/models/gemini-pro:generateContent"))
        .json(&json!({"contents": []}))
        .await;

    assert_error(&response, StatusCode::TOO_MANY_REQUESTS, "UPSTREAM_ERROR");
}

#[tokio::test]
async fn test_upstream_error_body_is_truncated() {
    let gemini = MockGemini::start().await;
    gemini.mock_error("GET", "/v1beta/models", 500).await;
    let mut config = test_config(&gemini.uri());
    config.error_body_limit = 12;
    let server = test_server(config);

    let response = server.get(&format!("{MOUNT}/v1beta/models")).await;

    let body = assert_error(&response, StatusCode::INTERNAL_SERVER_ERROR, "UPSTREAM_ERROR");
    let details = body["error"]["details"].as_str().unwrap();
    assert_eq!(details.chars().count(), 12);
}

#[tokio::test]
async fn test_stalled_transport_times_out() {
    let transport = StallingTransport::new();
    let mut config = test_config("http://unused.test");
    config.upstream_timeout = Duration::from_millis(50);
    let server = test_server_with_transport(config, transport.clone());

    let response = server.get(&format!("{MOUNT}/v1beta/models")).await;

    let body = assert_error(&response, StatusCode::GATEWAY_TIMEOUT, "UPSTREAM_TIMEOUT");
    assert_eq!(body["error"]["details"]["timeoutMs"], 50);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    let gemini = MockGemini::start().await;
    gemini
        .mock_delayed("/v1beta/models", Duration::from_secs(3))
        .await;
    let mut config = test_config(&gemini.uri());
    config.upstream_timeout = Duration::from_millis(200);
    let server = test_server(config);

    let response = server.get(&format!("{MOUNT}/v1beta/models")).await;

    assert_error(&response, StatusCode::GATEWAY_TIMEOUT, "UPSTREAM_TIMEOUT");
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    // Nothing listens on port 1
    let server = test_server(test_config("http://127.0.0.1:1"));

    let response = server.get(&format!("{MOUNT}/v1beta/models")).await;

    let body = assert_error(&response, StatusCode::BAD_GATEWAY, "BAD_GATEWAY");
    let message = body["error"]["message"].as_str().unwrap();
    assert!(!message.contains("test-gemini-api-key"));
}
