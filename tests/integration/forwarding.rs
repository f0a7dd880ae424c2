//! Forwarding integration tests
//!
//! Drive the real router and reqwest transport against a wiremock Gemini and
//! inspect what actually arrived upstream: path, query, headers and body.

use axum::http::{HeaderName, HeaderValue, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{
    constants::{CLIENT_API_KEY, MOUNT, TEST_API_KEY},
    test_config, test_server,
};
use crate::mocks::{GeminiTestData, MockGemini};

fn key_params(request: &wiremock::Request) -> Vec<String> {
    request
        .url
        .query_pairs()
        .filter(|(name, _)| name == "key")
        .map(|(_, value)| value.into_owned())
        .collect()
}

#[tokio::test]
async fn test_list_models_passthrough() {
    let gemini = MockGemini::start().await;
    gemini.mock_list_models().await;
    let server = test_server(test_config(&gemini.uri()));

    let response = server.get(&format!("{MOUNT}/v1beta/models")).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body, GeminiTestData::models_list());

    let headers = response.headers();
    assert_eq!(
        headers.get("content-type").unwrap(),
        "application/json; charset=UTF-8"
    );
    assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
    assert!(headers.get("x-request-id").is_some());
    assert!(headers.get("x-response-time").is_some());
}

#[tokio::test]
async fn test_missing_version_prefix_is_added() {
    let gemini = MockGemini::start().await;
    gemini.mock_list_models().await;
    let server = test_server(test_config(&gemini.uri()));

    server.get(&format!("{MOUNT}/models")).await.assert_status_ok();
    server.get(MOUNT).await.assert_status_ok();

    let received = gemini.received_requests().await;
    assert_eq!(received.len(), 2);
    for request in &received {
        assert_eq!(request.url.path(), "/v1beta/models");
    }
}

#[tokio::test]
async fn test_client_key_is_never_forwarded() {
    let gemini = MockGemini::start().await;
    gemini.mock_list_models().await;
    let server = test_server(test_config(&gemini.uri()));

    let response = server
        .get(&format!("{MOUNT}/v1beta/models"))
        .add_query_param("pageSize", "2")
        .add_query_param("key", CLIENT_API_KEY)
        .await;

    response.assert_status_ok();

    let received = gemini.received_requests().await;
    assert_eq!(received.len(), 1);
    let request = &received[0];

    assert_eq!(key_params(request), vec![TEST_API_KEY.to_string()]);
    assert!(!request.url.as_str().contains(CLIENT_API_KEY));
    assert!(request
        .url
        .query_pairs()
        .any(|(name, value)| name == "pageSize" && value == "2"));

    // The credential is the last parameter
    let (last_name, _) = request.url.query_pairs().last().unwrap();
    assert_eq!(last_name, "key");
}

#[tokio::test]
async fn test_legacy_model_alias_is_rewritten() {
    let gemini = MockGemini::start().await;
    gemini
        .mock_generate_content("gemini-2.5-flash", GeminiTestData::text_response("hi"))
        .await;
    let server = test_server(test_config(&gemini.uri()));

    for alias in ["gemini-pro", "gemini-2.0-pro", "gemini-2.5-flash-latest"] {
        let response = server
            .post(&format!("{MOUNT}/v1beta/models/{alias}:generateContent"))
            .json(&json!({"contents": [{"parts": [{"text": "hello"}]}]}))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["success"], true, "alias {alias}");
    }

    for request in gemini.received_requests().await {
        assert_eq!(
            request.url.path(),
            "/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}

#[tokio::test]
async fn test_body_is_forwarded_as_canonical_json() {
    let gemini = MockGemini::start().await;
    gemini
        .mock_generate_content("gemini-2.5-flash", GeminiTestData::text_response("hi"))
        .await;
    let server = test_server(test_config(&gemini.uri()));

    server
        .post(&format!("{MOUNT}/v1beta/models/gemini-2.5-flash:generateContent"))
        .bytes("{\n  \"contents\" : [ ]\n}".into())
        .await
        .assert_status_ok();

    let received = gemini.received_requests().await;
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].body, br#"{"contents":[]}"#.to_vec());
}

#[tokio::test]
async fn test_upstream_headers_are_fixed() {
    let gemini = MockGemini::start().await;
    gemini.mock_list_models().await;
    let server = test_server(test_config(&gemini.uri()));

    let response = server
        .get(&format!("{MOUNT}/v1beta/models"))
        .add_header(
            HeaderName::from_static("authorization"),
            HeaderValue::from_static("Bearer client-token"),
        )
        .add_header(
            HeaderName::from_static("x-custom"),
            HeaderValue::from_static("leak-me"),
        )
        .await;

    response.assert_status_ok();
    let request_id = response.headers().get("x-request-id").unwrap().clone();

    let received = gemini.received_requests().await;
    let headers = &received[0].headers;

    assert!(headers.get("authorization").is_none());
    assert!(headers.get("x-custom").is_none());
    assert_eq!(headers.get("x-request-id").unwrap(), &request_id);
    assert!(headers
        .get("user-agent")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("gemini-proxy/"));
}

#[tokio::test]
async fn test_identical_requests_reach_upstream_independently() {
    let gemini = MockGemini::start().await;
    gemini.mock_list_models().await;
    let server = test_server(test_config(&gemini.uri()));

    let first = server.get(&format!("{MOUNT}/v1beta/models")).await;
    let second = server.get(&format!("{MOUNT}/v1beta/models")).await;

    first.assert_status_ok();
    second.assert_status_ok();
    assert_eq!(first.text(), second.text());
    assert_ne!(
        first.headers().get("x-request-id"),
        second.headers().get("x-request-id")
    );

    // No caching: both calls went upstream
    assert_eq!(gemini.received_requests().await.len(), 2);
}
