//! Pre-flight integration tests
//!
//! OPTIONS requests are answered locally with the CORS header set and never
//! reach the transport, whatever the path, body or configuration.

use axum::http::{Method, StatusCode};
use bytes::Bytes;
use pretty_assertions::assert_eq;

use gemini_proxy::Config;

use crate::common::{constants::MOUNT, test_config, test_server_with_transport, CountingTransport};

#[tokio::test]
async fn test_options_returns_cors_headers_without_upstream_call() {
    let transport = CountingTransport::new();
    let server = test_server_with_transport(test_config("http://unused.test"), transport.clone());

    let response = server
        .method(Method::OPTIONS, &format!("{MOUNT}/v1beta/models/gemini-pro:generateContent"))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "");

    let headers = response.headers();
    assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
    assert_eq!(
        headers.get("access-control-allow-headers").unwrap(),
        "Content-Type, Authorization, X-Request-ID"
    );
    assert_eq!(
        headers.get("access-control-allow-methods").unwrap(),
        "GET, POST, PUT, DELETE, OPTIONS"
    );
    assert_eq!(headers.get("access-control-max-age").unwrap(), "86400");
    assert_eq!(
        headers.get("access-control-expose-headers").unwrap(),
        "X-Request-ID, X-Response-Time"
    );
    assert!(headers.get("x-request-id").is_some());

    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_options_ignores_body_and_path() {
    let transport = CountingTransport::new();
    let server = test_server_with_transport(test_config("http://unused.test"), transport.clone());

    for path in ["/", "/anything/at/all", "/v1beta"] {
        let response = server
            .method(Method::OPTIONS, path)
            .bytes(Bytes::from_static(b"{not json"))
            .await;

        assert_eq!(response.status_code(), StatusCode::OK, "path {path}");
        assert_eq!(response.text(), "");
    }

    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_options_succeeds_without_api_key() {
    let transport = CountingTransport::new();
    let server = test_server_with_transport(Config::default(), transport.clone());

    let response = server.method(Method::OPTIONS, "/v1beta/models").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(transport.calls(), 0);
}
