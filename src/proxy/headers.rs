//! Header utilities for the proxy
//!
//! Builds the fixed header set sent upstream and the CORS/correlation headers
//! attached to every outbound response. Client headers are never forwarded,
//! so nothing the client sends can reach the upstream API.

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};

use crate::error::{ProxyError, ProxyResult};

/// Correlation id header, set on every outbound response and sent upstream
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Processing time in milliseconds, set on successful responses
pub static X_RESPONSE_TIME: HeaderName = HeaderName::from_static("x-response-time");

pub const ALLOW_HEADERS: &str = "Content-Type, Authorization, X-Request-ID";
pub const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
pub const MAX_AGE: &str = "86400";
pub const EXPOSE_HEADERS: &str = "X-Request-ID, X-Response-Time";

/// CORS headers answered to pre-flight requests and merged into every response
pub fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(MAX_AGE));
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static(EXPOSE_HEADERS),
    );
    headers
}

/// Headers for an outbound response: CORS, content type and correlation id
pub fn response_headers(request_id: &str, content_type: HeaderValue) -> HeaderMap {
    let mut headers = cors_headers();
    headers.insert(header::CONTENT_TYPE, content_type);
    set_request_id(&mut headers, request_id);
    headers
}

/// Attach the correlation id. Ids are generated UUIDs, so a rejected value
/// only happens if something upstream of us hands over garbage.
pub fn set_request_id(headers: &mut HeaderMap, request_id: &str) {
    if let Ok(value) = HeaderValue::from_str(request_id) {
        headers.insert(X_REQUEST_ID.clone(), value);
    }
}

/// Attach `X-Response-Time` in whole milliseconds
pub fn set_response_time(headers: &mut HeaderMap, elapsed_ms: u128) {
    if let Ok(value) = HeaderValue::from_str(&format!("{elapsed_ms}ms")) {
        headers.insert(X_RESPONSE_TIME.clone(), value);
    }
}

/// Build the fixed header set for an upstream request
pub fn build_upstream_headers(user_agent: &str, request_id: &str) -> ProxyResult<HeaderMap> {
    let mut headers = HeaderMap::new();

    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::USER_AGENT,
        HeaderValue::from_str(user_agent)
            .map_err(|e| ProxyError::Internal(anyhow::anyhow!("Invalid user agent: {e}")))?,
    );
    set_request_id(&mut headers, request_id);

    Ok(headers)
}
