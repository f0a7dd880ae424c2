//! Request and response shapes flowing through the proxy pipeline

use axum::body::Body;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde_json::Value;

/// Request as delivered by the host environment
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    /// Raw path, still carrying the mount prefix
    pub path: String,
    /// Query string without the leading `?` (may be empty)
    pub raw_query: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl InboundRequest {
    /// Create a body-less request
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            raw_query: String::new(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Set the raw query string
    pub fn with_query(mut self, raw_query: impl Into<String>) -> Self {
        self.raw_query = raw_query.into();
        self
    }

    /// Set the request body
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Fully derived upstream call. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    /// Fully qualified URL with the credential as the final `key` parameter
    pub url: String,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    /// Whether the path targets the `generateContent` operation
    pub is_generation: bool,
}

/// Buffered upstream response
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Body handed back to the host environment
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundBody {
    Empty,
    Bytes(Bytes),
    Json(Value),
}

/// Final pipeline output
#[derive(Debug, Clone)]
pub struct OutboundResult {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: OutboundBody,
}

impl OutboundResult {
    /// Decode the body as JSON regardless of how it is held
    pub fn body_json(&self) -> Option<Value> {
        match &self.body {
            OutboundBody::Json(value) => Some(value.clone()),
            OutboundBody::Bytes(bytes) => serde_json::from_slice(bytes).ok(),
            OutboundBody::Empty => None,
        }
    }

    /// Header value as a string, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

impl IntoResponse for OutboundResult {
    fn into_response(self) -> Response {
        let body = match self.body {
            OutboundBody::Empty => Body::empty(),
            OutboundBody::Bytes(bytes) => Body::from(bytes),
            OutboundBody::Json(value) => Body::from(serde_json::to_vec(&value).unwrap_or_default()),
        };

        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
