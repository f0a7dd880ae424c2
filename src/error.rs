//! Error types for the Gemini proxy
//!
//! Every failure the pipeline can hit is one of these variants. Each variant
//! maps to a fixed HTTP status and machine-readable code, and is rendered into
//! a JSON payload that carries the correlation id.

use std::time::Duration;

use axum::http::{HeaderValue, StatusCode};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::proxy::headers::response_headers;
use crate::proxy::logging::RequestContext;
use crate::proxy::types::{OutboundBody, OutboundResult};

/// Failures raised by an HTTP transport before any response arrived
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Transport timed out: {0}")]
    TimedOut(String),

    #[error("Failed to read upstream body: {0}")]
    Body(String),

    #[error("Transport error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        // The request URL carries the credential
        let e = e.without_url();
        if e.is_timeout() {
            TransportError::TimedOut(e.to_string())
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            TransportError::Body(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

/// Pipeline-level errors
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Server configuration error: {0}")]
    Configuration(String),

    #[error("Malformed JSON body: {0}")]
    MalformedBody(#[from] serde_json::Error),

    #[error("Invalid request path: {0}")]
    InvalidPath(String),

    #[error("Upstream returned {status}")]
    Upstream { status: StatusCode, body: String },

    #[error("Upstream did not respond within {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Upstream request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Error response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub request_id: String,
}

/// Error details
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ProxyError {
    /// HTTP status this error is reported with
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            ProxyError::InvalidPath(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream { status, .. } => *status,
            ProxyError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Transport(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable code used in payloads, logs and metrics
    pub fn code(&self) -> &'static str {
        match self {
            ProxyError::Configuration(_) => "CONFIGURATION_ERROR",
            ProxyError::MalformedBody(_) => "INVALID_JSON",
            ProxyError::InvalidPath(_) => "INVALID_PATH",
            ProxyError::Upstream { .. } => "UPSTREAM_ERROR",
            ProxyError::Timeout(_) => "UPSTREAM_TIMEOUT",
            ProxyError::Transport(_) => "BAD_GATEWAY",
            ProxyError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Client-facing message. Internal faults are not described in detail.
    fn public_message(&self) -> String {
        match self {
            ProxyError::Configuration(_) => "Server configuration error".to_string(),
            ProxyError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            ProxyError::Upstream { body, .. } => Some(parse_upstream_body(body)),
            ProxyError::Timeout(limit) => Some(serde_json::json!({
                "timeoutMs": limit.as_millis() as u64,
            })),
            _ => None,
        }
    }

    /// Render this error as the outbound result for `ctx`
    pub fn into_outbound(self, ctx: &RequestContext) -> OutboundResult {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code().to_string(),
                message: self.public_message(),
                details: self.details(),
            },
            request_id: ctx.request_id.clone(),
        };

        OutboundResult {
            status,
            headers: response_headers(
                &ctx.request_id,
                HeaderValue::from_static("application/json"),
            ),
            body: OutboundBody::Json(serde_json::to_value(body).unwrap_or(Value::Null)),
        }
    }
}

/// Upstream error bodies are usually JSON; keep them structured when they are.
/// A body cut mid-document by truncation falls back to a plain string.
fn parse_upstream_body(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

/// Truncate to at most `limit` characters without splitting a code point
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}

/// Result type alias for convenience
pub type ProxyResult<T> = Result<T, ProxyError>;
