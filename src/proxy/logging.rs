//! Request logging utilities for the proxy pipeline
//!
//! Provides structured logging with correlation IDs so a single invocation can
//! be followed from the inbound request through the upstream call to the
//! outbound response.

use std::time::Instant;
use tracing::{debug, error, info, warn, Span};
use uuid::Uuid;

/// Per-invocation correlation and timing state
///
/// Created at pipeline entry and dropped at exit. Nothing in here outlives a
/// single request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique identifier for this request (echoed as `X-Request-ID`)
    pub request_id: String,
    /// When the request entered the pipeline
    pub start_time: Instant,
    /// Inbound method
    pub method: String,
    /// Inbound path
    pub path: String,
}

impl RequestContext {
    /// Create a new request context with a fresh correlation id
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            start_time: Instant::now(),
            method: method.to_string(),
            path: path.to_string(),
        }
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u128 {
        self.start_time.elapsed().as_millis()
    }

    /// Log request initiation
    pub fn log_request_start(&self) {
        info!(
            request_id = %self.request_id,
            method = %self.method,
            path = %self.path,
            "Request started"
        );
    }

    /// Log request being sent upstream. `url` must already be redacted.
    pub fn log_upstream_request(&self, transport: &str, url: &str, body_size: Option<usize>) {
        debug!(
            request_id = %self.request_id,
            transport = transport,
            url = %url,
            body_size = ?body_size,
            elapsed_ms = %self.elapsed_ms(),
            "Sending request to upstream"
        );
    }

    /// Log response received from upstream
    pub fn log_upstream_response(&self, status: u16, body_size: usize) {
        info!(
            request_id = %self.request_id,
            path = %self.path,
            status = %status,
            body_size = %body_size,
            elapsed_ms = %self.elapsed_ms(),
            "Response received from upstream"
        );
    }

    /// Log successful request completion
    pub fn log_request_complete(&self, status: u16) {
        info!(
            request_id = %self.request_id,
            method = %self.method,
            path = %self.path,
            status = %status,
            elapsed_ms = %self.elapsed_ms(),
            "Request completed"
        );
    }

    /// Log a generation call that succeeded over HTTP but carried no usable text
    pub fn log_generation_anomaly(&self, reason: &str) {
        warn!(
            request_id = %self.request_id,
            path = %self.path,
            reason = %reason,
            elapsed_ms = %self.elapsed_ms(),
            "Generation response missing expected fields"
        );
    }

    /// Log request failure
    pub fn log_error(&self, kind: &str, error: &str) {
        error!(
            request_id = %self.request_id,
            method = %self.method,
            path = %self.path,
            kind = %kind,
            elapsed_ms = %self.elapsed_ms(),
            error = %error,
            "Request failed"
        );
    }

    /// Log timeout
    pub fn log_timeout(&self, timeout_ms: u128) {
        error!(
            request_id = %self.request_id,
            path = %self.path,
            timeout_ms = %timeout_ms,
            elapsed_ms = %self.elapsed_ms(),
            "Upstream request timed out"
        );
    }

    /// Create a tracing span for this request
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "gemini_request",
            request_id = %self.request_id,
            method = %self.method,
            path = %self.path,
        )
    }
}
