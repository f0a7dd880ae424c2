//! HTTP transport abstraction
//!
//! The pipeline talks to the upstream API only through [`Transport`], so the
//! host can swap in its own client and tests can count or stall calls.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::proxy::types::{UpstreamRequest, UpstreamResponse};

/// Executes a single upstream HTTP exchange
///
/// Implementations MUST:
/// - Send exactly one request per call (no retries)
/// - Buffer the full response body before returning
/// - Send only the headers present on the [`UpstreamRequest`]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport name for logging
    fn name(&self) -> &'static str;

    /// Send the request and return the buffered response
    async fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, TransportError>;
}

/// Production transport backed by a pooled `reqwest::Client`
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with a connection-pooled client
    ///
    /// No client-level timeout is set; the forwarder owns the deadline.
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(100)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    fn name(&self) -> &'static str {
        "reqwest"
    }

    async fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .headers(request.headers.clone());

        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}
