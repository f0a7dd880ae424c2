//! Deadline-bound upstream forwarding
//!
//! One attempt per inbound request. The transport future is raced against the
//! deadline; when the deadline wins the future is dropped, which aborts the
//! in-flight call and releases its timer on every exit path.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::{ProxyError, ProxyResult, TransportError};
use crate::proxy::logging::RequestContext;
use crate::proxy::transport::Transport;
use crate::proxy::types::{UpstreamRequest, UpstreamResponse};

/// Sends upstream requests through a [`Transport`] under a fixed deadline
#[derive(Clone)]
pub struct Forwarder {
    transport: Arc<dyn Transport>,
    deadline: Duration,
}

impl Forwarder {
    /// Create a forwarder
    pub fn new(transport: Arc<dyn Transport>, deadline: Duration) -> Self {
        Self {
            transport,
            deadline,
        }
    }

    /// Execute exactly one upstream call
    pub async fn forward(
        &self,
        request: &UpstreamRequest,
        ctx: &RequestContext,
    ) -> ProxyResult<UpstreamResponse> {
        ctx.log_upstream_request(
            self.transport.name(),
            &request.redacted_url(),
            request.body.as_ref().map(|body| body.len()),
        );

        match tokio::time::timeout(self.deadline, self.transport.send(request)).await {
            Ok(Ok(response)) => {
                ctx.log_upstream_response(response.status.as_u16(), response.body.len());
                Ok(response)
            }
            // A transport that enforces its own shorter timeout is still a timeout
            Ok(Err(TransportError::TimedOut(reason))) => {
                debug!(request_id = %ctx.request_id, reason = %reason, "Transport reported timeout");
                ctx.log_timeout(self.deadline.as_millis());
                Err(ProxyError::Timeout(self.deadline))
            }
            Ok(Err(e)) => Err(ProxyError::Transport(e)),
            Err(_elapsed) => {
                ctx.log_timeout(self.deadline.as_millis());
                Err(ProxyError::Timeout(self.deadline))
            }
        }
    }
}
