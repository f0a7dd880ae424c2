//! The request pipeline
//!
//! inbound -> request normalizer (with alias rewriting) -> forwarder ->
//! response normalizer -> outbound. Every failure, including a panic inside
//! the pipeline, is turned into a JSON response carrying the correlation id.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::http::{Method, StatusCode};
use futures::FutureExt;
use tracing::Instrument;

use crate::config::Config;
use crate::error::{ProxyError, ProxyResult};
use crate::proxy::forwarder::Forwarder;
use crate::proxy::headers::{cors_headers, set_request_id};
use crate::proxy::logging::RequestContext;
use crate::proxy::request::RequestNormalizer;
use crate::proxy::response::ResponseNormalizer;
use crate::proxy::transport::Transport;
use crate::proxy::types::{InboundRequest, OutboundBody, OutboundResult};
use crate::routes::metrics::record_request;

/// Stateless forwarding pipeline shared by all invocations
///
/// Holds only read-only configuration and the transport; each call to
/// [`GeminiProxy::handle`] owns its own [`RequestContext`].
pub struct GeminiProxy {
    api_key: Option<String>,
    request_normalizer: RequestNormalizer,
    forwarder: Forwarder,
    response_normalizer: ResponseNormalizer,
}

impl GeminiProxy {
    /// Build the pipeline from configuration and a transport
    pub fn new(config: &Config, transport: Arc<dyn Transport>) -> Self {
        Self {
            api_key: config.api_key.clone(),
            request_normalizer: RequestNormalizer::new(config),
            forwarder: Forwarder::new(transport, config.upstream_timeout),
            response_normalizer: ResponseNormalizer::new(config.error_body_limit),
        }
    }

    /// Whether a credential is configured
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Run one inbound request through the pipeline. Never fails.
    pub async fn handle(&self, inbound: InboundRequest) -> OutboundResult {
        let ctx = RequestContext::new(inbound.method.as_str(), &inbound.path);
        let span = ctx.create_span();

        async {
            ctx.log_request_start();

            if inbound.method == Method::OPTIONS {
                record_request("preflight", ctx.start_time.elapsed().as_secs_f64());
                return preflight(&ctx);
            }

            let outcome = AssertUnwindSafe(self.run(&inbound, &ctx))
                .catch_unwind()
                .await;

            let (result, label) = match outcome {
                Ok(Ok(result)) => {
                    ctx.log_request_complete(result.status.as_u16());
                    let label = outcome_label(&result);
                    (result, label)
                }
                Ok(Err(e)) => {
                    ctx.log_error(e.code(), &e.to_string());
                    let label = e.code().to_ascii_lowercase();
                    (e.into_outbound(&ctx), label)
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    ctx.log_error("PANIC", &message);
                    let e = ProxyError::Internal(anyhow::anyhow!("panic: {message}"));
                    let label = e.code().to_ascii_lowercase();
                    (e.into_outbound(&ctx), label)
                }
            };

            record_request(&label, ctx.start_time.elapsed().as_secs_f64());
            result
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        inbound: &InboundRequest,
        ctx: &RequestContext,
    ) -> ProxyResult<OutboundResult> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ProxyError::Configuration("GEMINI_API_KEY is not configured".to_string())
        })?;

        let upstream = self.request_normalizer.normalize(inbound, api_key, ctx)?;
        let response = self.forwarder.forward(&upstream, ctx).await?;
        self.response_normalizer
            .normalize(response, upstream.is_generation, ctx)
    }
}

/// Pre-flight answer: CORS headers, empty body, no upstream call
fn preflight(ctx: &RequestContext) -> OutboundResult {
    let mut headers = cors_headers();
    set_request_id(&mut headers, &ctx.request_id);

    OutboundResult {
        status: StatusCode::OK,
        headers,
        body: OutboundBody::Empty,
    }
}

fn outcome_label(result: &OutboundResult) -> String {
    let anomaly = matches!(
        &result.body,
        OutboundBody::Json(body) if body.get("success") == Some(&serde_json::Value::Bool(false))
    );
    if anomaly {
        "generation_anomaly".to_string()
    } else {
        "success".to_string()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
