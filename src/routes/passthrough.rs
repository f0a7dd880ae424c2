//! Pass-through proxy handler
//!
//! Catch-all handler that adapts every request not matched by another route
//! into an [`InboundRequest`], runs it through the pipeline and renders the
//! result. The pipeline never fails, so neither does this handler.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    response::{IntoResponse, Response},
};
use http_body_util::BodyExt;

use crate::{
    error::ProxyError,
    proxy::{InboundRequest, RequestContext},
    AppState,
};

/// Forward any request through the Gemini pipeline
pub async fn passthrough_handler(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Response {
    let (parts, body) = request.into_parts();

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            let ctx = RequestContext::new(parts.method.as_str(), parts.uri.path());
            ctx.log_error("BODY_READ", &e.to_string());
            return ProxyError::Internal(anyhow::anyhow!("Failed to read request body: {e}"))
                .into_outbound(&ctx)
                .into_response();
        }
    };

    let inbound = InboundRequest {
        method: parts.method,
        path: parts.uri.path().to_string(),
        raw_query: parts.uri.query().unwrap_or_default().to_string(),
        headers: parts.headers,
        body: (!body.is_empty()).then_some(body),
    };

    state.proxy.handle(inbound).await.into_response()
}
