//! Response normalization
//!
//! Maps a buffered upstream response to the outbound result. Non-success
//! statuses become structured errors that keep the upstream status code.
//! Successful `generateContent` responses are decoded once into
//! [`GenerationResponse`] so a refused, filtered or truncated generation is
//! reported as data instead of failing on a missing field.

use axum::http::{header, HeaderValue, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::error::{truncate_chars, ProxyError, ProxyResult};
use crate::proxy::headers::{response_headers, set_response_time};
use crate::proxy::logging::RequestContext;
use crate::proxy::types::{OutboundBody, OutboundResult, UpstreamResponse};

/// Outcome of decoding a successful `generateContent` body
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationResponse {
    /// First candidate's first part carried text
    Text {
        text: String,
        usage_metadata: Option<Value>,
    },
    /// Upstream reported an error inside a 2xx body
    Error { message: String },
    /// No candidates, typically a blocked prompt
    NoCandidates { block_reason: Option<String> },
    /// First candidate had no content parts
    NoParts { finish_reason: Option<String> },
    /// First part had no text (absent or null)
    NoText { finish_reason: Option<String> },
}

impl GenerationResponse {
    /// Decode the generation shape from a parsed upstream body
    pub fn decode(body: &Value) -> Self {
        if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
            return GenerationResponse::Error {
                message: error_message(error),
            };
        }

        let first_candidate = body
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|candidates| candidates.first());
        let Some(candidate) = first_candidate else {
            return GenerationResponse::NoCandidates {
                block_reason: body
                    .pointer("/promptFeedback/blockReason")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            };
        };

        let finish_reason = candidate
            .get("finishReason")
            .and_then(Value::as_str)
            .map(str::to_string);

        let first_part = candidate
            .get("content")
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array)
            .and_then(|parts| parts.first());
        let Some(part) = first_part else {
            return GenerationResponse::NoParts { finish_reason };
        };

        // An empty string is valid text; only absent or non-string counts as missing
        match part.get("text").and_then(Value::as_str) {
            Some(text) => GenerationResponse::Text {
                text: text.to_string(),
                usage_metadata: body.get("usageMetadata").cloned(),
            },
            None => GenerationResponse::NoText { finish_reason },
        }
    }

    /// Machine-readable failure reason, `None` on success
    pub fn failure_reason(&self) -> Option<&'static str> {
        match self {
            GenerationResponse::Text { .. } => None,
            GenerationResponse::Error { .. } => Some("upstream_error"),
            GenerationResponse::NoCandidates { .. } => Some("no_candidates"),
            GenerationResponse::NoParts { .. } => Some("no_parts"),
            GenerationResponse::NoText { .. } => Some("no_text"),
        }
    }
}

fn error_message(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        other => other
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| "Unknown upstream error".to_string()),
    }
}

/// Payload returned for a decoded generation call
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationPayload {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
    pub response: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<Value>,
    pub request_id: String,
}

impl GenerationPayload {
    fn failure(
        reason: &'static str,
        message: impl Into<String>,
        response: Value,
        ctx: &RequestContext,
    ) -> Self {
        Self {
            success: false,
            text: None,
            reason: Some(reason),
            error: Some(message.into()),
            finish_reason: None,
            block_reason: None,
            response,
            usage_metadata: None,
            request_id: ctx.request_id.clone(),
        }
    }

    fn from_decoded(decoded: GenerationResponse, response: Value, ctx: &RequestContext) -> Self {
        match decoded {
            GenerationResponse::Text {
                text,
                usage_metadata,
            } => Self {
                success: true,
                text: Some(text),
                reason: None,
                error: None,
                finish_reason: None,
                block_reason: None,
                response,
                usage_metadata,
                request_id: ctx.request_id.clone(),
            },
            GenerationResponse::Error { message } => {
                Self::failure("upstream_error", message, response, ctx)
            }
            GenerationResponse::NoCandidates { block_reason } => Self {
                block_reason,
                ..Self::failure(
                    "no_candidates",
                    "Upstream returned no candidates",
                    response,
                    ctx,
                )
            },
            GenerationResponse::NoParts { finish_reason } => Self {
                finish_reason,
                ..Self::failure(
                    "no_parts",
                    "First candidate has no content parts",
                    response,
                    ctx,
                )
            },
            GenerationResponse::NoText { finish_reason } => Self {
                finish_reason,
                ..Self::failure(
                    "no_text",
                    "First content part has no text",
                    response,
                    ctx,
                )
            },
        }
    }
}

/// Converts upstream responses into outbound results
#[derive(Debug, Clone)]
pub struct ResponseNormalizer {
    error_body_limit: usize,
}

impl ResponseNormalizer {
    /// Create a normalizer that truncates upstream error bodies to `error_body_limit` chars
    pub fn new(error_body_limit: usize) -> Self {
        Self { error_body_limit }
    }

    /// Map an upstream response to the outbound result
    ///
    /// Non-success statuses come back as [`ProxyError::Upstream`] so they share
    /// the error rendering path with every other failure.
    pub fn normalize(
        &self,
        response: UpstreamResponse,
        is_generation: bool,
        ctx: &RequestContext,
    ) -> ProxyResult<OutboundResult> {
        if !response.status.is_success() {
            let body = String::from_utf8_lossy(&response.body);
            return Err(ProxyError::Upstream {
                status: response.status,
                body: truncate_chars(&body, self.error_body_limit),
            });
        }

        let mut result = if is_generation {
            self.extract_generation(&response, ctx)
        } else {
            passthrough(response, ctx)
        };
        set_response_time(&mut result.headers, ctx.elapsed_ms());
        Ok(result)
    }

    fn extract_generation(
        &self,
        response: &UpstreamResponse,
        ctx: &RequestContext,
    ) -> OutboundResult {
        let payload = match serde_json::from_slice::<Value>(&response.body) {
            Ok(body) => {
                let decoded = GenerationResponse::decode(&body);
                if let Some(reason) = decoded.failure_reason() {
                    ctx.log_generation_anomaly(reason);
                }
                GenerationPayload::from_decoded(decoded, body, ctx)
            }
            Err(e) => {
                ctx.log_generation_anomaly("invalid_json");
                let raw = String::from_utf8_lossy(&response.body);
                GenerationPayload::failure(
                    "invalid_json",
                    format!("Upstream body is not valid JSON: {e}"),
                    Value::String(truncate_chars(&raw, self.error_body_limit)),
                    ctx,
                )
            }
        };

        OutboundResult {
            status: StatusCode::OK,
            headers: response_headers(
                &ctx.request_id,
                HeaderValue::from_static("application/json"),
            ),
            body: OutboundBody::Json(serde_json::to_value(payload).unwrap_or(Value::Null)),
        }
    }
}

fn passthrough(response: UpstreamResponse, ctx: &RequestContext) -> OutboundResult {
    let content_type = response
        .headers
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/json"));

    OutboundResult {
        status: response.status,
        headers: response_headers(&ctx.request_id, content_type),
        body: OutboundBody::Bytes(response.body),
    }
}
