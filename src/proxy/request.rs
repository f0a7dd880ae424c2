//! Request normalization
//!
//! Derives the single upstream request from an inbound request: versioned and
//! alias-rewritten path, client query minus any client credential plus the
//! server credential, fixed headers, and a re-serialized JSON body.

use axum::http::Method;
use bytes::Bytes;
use reqwest::Url;
use serde_json::{Map, Value};

use crate::config::{Config, GenerationConfigPolicy};
use crate::error::{ProxyError, ProxyResult};
use crate::proxy::headers::build_upstream_headers;
use crate::proxy::logging::RequestContext;
use crate::proxy::models::ModelAliases;
use crate::proxy::types::{InboundRequest, UpstreamRequest};

/// Query parameter carrying the credential
pub const CREDENTIAL_PARAM: &str = "key";

/// Operation name whose responses go through text extraction
pub const GENERATE_CONTENT_OPERATION: &str = "generateContent";

/// Path used when the client sent nothing after the mount prefix
const DEFAULT_REMAINDER: &str = "/models";

/// Builds [`UpstreamRequest`]s from inbound requests
#[derive(Debug, Clone)]
pub struct RequestNormalizer {
    upstream_url: String,
    api_version: String,
    mount_prefix: String,
    user_agent: String,
    aliases: ModelAliases,
    generation_policy: GenerationConfigPolicy,
    generation_defaults: Map<String, Value>,
}

impl RequestNormalizer {
    /// Create a normalizer from configuration
    pub fn new(config: &Config) -> Self {
        Self {
            upstream_url: config.upstream_url.clone(),
            api_version: config.api_version.clone(),
            mount_prefix: config.mount_prefix.clone(),
            user_agent: config.user_agent.clone(),
            aliases: ModelAliases::new(config.canonical_model.clone()),
            generation_policy: config.generation_policy,
            generation_defaults: config.generation_defaults.clone(),
        }
    }

    /// Derive the upstream request for `inbound` using `api_key`
    pub fn normalize(
        &self,
        inbound: &InboundRequest,
        api_key: &str,
        ctx: &RequestContext,
    ) -> ProxyResult<UpstreamRequest> {
        let path = self.versioned_path(&inbound.path);
        reject_dot_segments(&path)?;
        let path = self.aliases.rewrite_path(&path);
        let is_generation = is_generation_path(&path);

        // Validate before anything else so a bad body never costs an upstream call
        let body = self.normalize_body(&inbound.method, inbound.body.as_ref(), is_generation)?;

        let url = build_upstream_url(&self.upstream_url, &path, &inbound.raw_query, api_key)?;
        let headers = build_upstream_headers(&self.user_agent, &ctx.request_id)?;

        Ok(UpstreamRequest {
            url,
            method: inbound.method.clone(),
            headers,
            body,
            is_generation,
        })
    }

    /// Strip the mount prefix and guarantee a leading API-version segment
    pub fn versioned_path(&self, inbound_path: &str) -> String {
        let remainder = strip_mount_prefix(inbound_path, &self.mount_prefix);
        let version = format!("/{}", self.api_version);

        if remainder == version || remainder.starts_with(&format!("{version}/")) {
            return remainder.to_string();
        }

        match remainder {
            "" | "/" => format!("{version}{DEFAULT_REMAINDER}"),
            rest if rest.starts_with('/') => format!("{version}{rest}"),
            rest => format!("{version}/{rest}"),
        }
    }

    fn normalize_body(
        &self,
        method: &Method,
        body: Option<&Bytes>,
        is_generation: bool,
    ) -> ProxyResult<Option<Bytes>> {
        if is_read_only(method) {
            return Ok(None);
        }
        let Some(raw) = body.filter(|b| !b.is_empty()) else {
            return Ok(None);
        };

        let mut value: Value = serde_json::from_slice(raw)?;
        if is_generation {
            self.apply_generation_defaults(&mut value);
        }

        let canonical = serde_json::to_vec(&value)
            .map_err(|e| ProxyError::Internal(anyhow::anyhow!("Failed to encode body: {e}")))?;
        Ok(Some(Bytes::from(canonical)))
    }

    fn apply_generation_defaults(&self, body: &mut Value) {
        if self.generation_policy == GenerationConfigPolicy::Preserve
            || self.generation_defaults.is_empty()
        {
            return;
        }
        let Value::Object(body) = body else {
            return;
        };

        let entry = body
            .entry("generationConfig")
            .or_insert_with(|| Value::Object(Map::new()));
        // A non-object generationConfig is the client's problem; upstream will say so
        let Value::Object(generation_config) = entry else {
            return;
        };

        for (key, default) in &self.generation_defaults {
            match self.generation_policy {
                GenerationConfigPolicy::Fill => {
                    generation_config
                        .entry(key.clone())
                        .or_insert_with(|| default.clone());
                }
                GenerationConfigPolicy::Override => {
                    generation_config.insert(key.clone(), default.clone());
                }
                GenerationConfigPolicy::Preserve => {}
            }
        }
    }
}

impl UpstreamRequest {
    /// URL with the credential replaced, safe for logs
    pub fn redacted_url(&self) -> String {
        redact_url(&self.url)
    }
}

/// Methods that never carry a body upstream
pub fn is_read_only(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD)
}

/// Whether the last path segment invokes `generateContent`
pub fn is_generation_path(path: &str) -> bool {
    path.rsplit('/')
        .next()
        .and_then(|segment| segment.split_once(':'))
        .is_some_and(|(_, operation)| operation == GENERATE_CONTENT_OPERATION)
}

/// Refuse `.` and `..` segments, percent-encoded or not. URL parsing would
/// resolve them and move the request outside the version prefix.
pub fn reject_dot_segments(path: &str) -> ProxyResult<()> {
    // `\` is a path separator for https URLs
    let dotted = path.split(['/', '\\']).any(|segment| {
        let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
        decoded == "." || decoded == ".."
    });

    if dotted {
        return Err(ProxyError::InvalidPath(
            "dot segments are not allowed".to_string(),
        ));
    }
    Ok(())
}

fn strip_mount_prefix<'a>(path: &'a str, mount_prefix: &str) -> &'a str {
    if mount_prefix.is_empty() {
        return path;
    }
    match path.strip_prefix(mount_prefix) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => path,
    }
}

/// Join base and path, copy every client query pair except the credential,
/// and append the server credential last.
pub fn build_upstream_url(
    base: &str,
    path: &str,
    raw_query: &str,
    api_key: &str,
) -> ProxyResult<String> {
    let mut url = Url::parse(&format!("{base}{path}")).map_err(|e| {
        ProxyError::Internal(anyhow::anyhow!("Invalid upstream URL for path {path}: {e}"))
    })?;

    // Parsing must not have moved the request out of its first segment
    let base_path = Url::parse(base)
        .map(|base| base.path().trim_end_matches('/').to_string())
        .unwrap_or_default();
    let expected = format!("{base_path}/{}", first_segment(path));
    let resolved = url.path();
    if resolved != expected && !resolved.starts_with(&format!("{expected}/")) {
        return Err(ProxyError::InvalidPath(format!(
            "path resolves outside {expected}"
        )));
    }

    let client_pairs: Vec<(String, String)> = if raw_query.is_empty() {
        Vec::new()
    } else {
        url.set_query(Some(raw_query));
        url.query_pairs()
            .filter(|(name, _)| name != CREDENTIAL_PARAM)
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect()
    };

    url.set_query(None);
    url.query_pairs_mut()
        .extend_pairs(client_pairs)
        .append_pair(CREDENTIAL_PARAM, api_key);

    Ok(url.to_string())
}

fn first_segment(path: &str) -> &str {
    path.trim_start_matches('/').split('/').next().unwrap_or_default()
}

/// Replace the credential value in `url` with `***`
pub fn redact_url(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return "<unparseable url>".to_string();
    };

    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(name, value)| {
            let value = if name == CREDENTIAL_PARAM {
                "***".to_string()
            } else {
                value.into_owned()
            };
            (name.into_owned(), value)
        })
        .collect();

    if !pairs.is_empty() {
        parsed.query_pairs_mut().clear().extend_pairs(pairs);
    }
    parsed.to_string()
}
