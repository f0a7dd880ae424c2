//! Configuration management for the Gemini proxy
//!
//! Configuration is loaded from environment variables once at startup and
//! handed to the pipeline by reference. Nothing below the host surface reads
//! the environment.

use std::env;
use std::fmt;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};

/// Default upstream host for the Gemini REST API
pub const DEFAULT_UPSTREAM_URL: &str = "https://generativelanguage.googleapis.com";

/// Default path prefix the proxy is mounted under
pub const DEFAULT_MOUNT_PREFIX: &str = "/.netlify/functions/gemini-proxy";

/// Default canonical model that legacy aliases are rewritten to
pub const DEFAULT_CANONICAL_MODEL: &str = "gemini-2.5-flash";

/// How client-supplied `generationConfig` values interact with configured defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationConfigPolicy {
    /// Never touch the client's `generationConfig`
    #[default]
    Preserve,
    /// Add default keys the client did not set
    Fill,
    /// Replace client keys with the configured defaults
    Override,
}

impl GenerationConfigPolicy {
    /// Parse the policy name used in `GENERATION_CONFIG_POLICY`
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "preserve" => Ok(Self::Preserve),
            "fill" => Ok(Self::Fill),
            "override" => Ok(Self::Override),
            other => bail!("Unknown generation config policy: {other}"),
        }
    }
}

/// Application configuration
#[derive(Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// Gemini API key injected into every upstream call
    pub api_key: Option<String>,
    /// Upstream base URL (scheme and host, no trailing slash)
    pub upstream_url: String,
    /// API version segment every upstream path must start with
    pub api_version: String,
    /// Inbound path prefix stripped before forwarding
    pub mount_prefix: String,
    /// Deadline for the single upstream call
    pub upstream_timeout: Duration,
    /// User-Agent sent upstream
    pub user_agent: String,

    /// Model identifier legacy aliases are rewritten to
    pub canonical_model: String,
    /// Policy for `generationConfig` on generation calls
    pub generation_policy: GenerationConfigPolicy,
    /// Default `generationConfig` entries
    pub generation_defaults: Map<String, Value>,

    /// Maximum characters of an upstream error body echoed to the client
    pub error_body_limit: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let generation_defaults = match env::var("GENERATION_CONFIG_DEFAULTS") {
            Ok(raw) if !raw.trim().is_empty() => parse_generation_defaults(&raw)?,
            _ => Map::new(),
        };

        Ok(Self {
            host: env::var("PROXY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PROXY_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid PROXY_PORT")?,

            api_key: env::var("GEMINI_API_KEY").ok().filter(|key| !key.is_empty()),
            upstream_url: env::var("GEMINI_API_URL")
                .unwrap_or_else(|_| DEFAULT_UPSTREAM_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_version: env::var("GEMINI_API_VERSION")
                .unwrap_or_else(|_| "v1beta".to_string())
                .trim_matches('/')
                .to_string(),
            mount_prefix: env::var("PROXY_MOUNT_PREFIX")
                .unwrap_or_else(|_| DEFAULT_MOUNT_PREFIX.to_string())
                .trim_end_matches('/')
                .to_string(),
            upstream_timeout: Duration::from_secs(
                env::var("UPSTREAM_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .context("Invalid UPSTREAM_TIMEOUT_SECS")?,
            ),
            user_agent: env::var("PROXY_USER_AGENT").unwrap_or_else(|_| default_user_agent()),

            canonical_model: env::var("GEMINI_CANONICAL_MODEL")
                .unwrap_or_else(|_| DEFAULT_CANONICAL_MODEL.to_string()),
            generation_policy: match env::var("GENERATION_CONFIG_POLICY") {
                Ok(raw) => GenerationConfigPolicy::parse(&raw)
                    .context("Invalid GENERATION_CONFIG_POLICY")?,
                Err(_) => GenerationConfigPolicy::default(),
            },
            generation_defaults,

            error_body_limit: env::var("ERROR_BODY_LIMIT")
                .unwrap_or_else(|_| "500".to_string())
                .parse()
                .context("Invalid ERROR_BODY_LIMIT")?,
        })
    }

    /// Whether a credential is available for upstream calls
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            api_key: None,
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            api_version: "v1beta".to_string(),
            mount_prefix: DEFAULT_MOUNT_PREFIX.to_string(),
            upstream_timeout: Duration::from_secs(30),
            user_agent: default_user_agent(),
            canonical_model: DEFAULT_CANONICAL_MODEL.to_string(),
            generation_policy: GenerationConfigPolicy::Preserve,
            generation_defaults: Map::new(),
            error_body_limit: 500,
        }
    }
}

// The credential must never reach a log line through `{:?}`.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("upstream_url", &self.upstream_url)
            .field("api_version", &self.api_version)
            .field("mount_prefix", &self.mount_prefix)
            .field("upstream_timeout", &self.upstream_timeout)
            .field("user_agent", &self.user_agent)
            .field("canonical_model", &self.canonical_model)
            .field("generation_policy", &self.generation_policy)
            .field("generation_defaults", &self.generation_defaults)
            .field("error_body_limit", &self.error_body_limit)
            .finish()
    }
}

fn default_user_agent() -> String {
    format!("gemini-proxy/{}", env!("CARGO_PKG_VERSION"))
}

fn parse_generation_defaults(raw: &str) -> Result<Map<String, Value>> {
    let value: Value =
        serde_json::from_str(raw).context("GENERATION_CONFIG_DEFAULTS is not valid JSON")?;
    match value {
        Value::Object(map) => Ok(map),
        _ => bail!("GENERATION_CONFIG_DEFAULTS must be a JSON object"),
    }
}
