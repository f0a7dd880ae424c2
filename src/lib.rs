//! Gemini Proxy - credential-injecting reverse proxy for the Gemini API
//!
//! This library provides the forwarding pipeline (request normalization, model
//! alias rewriting, deadline-bound forwarding and response normalization) and
//! the axum surface that hosts it.

pub mod config;
pub mod error;
pub mod proxy;
pub mod routes;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

pub use crate::config::Config;
pub use crate::error::{ProxyError, ProxyResult, TransportError};
pub use crate::proxy::{GeminiProxy, ReqwestTransport, Transport};

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    pub start_time: Instant,
    /// Forwarding pipeline; stateless between requests
    pub proxy: Arc<GeminiProxy>,
}

impl AppState {
    /// Create a new application state backed by the reqwest transport
    pub fn new(config: Config) -> Result<Self> {
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new()?);
        Ok(Self::with_transport(config, transport))
    }

    /// Create application state with a caller-supplied transport
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        let proxy = Arc::new(GeminiProxy::new(&config, transport));

        Self {
            config,
            start_time: Instant::now(),
            proxy,
        }
    }
}
