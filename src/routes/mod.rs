//! HTTP routes for the Gemini proxy
//!
//! This module defines all HTTP endpoints exposed by the server.

pub mod health;
pub mod metrics;
pub mod passthrough;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Create the main application router
///
/// CORS is answered by the pipeline itself (pre-flight included), so no CORS
/// layer is installed here.
pub fn create_router(state: Arc<AppState>) -> Router {
    // Operational routes, never forwarded upstream
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics::prometheus_metrics));

    Router::new()
        .merge(public_routes)
        // Everything else goes through the pipeline
        .fallback(passthrough::passthrough_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
