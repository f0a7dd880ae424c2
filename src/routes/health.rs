//! Health check endpoint
//!
//! `/health` reports liveness plus whether the proxy can actually forward,
//! which requires a configured credential.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

/// Health status enum
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: String,
    pub api_key_configured: bool,
}

/// Health check handler
///
/// Always answers 200 so the process is not restarted for a missing key;
/// a missing credential shows up as `degraded`.
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let configured = state.proxy.is_configured();

    let response = HealthResponse {
        status: if configured {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        api_key_configured: configured,
    };

    (StatusCode::OK, Json(response))
}
