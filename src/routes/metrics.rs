//! Prometheus metrics endpoint
//!
//! Exposes application metrics in Prometheus format for monitoring.

use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// Global Prometheus handle for metrics export
static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Initialize metrics (call once at startup)
///
/// Fails if another global recorder was installed first.
pub fn init_metrics() -> anyhow::Result<()> {
    PROMETHEUS_HANDLE.get_or_try_init(|| PrometheusBuilder::new().install_recorder())?;

    register_metrics();
    Ok(())
}

/// Register all custom metrics
fn register_metrics() {
    metrics::describe_counter!(
        "gemini_proxy_requests_total",
        "Total number of requests processed, by outcome"
    );
    metrics::describe_histogram!(
        "gemini_proxy_request_duration_seconds",
        "Request duration in seconds"
    );
}

/// Prometheus metrics endpoint handler
///
/// Returns metrics in Prometheus text format for scraping. Empty until
/// [`init_metrics`] has run.
pub async fn prometheus_metrics() -> impl IntoResponse {
    PROMETHEUS_HANDLE
        .get()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

/// Record a finished request. Without an installed recorder this is a no-op.
pub fn record_request(outcome: &str, duration_secs: f64) {
    metrics::counter!("gemini_proxy_requests_total", "outcome" => outcome.to_string())
        .increment(1);
    metrics::histogram!("gemini_proxy_request_duration_seconds", "outcome" => outcome.to_string())
        .record(duration_secs);
}
