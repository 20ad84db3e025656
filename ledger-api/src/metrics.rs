//! Prometheus Metrics
//!
//! # Metrics
//!
//! ## Counters
//! - `ledger_http_requests_total` - HTTP requests by method, route, status
//! - `ledger_confirm_payment_total` - payment confirmations by outcome
//! - `ledger_uploads_total` - completed uploads by outcome
//! - `ledger_rule_denials_total` - rule denials by collection (recorded by the store)
//!
//! ## Histograms
//! - `ledger_http_request_duration_seconds` - HTTP request duration
//!
//! ## Gauges
//! - `ledger_uptime_seconds` - Service uptime
//!
//! # Configuration
//!
//! - `LEDGER_METRICS_ENABLED`: Enable metrics (default: true)
//! - `LEDGER_METRICS_PORT`: Metrics listener port (default: 9090)

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::state::AppState;

/// Metrics configuration
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Port of the scrape endpoint
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 9090,
        }
    }
}

impl MetricsConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let enabled = std::env::var("LEDGER_METRICS_ENABLED")
            .map(|v| v.to_lowercase() != "false" && v != "0")
            .unwrap_or(true);

        let port = std::env::var("LEDGER_METRICS_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(9090);

        Self { enabled, port }
    }
}

/// Install the Prometheus recorder and its scrape listener.
///
/// Call once at startup.
pub fn init_metrics(config: &MetricsConfig) -> Result<(), String> {
    if !config.enabled {
        tracing::info!("Metrics disabled");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from(([0, 0, 0, 0], config.port)))
        .install()
        .map_err(|e| format!("Failed to install metrics recorder: {}", e))?;

    tracing::info!(port = config.port, "Metrics initialized");
    Ok(())
}

/// Record a request metric
pub fn record_request(method: &str, route: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("route", route.to_string()),
        ("status", status.to_string()),
    ];

    counter!("ledger_http_requests_total", &labels).increment(1);
    histogram!("ledger_http_request_duration_seconds", &labels).record(duration_secs);
}

/// Record a payment confirmation
pub fn record_confirmation(outcome: &'static str) {
    counter!("ledger_confirm_payment_total", "outcome" => outcome).increment(1);
}

/// Record a completed or refused upload
pub fn record_upload(outcome: &'static str) {
    counter!("ledger_uploads_total", "outcome" => outcome).increment(1);
}

/// Update uptime gauge
pub fn set_uptime(seconds: u64) {
    gauge!("ledger_uptime_seconds").set(seconds as f64);
}

/// Route template of a request, so ids never become label values
fn route_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string())
}

/// Metrics middleware for tracking HTTP requests
pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let route = route_label(&request);

    state.increment_requests().await;
    set_uptime(state.uptime_secs());

    let response = next.run(request).await;

    record_request(
        &method,
        &route,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_metrics_config_default() {
        let config = MetricsConfig::default();
        assert!(config.enabled);
        assert_eq!(config.port, 9090);
    }

    #[test]
    fn test_unmatched_route_label() {
        let request = Request::builder()
            .uri("/documents/balanceDocs/uid124")
            .body(Body::empty())
            .unwrap();
        assert_eq!(route_label(&request), "unmatched");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_request("GET", "/health", 200, 0.01);
        record_confirmation("already_applied");
        record_upload("settled");
    }
}
