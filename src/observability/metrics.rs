//! Metrics collection and exposition.
//!
//! # Metrics
//! - `oidc_requests_total` (counter): requests by method, status, outcome
//! - `oidc_request_duration_seconds` (histogram): entry point latency
//! - `oidc_engine_constructions_total` (counter): construction attempts by result
//!
//! Without an installed exporter every recording is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

/// How the entry point answered a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Delegated to the engine.
    Engine,
    /// Answered by the landing response.
    Landing,
    /// Adapter error envelope.
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Engine => "engine",
            Outcome::Landing => "landing",
            Outcome::Error => "error",
        }
    }
}

/// Starts the Prometheus exporter on `addr`. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, outcome: Outcome, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("outcome", outcome.as_str().to_string()),
    ];
    ::metrics::counter!("oidc_requests_total", &labels).increment(1);
    ::metrics::histogram!("oidc_request_duration_seconds", "outcome" => outcome.as_str())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_construction(success: bool) {
    let result = if success { "ok" } else { "error" };
    ::metrics::counter!("oidc_engine_constructions_total", "result" => result).increment(1);
}
