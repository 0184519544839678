//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define service metrics (request rate, latency, backend failures)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, route, status
//! - `http_request_duration_seconds` (histogram): latency distribution
//! - `backend_failures_total` (counter): failed cloud backend calls by backend
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Route label is the matched route template, never the raw path

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus exporter on `addr`. Needs a running Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!("http_requests_total", "Completed HTTP requests");
    describe_histogram!(
        "http_request_duration_seconds",
        Unit::Seconds,
        "HTTP request latency"
    );
    describe_counter!("backend_failures_total", "Failed cloud backend calls");

    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record a completed request.
pub fn record_request(method: &str, route: &str, status: u16, elapsed: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("route", route.to_string()),
        ("status", status.to_string()),
    ];
    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(elapsed.as_secs_f64());
}

/// Record a failed call to a cloud backend.
pub fn record_backend_failure(backend: &'static str) {
    counter!("backend_failures_total", "backend" => backend).increment(1);
}
