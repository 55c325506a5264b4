//! Metrics collection and exposition.
//!
//! # Metrics
//! - `singlend_requests_total` (counter): dispatched requests by status
//! - `singlend_request_duration_seconds` (histogram): dispatch latency
//! - `singlend_failures_total` (counter): failed dispatches by kind
//!
//! # Design Decisions
//! - Labels are status codes and fixed failure kinds only
//! - Exporter is optional; without it the macros are no-ops

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished dispatch.
pub fn record_request(status: u16, start: Instant) {
    counter!("singlend_requests_total", "status" => status.to_string()).increment(1);
    histogram!("singlend_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record a failed dispatch by `SinglendError::kind`.
pub fn record_failure(kind: &'static str) {
    counter!("singlend_failures_total", "kind" => kind).increment(1);
}
