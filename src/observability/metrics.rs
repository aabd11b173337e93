//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lb_requests_total` (counter): requests by method, status
//! - `lb_request_duration_seconds` (histogram): end-to-end latency
//! - `lb_backend_alive` (gauge): 1=alive, 0=dead, per backend
//! - `lb_retries_total` (counter): same-backend retries, per backend
//! - `lb_failovers_total` (counter): backends abandoned, per backend
//! - `lb_unavailable_total` (counter): 503s by reason
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "lb_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("lb_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_backend_health(backend: &str, alive: bool) {
    gauge!("lb_backend_alive", "backend" => backend.to_string()).set(if alive { 1.0 } else { 0.0 });
}

pub fn record_retry(backend: &str) {
    counter!("lb_retries_total", "backend" => backend.to_string()).increment(1);
}

pub fn record_failover(backend: &str) {
    counter!("lb_failovers_total", "backend" => backend.to_string()).increment(1);
}

pub fn record_unavailable(reason: &'static str) {
    counter!("lb_unavailable_total", "reason" => reason).increment(1);
}
