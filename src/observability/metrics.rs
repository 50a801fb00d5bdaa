//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dispatch_requests_total` (counter): requests by method, status
//! - `dispatch_request_duration_seconds` (histogram): dispatch latency by method
//!
//! # Design Decisions
//! - Recorded once per `App::fetch`, after the response hook
//! - Prometheus exporter is opt-in (`metrics.enabled`)

use std::net::SocketAddr;
use std::time::Instant;

use axum::http::Method;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Record one dispatched request.
pub fn record_request(method: &Method, status: u16, started: Instant) {
    let method = method.as_str().to_owned();
    ::metrics::counter!(
        "dispatch_requests_total",
        "method" => method.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("dispatch_request_duration_seconds", "method" => method)
        .record(started.elapsed().as_secs_f64());
}

/// Install the Prometheus recorder and its HTTP listener. Requires a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}
