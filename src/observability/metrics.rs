//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gatekeeper_requests_total` (counter): requests by method, status
//! - `gatekeeper_request_duration_seconds` (histogram): latency distribution
//! - `gatekeeper_rate_limited_total` (counter): rejections by scope
//! - `gatekeeper_auth_failures_total` (counter): guard failures by reason
//! - `gatekeeper_login_attempts_total` (counter): logins by outcome
//! - `gatekeeper_tracked_clients` (gauge): live windows per table
//!
//! Rate-limit rejections are expected traffic and are only counted here,
//! never logged as errors.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "gatekeeper_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gatekeeper_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(scope: &'static str) {
    counter!("gatekeeper_rate_limited_total", "scope" => scope).increment(1);
}

pub fn record_auth_failure(reason: &'static str) {
    counter!("gatekeeper_auth_failures_total", "reason" => reason).increment(1);
}

pub fn record_login(outcome: &'static str) {
    counter!("gatekeeper_login_attempts_total", "outcome" => outcome).increment(1);
}

pub fn record_tracked_clients(table: &'static str, count: usize) {
    gauge!("gatekeeper_tracked_clients", "table" => table).set(count as f64);
}

/// Middleware recording count and latency of every request.
pub async fn track_requests(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let response = next.run(request).await;
    record_request(&method, response.status().as_u16(), start);
    response
}
