//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define service metrics (requests, latency, admission, breaker, cache)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `requests_total` (counter): requests by service, method, status
//! - `request_duration_seconds` (histogram): latency by service, method
//! - `rate_limited_total` (counter): requests rejected by the gatekeeper
//! - `circuit_breaker_state` (gauge): 0=Closed, 1=HalfOpen, 2=Open per dependency
//! - `circuit_breaker_rejections_total` (counter): calls refused without invoking the dependency
//! - `cache_operations_total` (counter): cache outcomes (hit, miss, error, skipped)
//!
//! # Design Decisions
//! - Free functions over the `metrics` facade; without an installed recorder they are no-ops
//! - Labels stay low-cardinality (no keys, no ids)

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => {
            describe_metrics();
            tracing::info!(address = %addr, "Metrics exporter listening");
        }
        Err(e) => tracing::error!(error = %e, "Failed to install Prometheus recorder"),
    }
}

fn describe_metrics() {
    describe_counter!("requests_total", "Total HTTP requests handled");
    describe_histogram!("request_duration_seconds", "HTTP request latency in seconds");
    describe_counter!("rate_limited_total", "Requests rejected by the rate limiter");
    describe_gauge!(
        "circuit_breaker_state",
        "Circuit breaker state (0=closed, 1=half-open, 2=open)"
    );
    describe_counter!(
        "circuit_breaker_rejections_total",
        "Calls rejected by an open or saturated circuit breaker"
    );
    describe_counter!("cache_operations_total", "Cache operations by outcome");
}

/// Record a completed HTTP request.
pub fn record_request(service: &str, method: &str, status: u16, start: Instant) {
    let service = service.to_string();
    counter!(
        "requests_total",
        "service" => service.clone(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "request_duration_seconds",
        "service" => service,
        "method" => method.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record an admission rejection.
pub fn record_rate_limited(service: &str) {
    counter!("rate_limited_total", "service" => service.to_string()).increment(1);
}

/// Publish a breaker's state.
pub fn set_breaker_state(dependency: &str, value: f64) {
    gauge!("circuit_breaker_state", "dependency" => dependency.to_string()).set(value);
}

/// Record a call refused by a breaker.
pub fn record_breaker_rejection(dependency: &str) {
    counter!("circuit_breaker_rejections_total", "dependency" => dependency.to_string())
        .increment(1);
}

/// Record a cache outcome.
pub fn record_cache(operation: &'static str, outcome: &'static str) {
    counter!("cache_operations_total", "operation" => operation, "outcome" => outcome).increment(1);
}
