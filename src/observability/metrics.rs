//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_forward_total` (counter): forwarded calls by endpoint, status
//! - `gateway_forward_duration_seconds` (histogram): forwarding latency by endpoint
//! - `gateway_resolver_cache_total` (counter): resolver cache hits and misses
//! - `gateway_client_pool_size` (gauge): retained override clients per endpoint
//! - `gateway_config_reloads_total` (counter): snapshot builds by result
//!
//! # Design Decisions
//! - Recording is always on; without an installed exporter the macros are no-ops
//! - The Prometheus listener only starts when enabled in the configuration

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter and its scrape listener.
///
/// Must be called from inside the tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one forwarded call. `status` is 0 when no upstream response arrived.
pub fn record_forward(endpoint: &str, status: u16, start: Instant) {
    ::metrics::counter!(
        "gateway_forward_total",
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!(
        "gateway_forward_duration_seconds",
        "endpoint" => endpoint.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_resolver_cache(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    ::metrics::counter!("gateway_resolver_cache_total", "result" => result).increment(1);
}

pub fn record_client_pool_size(endpoint: &str, size: usize) {
    ::metrics::gauge!("gateway_client_pool_size", "endpoint" => endpoint.to_string()).set(size as f64);
}

pub fn record_config_reload(success: bool) {
    let result = if success { "ok" } else { "failed" };
    ::metrics::counter!("gateway_config_reloads_total", "result" => result).increment(1);
}
