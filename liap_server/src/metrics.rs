//! Prometheus metrics for monitoring game server health and performance.
//!
//! Metrics are exposed in Prometheus text format for scraping, via the
//! `/metrics` endpoint.
//!
//! # Metrics Categories
//!
//! - **HTTP/WS Metrics**: request counts, duration, status codes
//! - **Connection Metrics**: active websocket connections, messages
//! - **Room Metrics**: active rooms, seated players, rounds played
//! - **Rate Limiting Metrics**: throttled submissions

#![allow(dead_code)] // Public API surface; not every metric is wired up yet.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Initialize the Prometheus metrics exporter. Metrics become available at
/// `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("failed to install Prometheus exporter: {e}"))
}

// ---- HTTP/WS ------------------------------------------------------------

pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ---- Connections ----------------------------------------------------------

pub fn websocket_connections_active(count: u64) {
    metrics::gauge!("websocket_connections_active").set(count as f64);
}

pub fn websocket_connections_total() {
    metrics::counter!("websocket_connections_total").increment(1);
}

pub fn websocket_messages_sent() {
    metrics::counter!("websocket_messages_sent").increment(1);
}

pub fn websocket_messages_received() {
    metrics::counter!("websocket_messages_received").increment(1);
}

pub fn resync_requests_total() {
    metrics::counter!("resync_requests_total").increment(1);
}

// ---- Rooms ------------------------------------------------------------

pub fn active_rooms(count: usize) {
    metrics::gauge!("active_rooms").set(count as f64);
}

pub fn seated_players(count: usize) {
    metrics::gauge!("seated_players").set(count as f64);
}

pub fn rounds_played_total() {
    metrics::counter!("rounds_played_total").increment(1);
}

pub fn bot_decisions_total() {
    metrics::counter!("bot_decisions_total").increment(1);
}

// ---- Rate limiting --------------------------------------------------------

pub fn rate_limit_hits_total(endpoint: &str) {
    metrics::counter!("rate_limit_hits_total",
        "endpoint" => endpoint.to_string()
    )
    .increment(1);
}
