//! Structured logging configuration.
//!
//! Console formatting plus a handful of structured helpers for events that
//! recur across the gateway and aren't already covered by
//! `#[tracing::instrument]` on the functions that emit them.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging. Level is configurable via `RUST_LOG`;
/// defaults to `info` with the noisier dependency crates quieted.
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=warn,axum=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(env_filter).with(fmt_layer).init();

    tracing::info!("structured logging initialized");
}

/// Logs a connection lifecycle event (connect, disconnect, dead-connection
/// eviction after retransmit exhaustion).
pub fn log_connection_event(event_type: &str, room_code: Option<&str>, seat: Option<usize>) {
    tracing::info!(event_type, room_code, seat, "connection event");
}

/// Logs a room lifecycle event (created, closed, reaped).
pub fn log_room_event(event_type: &str, room_code: &str, detail: Option<&str>) {
    tracing::info!(event_type, room_code, detail, "room event");
}

/// Logs an HTTP/WS request once it completes.
pub fn log_api_request(method: &str, path: &str, status_code: u16, duration_ms: u64) {
    tracing::info!(
        http_method = method,
        http_path = path,
        http_status = status_code,
        duration_ms = duration_ms,
        "api request completed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_connection_event_does_not_panic() {
        log_connection_event("connected", Some("ABC123"), Some(0));
        log_connection_event("disconnected", Some("ABC123"), None);
    }

    #[test]
    fn log_room_event_does_not_panic() {
        log_room_event("created", "ABC123", None);
        log_room_event("closed", "ABC123", Some("all seats vacant"));
    }

    #[test]
    fn log_api_request_various_status_codes() {
        log_api_request("GET", "/rooms", 200, 5);
        log_api_request("GET", "/ws", 101, 2);
        log_api_request("POST", "/rooms", 500, 12);
    }
}
