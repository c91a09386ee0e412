//! Metrics collection.
//!
//! # Metrics
//! - `fetch_exchanges_total` (counter): completed exchanges by status
//! - `fetch_exchange_duration_seconds` (histogram): exchange latency
//! - `fetch_active_exchanges` (gauge): exchanges currently in flight
//! - `fetch_handler_failures_total` (counter): handler failures by kind
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; no exporter is installed here
//! - Labels kept low-cardinality (status code, failure kind)

use std::time::Duration;

use metrics::{counter, gauge, histogram};

/// Record one completed exchange.
pub fn record_exchange(status: u16, elapsed: Duration) {
    counter!("fetch_exchanges_total", "status" => status.to_string()).increment(1);
    histogram!("fetch_exchange_duration_seconds").record(elapsed.as_secs_f64());
}

/// Publish the current number of in-flight exchanges.
pub fn record_active_exchanges(active: u64) {
    gauge!("fetch_active_exchanges").set(active as f64);
}

/// Count a handler failure (`threw`, `panicked`, `rejected`).
pub fn record_handler_failure(kind: &'static str) {
    counter!("fetch_handler_failures_total", "kind" => kind).increment(1);
}
