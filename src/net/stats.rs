//! Exchange statistics kept by transports.
//!
//! # Responsibilities
//! - Count in-flight and completed exchanges
//! - Accumulate latency for the average
//! - Estimate requests/second over a rolling one-second window
//!
//! # Design Decisions
//! - Counters are atomics; only the rate window takes a lock
//! - An RAII guard records completion, so a dropped exchange is still counted

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::observability::metrics;

const RATE_WINDOW: Duration = Duration::from_secs(1);

/// Point-in-time statistics snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ServerStats {
    /// Exchanges currently in flight.
    pub active_connections: u64,
    /// Exchanges completed since start.
    pub total_requests: u64,
    /// Completions per second over the last full window.
    pub requests_per_second: f64,
    /// Mean exchange latency in milliseconds.
    pub avg_latency_ms: f64,
}

#[derive(Debug)]
struct RateWindow {
    started: Instant,
    count: u64,
    last_rate: f64,
}

impl RateWindow {
    fn new(now: Instant) -> Self {
        Self {
            started: now,
            count: 0,
            last_rate: 0.0,
        }
    }

    fn roll(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.started);
        if elapsed >= RATE_WINDOW {
            self.last_rate = if elapsed >= RATE_WINDOW * 2 {
                // a whole window passed without completions
                0.0
            } else {
                self.count as f64 / elapsed.as_secs_f64()
            };
            self.started = now;
            self.count = 0;
        }
    }
}

#[derive(Debug)]
struct Counters {
    active: AtomicU64,
    total: AtomicU64,
    total_latency_us: AtomicU64,
    window: Mutex<RateWindow>,
}

/// Shared recorder a transport updates per exchange.
#[derive(Debug, Clone)]
pub struct StatsRecorder {
    counters: Arc<Counters>,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(Counters {
                active: AtomicU64::new(0),
                total: AtomicU64::new(0),
                total_latency_us: AtomicU64::new(0),
                window: Mutex::new(RateWindow::new(Instant::now())),
            }),
        }
    }

    /// Start tracking an exchange. Completion is recorded when the guard drops.
    pub fn begin(&self) -> ExchangeGuard {
        let active = self.counters.active.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::record_active_exchanges(active);
        ExchangeGuard {
            counters: Arc::clone(&self.counters),
            started: Instant::now(),
            status: None,
        }
    }

    pub fn snapshot(&self) -> ServerStats {
        let total = self.counters.total.load(Ordering::SeqCst);
        let total_latency_us = self.counters.total_latency_us.load(Ordering::SeqCst);

        let requests_per_second = {
            let mut window = self
                .counters
                .window
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            window.roll(Instant::now());
            window.last_rate
        };

        ServerStats {
            active_connections: self.counters.active.load(Ordering::SeqCst),
            total_requests: total,
            requests_per_second,
            avg_latency_ms: if total > 0 {
                (total_latency_us as f64 / total as f64) / 1000.0
            } else {
                0.0
            },
        }
    }
}

impl Default for StatsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks one exchange's lifetime.
#[derive(Debug)]
pub struct ExchangeGuard {
    counters: Arc<Counters>,
    started: Instant,
    status: Option<u16>,
}

impl ExchangeGuard {
    /// Remember the status that went out, for the metrics label.
    pub fn set_status(&mut self, status: u16) {
        self.status = Some(status);
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Drop for ExchangeGuard {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed();
        let active = self.counters.active.fetch_sub(1, Ordering::SeqCst) - 1;
        self.counters.total.fetch_add(1, Ordering::SeqCst);
        self.counters
            .total_latency_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::SeqCst);

        let now = Instant::now();
        let mut window = self
            .counters
            .window
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        window.roll(now);
        window.count += 1;
        drop(window);

        metrics::record_active_exchanges(active);
        // 0 marks an exchange that ended without a reply
        metrics::record_exchange(self.status.unwrap_or(0), elapsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_tracks_active_and_total() {
        let stats = StatsRecorder::new();
        assert_eq!(stats.snapshot(), ServerStats::default());

        let g1 = stats.begin();
        let mut g2 = stats.begin();
        assert_eq!(stats.snapshot().active_connections, 2);

        g2.set_status(200);
        drop(g1);
        drop(g2);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.active_connections, 0);
        assert_eq!(snapshot.total_requests, 2);
        assert!(snapshot.avg_latency_ms >= 0.0);
    }

    #[test]
    fn rate_window_rolls() {
        let start = Instant::now();
        let mut window = RateWindow::new(start);
        window.count = 10;

        window.roll(start + Duration::from_millis(500));
        assert_eq!(window.last_rate, 0.0);
        assert_eq!(window.count, 10);

        window.roll(start + Duration::from_secs(1));
        assert_eq!(window.last_rate, 10.0);
        assert_eq!(window.count, 0);

        window.roll(start + Duration::from_secs(4));
        assert_eq!(window.last_rate, 0.0);
    }
}
