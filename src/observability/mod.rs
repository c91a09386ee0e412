//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! event / dispatch / transport code produces:
//!     → logging.rs (structured tracing events, exchange_id field)
//!     → metrics.rs (counters, gauges, histograms via the metrics facade)
//!
//! Consumers:
//!     → whatever subscriber the host installs (init_logging is optional)
//!     → whatever metrics recorder the host installs
//! ```
//!
//! # Design Decisions
//! - Exchange ID flows through every log line of one exchange
//! - Metrics are no-ops until the host installs a recorder
//! - Swallowed failures are always logged, never silent

pub mod logging;
pub mod metrics;
