//! Network boundary subsystem.
//!
//! # Data Flow
//! ```text
//! external transport (sockets, TLS, HTTP parsing live outside this crate)
//!     → exchange.rs (Exchange: method, url, header pairs, bytes, peer, ReplySink)
//!     → transport.rs (Transport::serve drives Dispatcher::dispatch per exchange)
//!     → stats.rs (StatsRecorder: active, total, rps, latency)
//!
//! channel.rs: in-process transport fed from an mpsc queue, used by hosts that
//! already own the HTTP stack and by tests.
//! ```
//!
//! # Design Decisions
//! - Limits are the transport's job; the dispatcher never times out
//! - Each exchange is an independent dispatch future; the channel transport
//!   interleaves them on one task

pub mod channel;
pub mod exchange;
pub mod stats;
pub mod transport;

pub use channel::{ChannelTransport, ExchangeSender, IncomingExchange};
pub use exchange::{build_url, Exchange};
pub use stats::{ExchangeGuard, ServerStats, StatsRecorder};
pub use transport::{Transport, TransportError};
