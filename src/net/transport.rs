//! The seam between this layer and the HTTP transport.
//!
//! # Responsibilities
//! - Accept exchanges and hand each one to the `Dispatcher`
//! - Enforce connection, body-size and timeout limits
//! - Keep the statistics the server surfaces
//!
//! # Design Decisions
//! - Object-safe trait returning boxed futures, so a server can hold
//!   `Arc<dyn Transport>`
//! - `serve` returns once the shutdown signal fires or ingress ends

use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::config::ServerOptions;
use crate::lifecycle::ShutdownSignal;
use crate::net::stats::ServerStats;
use crate::server::Dispatcher;

/// Error type for transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Binding or accepting failed.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `serve` was called while the transport is already serving (or was consumed).
    #[error("transport is already serving")]
    AlreadyServing,

    /// The transport's ingress is gone.
    #[error("transport closed")]
    Closed,
}

/// An HTTP transport that feeds exchanges to a [`Dispatcher`].
pub trait Transport: Send + Sync + 'static {
    /// Serve exchanges until `shutdown` fires.
    fn serve(
        &self,
        options: ServerOptions,
        dispatcher: Dispatcher,
        shutdown: ShutdownSignal,
    ) -> BoxFuture<'static, Result<(), TransportError>>;

    /// Point-in-time counters maintained by the transport.
    fn stats(&self) -> ServerStats;
}
