//! Dispatch facade.
//!
//! # Data Flow
//! ```text
//! integrator
//!     → server.rs (FetchServer: add/remove listeners, listen, close, stats)
//!     → registry.rs (ordered ListenerRegistry, "fetch" only)
//! transport
//!     → dispatch.rs (Dispatcher::dispatch per exchange)
//!     → Request + FetchEvent → each handler in order → reply sink
//! ```
//!
//! # Design Decisions
//! - Handler failures are logged and counted, never returned to the transport
//! - Usage mistakes (wrong event kind, no handlers, double listen) are errors

pub mod dispatch;
pub mod registry;
#[allow(clippy::module_inception)]
pub mod server;

use thiserror::Error;

use crate::config::ValidationError;
use crate::net::TransportError;

pub use dispatch::Dispatcher;
pub use registry::{
    handler_fn, sync_handler, EventKind, Handler, HandlerFuture, ListenerId, ListenerRegistry,
};
pub use server::FetchServer;

/// Errors surfaced by [`FetchServer`].
#[derive(Debug, Error)]
pub enum ServerError {
    /// Only the `fetch` event kind is supported.
    #[error("unsupported event kind {0:?}")]
    UnsupportedEvent(String),

    /// `listen` was called with no handlers registered.
    #[error("no fetch handlers registered")]
    NoHandlers,

    /// `listen` was called while the server is already listening.
    #[error("server is already listening")]
    AlreadyListening,

    /// Construction options failed validation.
    #[error("invalid server options: {0:?}")]
    InvalidOptions(Vec<ValidationError>),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
