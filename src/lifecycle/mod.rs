//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! listen():
//!     handlers registered? → subscribe to Shutdown → transport.serve(...)
//!
//! close():
//!     Shutdown::trigger → transport stops accepting → serve returns → listen returns
//! ```
//!
//! # Design Decisions
//! - One Shutdown per server instance, never global
//! - Shutdown is sticky: a server that was closed stays closed

pub mod shutdown;

pub use shutdown::{Shutdown, ShutdownSignal};
