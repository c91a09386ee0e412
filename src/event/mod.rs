//! Fetch event subsystem.
//!
//! # Data Flow
//! ```text
//! dispatcher builds FetchEvent(request, client address, ReplySink)
//!     → handlers call respond_with(Responder)   [Pending → Claimed]
//!     → settle() resolves the responder
//!     → WireResponse (or synthetic 500) through ReplySink   [→ Settled]
//!
//! alongside: run_background() polls wait_until tasks until close_background()
//! ```

pub mod fetch_event;
pub mod reply;
pub mod responder;

use thiserror::Error;

pub use fetch_event::{FetchEvent, ResponseState};
pub use reply::{ReplyError, ReplySink};
pub use responder::Responder;

/// Usage errors raised by [`FetchEvent`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    /// `respond_with` was called after a reply was already claimed.
    #[error("respond_with has already been called for this event")]
    AlreadyResponded,
}
