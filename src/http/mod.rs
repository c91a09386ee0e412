//! HTTP message model.
//!
//! # Data Flow
//! ```text
//! transport exchange (method, url, header pairs, bytes)
//!     → request.rs (Request: immutable metadata + body capsule)
//!     → handler reads it via body.rs accessors (consume-once)
//!     → handler builds response.rs (Response / json / redirect / error)
//!     → wire.rs (WireResponse: status, lower-case header pairs, bytes)
//!     → back to the transport
//! ```
//!
//! # Design Decisions
//! - headers.rs is the single place case-insensitivity is implemented
//! - Request and Response share one body implementation through `BodyMixin`
//! - Bodies are fully buffered; streaming request bodies are not supported

pub mod body;
pub mod headers;
pub mod request;
pub mod response;
pub mod wire;

use thiserror::Error;

pub use body::{Blob, Body, BodyError, BodyInit, BodyMixin, BodyStream};
pub use headers::{HeaderPair, Headers};
pub use request::{Request, RequestInit};
pub use response::{Response, ResponseInit, ResponseType};
pub use wire::WireResponse;

/// Errors raised while constructing messages.
#[derive(Debug, Error)]
pub enum MessageError {
    /// The URL could not be parsed as an absolute URL.
    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Status outside `200..=599`.
    #[error("status {0} is outside the range 200..=599")]
    InvalidStatus(u16),

    /// Redirect status not in {301, 302, 303, 307, 308}.
    #[error("invalid redirect status {0}")]
    InvalidRedirectStatus(u16),

    /// The JSON body could not be serialized.
    #[error("failed to serialize JSON body: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error(transparent)]
    Body(#[from] BodyError),
}
