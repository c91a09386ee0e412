//! One-shot reply capability handed in by the transport.

use std::fmt;

use thiserror::Error;
use tokio::sync::oneshot;

use crate::http::WireResponse;

/// Errors returned by a reply sink.
#[derive(Debug, Error)]
pub enum ReplyError {
    /// The exchange already received its reply.
    #[error("reply already sent for this exchange")]
    AlreadySent,

    /// The transport side went away (peer disconnected, timed out, ...).
    #[error("transport closed the exchange before the reply was delivered")]
    Closed,
}

type ReplyFn = Box<dyn FnOnce(WireResponse) -> Result<(), ReplyError> + Send>;

/// Delivers exactly one [`WireResponse`] for one exchange.
///
/// `send` takes `self`, so a sink can never be used twice.
pub struct ReplySink {
    deliver: ReplyFn,
}

impl ReplySink {
    pub fn new<F>(deliver: F) -> Self
    where
        F: FnOnce(WireResponse) -> Result<(), ReplyError> + Send + 'static,
    {
        Self {
            deliver: Box::new(deliver),
        }
    }

    pub fn send(self, response: WireResponse) -> Result<(), ReplyError> {
        (self.deliver)(response)
    }
}

impl From<oneshot::Sender<WireResponse>> for ReplySink {
    fn from(tx: oneshot::Sender<WireResponse>) -> Self {
        ReplySink::new(move |response| tx.send(response).map_err(|_| ReplyError::Closed))
    }
}

impl fmt::Debug for ReplySink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplySink").finish_non_exhaustive()
    }
}
