//! The argument accepted by `FetchEvent::respond_with`.

use std::fmt;
use std::future::Future;

use futures_util::future::{BoxFuture, FutureExt};

use crate::http::Response;
use crate::BoxError;

/// A response, or a future that resolves to one (or fails).
pub enum Responder {
    Ready(Response),
    Pending(BoxFuture<'static, Result<Response, BoxError>>),
}

impl Responder {
    /// Wrap a future resolving to a response.
    pub fn future<F, E>(fut: F) -> Self
    where
        F: Future<Output = Result<Response, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Responder::Pending(fut.map(|res| res.map_err(Into::into)).boxed())
    }

    /// An already-failed response.
    pub fn rejected(err: impl Into<BoxError>) -> Self {
        let err = err.into();
        Responder::Pending(async move { Err(err) }.boxed())
    }

    pub(crate) async fn resolve(self) -> Result<Response, BoxError> {
        match self {
            Responder::Ready(response) => Ok(response),
            Responder::Pending(fut) => fut.await,
        }
    }
}

impl From<Response> for Responder {
    fn from(response: Response) -> Self {
        Responder::Ready(response)
    }
}

impl<E: Into<BoxError>> From<Result<Response, E>> for Responder {
    fn from(result: Result<Response, E>) -> Self {
        match result {
            Ok(response) => Responder::Ready(response),
            Err(err) => Responder::rejected(err),
        }
    }
}

impl fmt::Debug for Responder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Responder::Ready(response) => f.debug_tuple("Ready").field(response).finish(),
            Responder::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}
