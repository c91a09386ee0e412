//! Registered event listeners.
//!
//! # Responsibilities
//! - Accept only the `fetch` event kind
//! - Keep handlers in registration order
//! - Hand out snapshots so a dispatch is unaffected by concurrent edits
//!
//! # Design Decisions
//! - Closures have no identity in Rust, so registration returns a `ListenerId`
//!   that removal takes instead of the handler itself
//! - IDs are per registry, not global

use std::future::Future;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use futures_util::future::{self, BoxFuture, FutureExt};

use crate::event::FetchEvent;
use crate::server::ServerError;
use crate::BoxError;

/// Future returned by a handler invocation.
pub type HandlerFuture = BoxFuture<'static, Result<(), BoxError>>;

/// A fetch event listener.
pub type Handler = Arc<dyn Fn(FetchEvent) -> HandlerFuture + Send + Sync>;

/// Wrap an async closure as a [`Handler`].
pub fn handler_fn<F, Fut, E>(f: F) -> Handler
where
    F: Fn(FetchEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxError>,
{
    Arc::new(move |event: FetchEvent| -> HandlerFuture {
        f(event).map(|res| res.map_err(Into::into)).boxed()
    })
}

/// Wrap a synchronous closure as a [`Handler`]. It runs at invocation time.
pub fn sync_handler<F, E>(f: F) -> Handler
where
    F: Fn(&FetchEvent) -> Result<(), E> + Send + Sync + 'static,
    E: Into<BoxError>,
{
    Arc::new(move |event: FetchEvent| -> HandlerFuture {
        future::ready(f(&event).map_err(Into::into)).boxed()
    })
}

/// Event kinds a server accepts listeners for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Fetch,
}

impl FromStr for EventKind {
    type Err = ServerError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "fetch" => Ok(EventKind::Fetch),
            other => Err(ServerError::UnsupportedEvent(other.to_string())),
        }
    }
}

/// Identifies one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Ordered handler list for one server.
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(ListenerId, Handler)>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn add(&self, handler: Handler) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, handler));
        id
    }

    /// Remove a registration. Returns `false` if `id` was not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Current handlers, in registration order.
    pub fn snapshot(&self) -> Vec<(ListenerId, Handler)> {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.listeners.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
