//! Per-exchange fetch event and its response state machine.
//!
//! # States
//! - Pending: no handler has called `respond_with`
//! - Claimed: a responder was accepted, its result is not yet delivered
//! - Settled: a wire response went to the reply sink (or delivery failed)
//!
//! # State Transitions
//! ```text
//! Pending → Claimed: respond_with (single compare_exchange, never suspends)
//! Claimed → Settled: settle() resolved the responder and called the sink
//! Claimed/Settled → respond_with fails with AlreadyResponded
//! ```
//!
//! # Design Decisions
//! - The claim is the only step that must be atomic; everything after it may
//!   suspend
//! - The reply sink sits behind `Option::take`, so even a buggy second
//!   settlement cannot call it twice
//! - A failed or panicking responder becomes a synthetic 500
//! - `wait_until` tasks run alongside settlement, so they progress even while
//!   the reply is pending
//! - No timeout here: a never-claimed event stays Pending until the transport
//!   gives up on it

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::{BoxFuture, FutureExt};
use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Notify;
use uuid::Uuid;

use crate::event::reply::ReplySink;
use crate::event::responder::Responder;
use crate::event::EventError;
use crate::http::{Request, WireResponse};
use crate::observability::metrics;
use crate::BoxError;

/// Where an event is in its response lifecycle.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseState {
    Pending = 0,
    Claimed = 1,
    Settled = 2,
}

impl From<u8> for ResponseState {
    fn from(val: u8) -> Self {
        match val {
            1 => ResponseState::Claimed,
            2 => ResponseState::Settled,
            _ => ResponseState::Pending,
        }
    }
}

enum ResponderSlot {
    Empty,
    Ready(Responder),
    Taken,
}

type BackgroundTask = BoxFuture<'static, Result<(), BoxError>>;

struct Inner {
    id: Uuid,
    request: Request,
    client_address: String,
    state: AtomicU8,
    responder: Mutex<ResponderSlot>,
    claimed: Notify,
    reply: Mutex<Option<ReplySink>>,
    background: Mutex<Vec<BackgroundTask>>,
    background_added: Notify,
    background_closed: AtomicBool,
}

/// The bridging object for one inbound exchange.
///
/// Cloning is cheap and every clone refers to the same event, which is how one
/// instance is handed to every registered handler.
#[derive(Clone)]
pub struct FetchEvent {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FetchEvent {
    pub fn new(request: Request, client_address: impl Into<String>, reply: ReplySink) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: Uuid::new_v4(),
                request,
                client_address: client_address.into(),
                state: AtomicU8::new(ResponseState::Pending as u8),
                responder: Mutex::new(ResponderSlot::Empty),
                claimed: Notify::new(),
                reply: Mutex::new(Some(reply)),
                background: Mutex::new(Vec::new()),
                background_added: Notify::new(),
                background_closed: AtomicBool::new(false),
            }),
        }
    }

    /// Identifier used in log fields for this exchange.
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn request(&self) -> &Request {
        &self.inner.request
    }

    pub fn client_address(&self) -> &str {
        &self.inner.client_address
    }

    pub fn state(&self) -> ResponseState {
        ResponseState::from(self.inner.state.load(Ordering::Acquire))
    }

    /// `true` once `respond_with` has been accepted.
    pub fn responded(&self) -> bool {
        self.state() != ResponseState::Pending
    }

    /// Claim the exchange's reply with a response or a future of one.
    ///
    /// Fails immediately if a reply was already claimed, even if that reply
    /// has not resolved yet.
    pub fn respond_with(&self, response: impl Into<Responder>) -> Result<(), EventError> {
        let responder = response.into();
        self.inner
            .state
            .compare_exchange(
                ResponseState::Pending as u8,
                ResponseState::Claimed as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| EventError::AlreadyResponded)?;

        *lock(&self.inner.responder) = ResponderSlot::Ready(responder);
        self.inner.claimed.notify_one();

        tracing::trace!(exchange_id = %self.inner.id, "Response claimed");
        Ok(())
    }

    /// Register background work that may outlive the reply.
    pub fn wait_until<F, E>(&self, task: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError>,
    {
        let task: BackgroundTask = task.map(|res| res.map_err(Into::into)).boxed();
        lock(&self.inner.background).push(task);
        self.inner.background_added.notify_one();
    }

    /// Number of background tasks registered and not yet drained.
    pub fn pending_background_tasks(&self) -> usize {
        lock(&self.inner.background).len()
    }

    /// Wait for the claim, resolve the responder and deliver its wire response.
    ///
    /// Never returns while the event is Pending. Returns at once if another
    /// caller already took the responder.
    pub async fn settle(&self) {
        let responder = loop {
            let notified = self.inner.claimed.notified();
            let taken = {
                let mut slot = lock(&self.inner.responder);
                match std::mem::replace(&mut *slot, ResponderSlot::Taken) {
                    ResponderSlot::Ready(responder) => Some(responder),
                    ResponderSlot::Taken => return,
                    ResponderSlot::Empty => {
                        *slot = ResponderSlot::Empty;
                        None
                    }
                }
            };
            match taken {
                Some(responder) => break responder,
                None => notified.await,
            }
        };

        let outcome = AssertUnwindSafe(responder.resolve()).catch_unwind().await;
        match outcome {
            Ok(Ok(response)) => self.deliver(response.to_wire_response()),
            Ok(Err(err)) => self.deliver_failure(&err.to_string()),
            Err(_) => self.deliver_failure("handler panicked"),
        }

        self.inner
            .state
            .store(ResponseState::Settled as u8, Ordering::Release);
    }

    fn deliver(&self, wire: WireResponse) {
        let Some(sink) = lock(&self.inner.reply).take() else {
            tracing::error!(exchange_id = %self.inner.id, "Reply sink already used, dropping response");
            return;
        };

        let status = wire.status;
        match sink.send(wire) {
            Ok(()) => {
                tracing::debug!(exchange_id = %self.inner.id, status, "Response delivered");
            }
            Err(e) => {
                tracing::warn!(exchange_id = %self.inner.id, status, error = %e, "Reply sink failed");
            }
        }
    }

    fn deliver_failure(&self, message: &str) {
        metrics::record_handler_failure("rejected");

        if lock(&self.inner.reply).is_none() {
            tracing::error!(
                exchange_id = %self.inner.id,
                error = %message,
                "Response rejected after reply was sent"
            );
            return;
        }

        tracing::warn!(exchange_id = %self.inner.id, error = %message, "Response rejected, sending 500");
        self.deliver(WireResponse::internal_error(message));
    }

    /// Run background tasks as they are registered.
    ///
    /// Tasks make progress while the reply is still pending. Returns once
    /// [`close_background`](Self::close_background) was called and every
    /// registered task has finished.
    pub async fn run_background(&self) {
        let mut running = FuturesUnordered::new();
        loop {
            let added = self.inner.background_added.notified();
            running.extend(
                std::mem::take(&mut *lock(&self.inner.background))
                    .into_iter()
                    .map(|task| AssertUnwindSafe(task).catch_unwind()),
            );

            if running.is_empty() {
                if self.inner.background_closed.load(Ordering::Acquire)
                    && lock(&self.inner.background).is_empty()
                {
                    return;
                }
                added.await;
                continue;
            }

            tokio::select! {
                Some(result) = running.next() => self.log_background(result),
                _ = added => {}
            }
        }
    }

    /// Let [`run_background`](Self::run_background) return once idle.
    pub fn close_background(&self) {
        self.inner.background_closed.store(true, Ordering::Release);
        self.inner.background_added.notify_one();
    }

    /// Await every background task, including ones registered while draining.
    pub async fn drain_background(&self) {
        self.close_background();
        self.run_background().await;
    }

    fn log_background(&self, result: std::thread::Result<Result<(), BoxError>>) {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(exchange_id = %self.inner.id, error = %e, "Background task failed");
            }
            Err(_) => {
                tracing::warn!(exchange_id = %self.inner.id, "Background task panicked");
            }
        }
    }
}

impl std::fmt::Debug for FetchEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchEvent")
            .field("id", &self.inner.id)
            .field("method", &self.inner.request.method())
            .field("url", &self.inner.request.url())
            .field("client_address", &self.inner.client_address)
            .field("state", &self.state())
            .finish()
    }
}
