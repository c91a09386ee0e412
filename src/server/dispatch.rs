//! Per-exchange dispatch: exchange → Request + FetchEvent → handlers → reply.
//!
//! # Responsibilities
//! - Translate a transport exchange into a request and event
//! - Run every registered handler, in order, with the same event
//! - Contain handler failures so later handlers still run
//! - Drive the event's settlement and background tasks
//!
//! # Design Decisions
//! - Handlers are called one after another; the futures they return run
//!   together, so a slow handler never holds back a later one
//! - Handler futures, settlement and `wait_until` tasks share one `join`, so
//!   the reply and background work progress independently
//! - Nothing is spawned: the transport decides how dispatch futures interleave
//! - A dispatch whose event is never claimed never completes; timing it out
//!   is the transport's job

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use futures_util::future::{join, FutureExt};
use futures_util::stream::{FuturesUnordered, StreamExt};
use tracing::Instrument;

use crate::event::FetchEvent;
use crate::http::{Request, WireResponse};
use crate::net::Exchange;
use crate::observability::metrics;
use crate::server::registry::{Handler, ListenerId, ListenerRegistry};

/// Handle given to transports; cheap to clone.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ListenerRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ListenerRegistry>) -> Self {
        Self { registry }
    }

    /// Handle one exchange to completion.
    ///
    /// Resolves after the reply was delivered and every `wait_until` task
    /// settled. Never resolves if no handler claims the event.
    pub async fn dispatch(&self, exchange: Exchange) {
        let Exchange {
            method,
            url,
            headers,
            body,
            client_address,
            reply,
        } = exchange;

        let request = match Request::from_exchange_parts(&method, &url, &headers, body) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(method = %method, url = %url, error = %e, "Rejecting malformed exchange");
                if let Err(e) = reply.send(WireResponse::text(400, &format!("Bad Request: {}", e))) {
                    tracing::warn!(error = %e, "Reply sink failed");
                }
                return;
            }
        };

        let handlers = self.registry.snapshot();
        if handlers.is_empty() {
            tracing::warn!(method = %method, url = %url, "No handler registered");
            if let Err(e) = reply.send(WireResponse::text(500, "No handler registered")) {
                tracing::warn!(error = %e, "Reply sink failed");
            }
            return;
        }

        let event = FetchEvent::new(request, client_address, reply);
        let span = tracing::debug_span!(
            "exchange",
            exchange_id = %event.id(),
            method = %method,
            url = %url,
        );

        async {
            tracing::debug!(client_address = %event.client_address(), handlers = handlers.len(), "Dispatching fetch event");
            let foreground = async {
                join(run_handlers(&event, &handlers), event.settle()).await;
                event.close_background();
            };
            join(foreground, event.run_background()).await;
            tracing::trace!("Exchange complete");
        }
        .instrument(span)
        .await
    }
}

async fn run_handlers(event: &FetchEvent, handlers: &[(ListenerId, Handler)]) {
    let mut running = FuturesUnordered::new();
    for (listener_id, handler) in handlers {
        match catch_unwind(AssertUnwindSafe(|| handler(event.clone()))) {
            Ok(fut) => {
                let listener_id = *listener_id;
                running.push(
                    AssertUnwindSafe(fut)
                        .catch_unwind()
                        .map(move |outcome| (listener_id, outcome)),
                );
            }
            Err(_) => {
                tracing::error!(listener = %listener_id, "Handler panicked");
                metrics::record_handler_failure("panicked");
            }
        }
    }

    while let Some((listener_id, outcome)) = running.next().await {
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(listener = %listener_id, error = %e, "Handler failed");
                metrics::record_handler_failure("threw");
            }
            Err(_) => {
                tracing::error!(listener = %listener_id, "Handler panicked");
                metrics::record_handler_failure("panicked");
            }
        }
    }

    if !event.responded() {
        tracing::warn!("No handler called respond_with; exchange stays pending until the transport gives up");
    }
}
