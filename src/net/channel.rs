//! In-process transport fed through a channel.
//!
//! # Responsibilities
//! - Receive exchanges from an `ExchangeSender` and dispatch them
//! - Enforce `max_connections`, `max_body_size` and `timeout_ms`
//! - Answer on behalf of the layer when no reply can come
//!
//! # Design Decisions
//! - All in-flight exchanges are polled from one task (`FuturesUnordered`);
//!   nothing is spawned
//! - Backpressure: ingress is not read while `max_connections` exchanges are
//!   in flight
//! - Oversized body → 413, no reply in time → 504, reply sink dropped → 500
//! - After the reply goes out the dispatch keeps running until background
//!   tasks finish

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use futures_util::future::{BoxFuture, FutureExt};
use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{mpsc, oneshot};

use crate::config::ServerOptions;
use crate::event::ReplySink;
use crate::http::{HeaderPair, WireResponse};
use crate::lifecycle::ShutdownSignal;
use crate::net::exchange::Exchange;
use crate::net::stats::{ExchangeGuard, ServerStats, StatsRecorder};
use crate::net::transport::{Transport, TransportError};
use crate::server::Dispatcher;

/// An exchange as submitted to the channel transport, before a reply sink exists.
#[derive(Debug, Clone, Default)]
pub struct IncomingExchange {
    pub method: String,
    pub url: String,
    pub headers: Vec<HeaderPair>,
    pub body: Option<Bytes>,
    pub client_address: String,
}

impl IncomingExchange {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            client_address: "127.0.0.1:0".to_string(),
            ..Self::default()
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(HeaderPair::new(name, value));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn client_address(mut self, addr: impl Into<String>) -> Self {
        self.client_address = addr.into();
        self
    }
}

struct Ingress {
    incoming: IncomingExchange,
    reply: oneshot::Sender<WireResponse>,
}

/// Submits exchanges to a [`ChannelTransport`].
#[derive(Clone)]
pub struct ExchangeSender {
    tx: mpsc::Sender<Ingress>,
}

impl ExchangeSender {
    /// Queue an exchange. The receiver resolves with its reply.
    pub async fn send(
        &self,
        incoming: IncomingExchange,
    ) -> Result<oneshot::Receiver<WireResponse>, TransportError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Ingress { incoming, reply })
            .await
            .map_err(|_| TransportError::Closed)?;
        Ok(rx)
    }
}

#[derive(Debug, Clone, Copy)]
struct Limits {
    max_connections: usize,
    max_body_size: usize,
    timeout: Duration,
}

impl From<&ServerOptions> for Limits {
    fn from(options: &ServerOptions) -> Self {
        Self {
            max_connections: options.max_connections.max(1),
            max_body_size: options.max_body_size,
            timeout: Duration::from_millis(options.timeout_ms),
        }
    }
}

/// Transport whose exchanges arrive over an in-process channel.
pub struct ChannelTransport {
    ingress: Mutex<Option<mpsc::Receiver<Ingress>>>,
    stats: StatsRecorder,
}

impl ChannelTransport {
    /// Create the transport and its sender. `capacity` bounds the ingress queue.
    pub fn new(capacity: usize) -> (Self, ExchangeSender) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                ingress: Mutex::new(Some(rx)),
                stats: StatsRecorder::new(),
            },
            ExchangeSender { tx },
        )
    }
}

impl Transport for ChannelTransport {
    fn serve(
        &self,
        options: ServerOptions,
        dispatcher: Dispatcher,
        mut shutdown: ShutdownSignal,
    ) -> BoxFuture<'static, Result<(), TransportError>> {
        let ingress = self
            .ingress
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let stats = self.stats.clone();

        async move {
            let mut rx = ingress.ok_or(TransportError::AlreadyServing)?;
            let limits = Limits::from(&options);
            let mut in_flight = FuturesUnordered::new();

            tracing::info!(
                bind_address = %options.bind_address(),
                max_connections = limits.max_connections,
                "Channel transport serving"
            );

            loop {
                tokio::select! {
                    _ = shutdown.recv() => {
                        tracing::info!(in_flight = in_flight.len(), "Shutdown signal received");
                        break;
                    }
                    Some(()) = in_flight.next(), if !in_flight.is_empty() => {}
                    next = rx.recv(), if in_flight.len() < limits.max_connections => {
                        match next {
                            Some(ingress) => {
                                in_flight.push(handle_exchange(
                                    dispatcher.clone(),
                                    ingress,
                                    limits,
                                    stats.begin(),
                                ));
                            }
                            None => {
                                tracing::debug!("Ingress closed");
                                break;
                            }
                        }
                    }
                }
            }

            // let in-flight exchanges finish; each is bounded by the timeout
            // until it has replied
            rx.close();
            while in_flight.next().await.is_some() {}

            tracing::info!("Channel transport stopped");
            Ok(())
        }
        .boxed()
    }

    fn stats(&self) -> ServerStats {
        self.stats.snapshot()
    }
}

async fn handle_exchange(
    dispatcher: Dispatcher,
    ingress: Ingress,
    limits: Limits,
    guard: ExchangeGuard,
) {
    let Ingress { incoming, reply } = ingress;

    let body_len = incoming.body.as_ref().map_or(0, Bytes::len);
    if body_len > limits.max_body_size {
        tracing::debug!(body_len, max_body_size = limits.max_body_size, "Request body too large");
        forward(reply, WireResponse::text(413, "Request body too large"), guard);
        return;
    }

    let (sink_tx, mut sink_rx) = oneshot::channel();
    let exchange = Exchange {
        method: incoming.method,
        url: incoming.url,
        headers: incoming.headers,
        body: incoming.body.filter(|b| !b.is_empty()),
        client_address: incoming.client_address,
        reply: ReplySink::from(sink_tx),
    };

    let dispatch = dispatcher.dispatch(exchange);
    tokio::pin!(dispatch);
    let deadline = tokio::time::sleep(limits.timeout);
    tokio::pin!(deadline);
    let mut dispatch_done = false;

    let (wire, timed_out) = loop {
        tokio::select! {
            res = &mut sink_rx => {
                let wire = res.unwrap_or_else(|_| WireResponse::text(500, "Handler did not respond"));
                break (wire, false);
            }
            _ = &mut dispatch, if !dispatch_done => {
                dispatch_done = true;
            }
            _ = &mut deadline => {
                tracing::warn!(timeout_ms = limits.timeout.as_millis() as u64, "Request timeout");
                break (WireResponse::text(504, "Request timeout"), true);
            }
        }
    };

    forward(reply, wire, guard);

    // a timed-out dispatch is dropped here, which drops its event and sink
    if !dispatch_done && !timed_out {
        dispatch.await;
    }
}

fn forward(reply: oneshot::Sender<WireResponse>, wire: WireResponse, mut guard: ExchangeGuard) {
    guard.set_status(wire.status);
    if reply.send(wire).is_err() {
        tracing::debug!("Client went away before the reply");
    }
}
