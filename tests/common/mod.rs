//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use worker_fetch::event::ReplySink;
use worker_fetch::http::{HeaderPair, Request, RequestInit, WireResponse};
use worker_fetch::net::Exchange;
use worker_fetch::{
    ChannelTransport, ExchangeSender, FetchEvent, FetchServer, IncomingExchange, ServerError,
    ServerOptions,
};

/// Reply sink that keeps every response it is handed.
#[derive(Clone, Default)]
pub struct RecordingSink {
    replies: Arc<Mutex<Vec<WireResponse>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sink(&self) -> ReplySink {
        let replies = Arc::clone(&self.replies);
        ReplySink::new(move |response| {
            replies.lock().unwrap().push(response);
            Ok(())
        })
    }

    pub fn replies(&self) -> Vec<WireResponse> {
        self.replies.lock().unwrap().clone()
    }

    pub fn only_reply(&self) -> WireResponse {
        let replies = self.replies();
        assert_eq!(replies.len(), 1, "expected exactly one reply, got {:?}", replies);
        replies.into_iter().next().unwrap()
    }

    /// Poll until a reply shows up or `wait` passes.
    pub async fn wait_for_reply(&self, wait: Duration) -> Option<WireResponse> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            if let Some(reply) = self.replies().into_iter().next() {
                return Some(reply);
            }
            if tokio::time::Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

/// A GET event on `url` wired to `sink`.
pub fn event(url: &str, sink: &RecordingSink) -> FetchEvent {
    let request = Request::new(url, RequestInit::default()).unwrap();
    FetchEvent::new(request, "127.0.0.1:50000", sink.sink())
}

/// A transport-level exchange wired to `sink`.
pub fn exchange(method: &str, url: &str, body: Option<&'static str>, sink: &RecordingSink) -> Exchange {
    Exchange {
        method: method.to_string(),
        url: url.to_string(),
        headers: vec![HeaderPair::new("Host", "localhost")],
        body: body.map(|b| Bytes::from_static(b.as_bytes())),
        client_address: "127.0.0.1:50000".to_string(),
        reply: sink.sink(),
    }
}

/// A server on an in-process transport that is not listening yet.
pub fn channel_server(options: ServerOptions) -> (Arc<FetchServer>, ExchangeSender) {
    let (transport, sender) = ChannelTransport::new(64);
    let server = FetchServer::new(options, transport).unwrap();
    (Arc::new(server), sender)
}

/// Start `listen` on a task.
pub fn start(server: &Arc<FetchServer>) -> JoinHandle<Result<(), ServerError>> {
    let server = Arc::clone(server);
    tokio::spawn(async move { server.listen().await })
}

/// Send one exchange and wait (bounded) for its reply.
pub async fn roundtrip(sender: &ExchangeSender, incoming: IncomingExchange) -> WireResponse {
    let rx: oneshot::Receiver<WireResponse> = sender.send(incoming).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), rx)
        .await
        .expect("reply timed out")
        .expect("reply channel closed")
}
