//! End-to-end exchanges through the in-process transport.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use worker_fetch::{
    handler_fn, sync_handler, BoxError, BodyMixin, FetchEvent, IncomingExchange, Response,
    ServerError, ServerOptions,
};

mod common;

use common::{channel_server, roundtrip, start};

fn echo_handler() -> worker_fetch::server::Handler {
    sync_handler(|event: &FetchEvent| {
        let body = event.request().text()?;
        event.respond_with(Response::text(body, 200))?;
        Ok::<_, BoxError>(())
    })
}

#[tokio::test]
async fn echo_roundtrip_updates_stats() {
    let (server, sender) = channel_server(ServerOptions::default());
    server.add_event_listener("fetch", echo_handler()).unwrap();
    let listening = start(&server);

    let reply = roundtrip(
        &sender,
        IncomingExchange::new("POST", "http://localhost/echo").body("hello"),
    )
    .await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body_text(), "hello");

    let mut stats = server.stats();
    for _ in 0..100 {
        if stats.total_requests == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        stats = server.stats();
    }
    assert_eq!(stats.total_requests, 1);
    assert_eq!(stats.active_connections, 0);
    assert!(stats.avg_latency_ms >= 0.0);

    server.close().await;
    tokio::time::timeout(Duration::from_secs(2), listening)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn oversized_body_gets_413() {
    let options = ServerOptions {
        max_body_size: 4,
        ..ServerOptions::default()
    };
    let (server, sender) = channel_server(options);
    let called = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&called);
    server
        .add_event_listener(
            "fetch",
            sync_handler(move |_| {
                flag.store(true, Ordering::SeqCst);
                Ok::<_, BoxError>(())
            }),
        )
        .unwrap();
    let _listening = start(&server);

    let reply = roundtrip(
        &sender,
        IncomingExchange::new("POST", "http://localhost/").body("hello world"),
    )
    .await;
    assert_eq!(reply.status, 413);
    assert_eq!(reply.body_text(), "Request body too large");
    assert!(!called.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn unanswered_exchange_times_out_with_504() {
    let options = ServerOptions {
        timeout_ms: 50,
        ..ServerOptions::default()
    };
    let (server, sender) = channel_server(options);
    server
        .add_event_listener("fetch", sync_handler(|_| Ok::<_, BoxError>(())))
        .unwrap();
    let _listening = start(&server);

    let reply = roundtrip(&sender, IncomingExchange::new("GET", "http://localhost/")).await;
    assert_eq!(reply.status, 504);
    assert_eq!(reply.body_text(), "Request timeout");
}

#[tokio::test]
async fn removing_the_last_listener_gets_500() {
    let (server, sender) = channel_server(ServerOptions::default());
    let id = server.add_event_listener("fetch", echo_handler()).unwrap();
    let _listening = start(&server);

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(server.remove_event_listener("fetch", id).unwrap());

    let reply = roundtrip(&sender, IncomingExchange::new("GET", "http://localhost/")).await;
    assert_eq!(reply.status, 500);
    assert_eq!(reply.body_text(), "No handler registered");
}

#[tokio::test(start_paused = true)]
async fn ingress_waits_while_at_max_connections() {
    let options = ServerOptions {
        max_connections: 1,
        ..ServerOptions::default()
    };
    let (server, sender) = channel_server(options);
    let gate = Arc::new(Notify::new());

    let handler_gate = Arc::clone(&gate);
    server
        .add_event_listener(
            "fetch",
            handler_fn(move |event: FetchEvent| {
                let gate = Arc::clone(&handler_gate);
                async move {
                    if event.request().parsed_url().path() == "/block" {
                        gate.notified().await;
                    }
                    event.respond_with(Response::text("done", 200))?;
                    Ok::<_, BoxError>(())
                }
            }),
        )
        .unwrap();
    let _listening = start(&server);

    let blocked = sender
        .send(IncomingExchange::new("GET", "http://localhost/block"))
        .await
        .unwrap();
    let mut queued = sender
        .send(IncomingExchange::new("GET", "http://localhost/fast"))
        .await
        .unwrap();

    let early = tokio::time::timeout(Duration::from_millis(100), &mut queued).await;
    assert!(early.is_err(), "second exchange ran past the connection limit");

    gate.notify_one();
    let blocked = tokio::time::timeout(Duration::from_secs(2), blocked)
        .await
        .unwrap()
        .unwrap();
    let queued = tokio::time::timeout(Duration::from_secs(2), queued)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(blocked.status, 200);
    assert_eq!(queued.body_text(), "done");
}

#[tokio::test]
async fn listen_twice_is_rejected() {
    let (server, _sender) = channel_server(ServerOptions::default());
    server.add_event_listener("fetch", echo_handler()).unwrap();
    let listening = start(&server);

    for _ in 0..100 {
        if server.is_listening() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(matches!(server.listen().await, Err(ServerError::AlreadyListening)));

    server.close().await;
    tokio::time::timeout(Duration::from_secs(2), listening)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(!server.is_listening());
}

#[tokio::test]
async fn close_before_listen_returns_promptly() {
    let (server, _sender) = channel_server(ServerOptions::default());
    server.add_event_listener("fetch", echo_handler()).unwrap();
    server.close().await;

    tokio::time::timeout(Duration::from_secs(2), server.listen())
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn later_handler_answers_while_earlier_one_sleeps() {
    let options = ServerOptions {
        timeout_ms: 200,
        ..ServerOptions::default()
    };
    let (server, sender) = channel_server(options);
    server
        .add_event_listener(
            "fetch",
            handler_fn(|_event: FetchEvent| async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, BoxError>(())
            }),
        )
        .unwrap();
    server
        .add_event_listener(
            "fetch",
            sync_handler(|event: &FetchEvent| {
                event.respond_with(Response::text("from two", 200))?;
                Ok::<_, BoxError>(())
            }),
        )
        .unwrap();
    let _listening = start(&server);

    let reply = roundtrip(&sender, IncomingExchange::new("GET", "http://localhost/")).await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body_text(), "from two");
}

#[tokio::test(start_paused = true)]
async fn background_work_runs_before_timeout_reply() {
    let options = ServerOptions {
        timeout_ms: 50,
        ..ServerOptions::default()
    };
    let (server, sender) = channel_server(options);
    let ran = Arc::new(AtomicBool::new(false));

    let flag = Arc::clone(&ran);
    server
        .add_event_listener(
            "fetch",
            sync_handler(move |event: &FetchEvent| {
                let flag = Arc::clone(&flag);
                event.wait_until(async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    flag.store(true, Ordering::SeqCst);
                    Ok::<_, BoxError>(())
                });
                Err::<(), BoxError>("no response".into())
            }),
        )
        .unwrap();
    let _listening = start(&server);

    let reply = roundtrip(&sender, IncomingExchange::new("GET", "http://localhost/")).await;
    assert_eq!(reply.status, 504);
    assert!(ran.load(Ordering::SeqCst));
}
