//! Fetch Event API layer for Rust HTTP servers.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                   worker-fetch                   │
//!     exchange         │  ┌─────────┐    ┌──────────┐    ┌────────────┐   │
//!     ─────────────────┼─▶│   net   │───▶│  server  │───▶│   event    │   │
//!                      │  │transport│    │ dispatch │    │ FetchEvent │   │
//!                      │  └─────────┘    └──────────┘    └─────┬──────┘   │
//!                      │                                       │          │
//!                      │                                       ▼          │
//!     reply            │  ┌─────────┐                   ┌────────────┐    │
//!     ◀────────────────┼──│  reply  │◀──────────────────│    http    │    │
//!                      │  │  sink   │   WireResponse    │ Req / Resp │    │
//!                      │  └─────────┘                   └────────────┘    │
//!                      │                                                  │
//!                      │   config · lifecycle · observability             │
//!                      └──────────────────────────────────────────────────┘
//! ```
//!
//! A transport turns each inbound HTTP exchange into an [`net::Exchange`].
//! The [`server::Dispatcher`] wraps it in a [`Request`] and a [`FetchEvent`]
//! and runs every registered handler. The first handler to call
//! [`FetchEvent::respond_with`] decides the reply.

pub mod config;
pub mod event;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod server;

/// Error type carried by handler and responder failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub use config::ServerOptions;
pub use event::{EventError, FetchEvent, Responder};
pub use http::{Body, BodyMixin, Headers, Request, RequestInit, Response, ResponseInit, WireResponse};
pub use lifecycle::Shutdown;
pub use net::{ChannelTransport, ExchangeSender, IncomingExchange, ServerStats, Transport};
pub use server::{handler_fn, sync_handler, FetchServer, ServerError};
