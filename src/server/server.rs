//! Server facade handed to integrators.
//!
//! # Responsibilities
//! - Own the listener registry, transport and shutdown coordinator
//! - Expose registration, `listen`/`close` and statistics
//!
//! # Design Decisions
//! - All state is per instance; two servers never share handlers or stats
//! - Options are validated at construction so `listen` only fails on usage

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::{validate_options, ServerOptions};
use crate::lifecycle::Shutdown;
use crate::net::{ServerStats, Transport};
use crate::server::dispatch::Dispatcher;
use crate::server::registry::{EventKind, Handler, ListenerId, ListenerRegistry};
use crate::server::ServerError;

/// A fetch-event server bound to one transport.
pub struct FetchServer {
    options: ServerOptions,
    registry: Arc<ListenerRegistry>,
    transport: Arc<dyn Transport>,
    shutdown: Shutdown,
    listening: AtomicBool,
}

impl FetchServer {
    /// Create a server. Fails if `options` do not validate.
    pub fn new(options: ServerOptions, transport: impl Transport) -> Result<Self, ServerError> {
        validate_options(&options).map_err(ServerError::InvalidOptions)?;

        Ok(Self {
            options,
            registry: Arc::new(ListenerRegistry::new()),
            transport: Arc::new(transport),
            shutdown: Shutdown::new(),
            listening: AtomicBool::new(false),
        })
    }

    /// Register a handler for `event`. Only `"fetch"` is accepted.
    pub fn add_event_listener(&self, event: &str, handler: Handler) -> Result<ListenerId, ServerError> {
        let EventKind::Fetch = event.parse::<EventKind>()?;
        let id = self.registry.add(handler);
        tracing::debug!(listener = %id, event, "Event listener added");
        Ok(id)
    }

    /// Remove a registration. Returns `false` if it was not registered.
    pub fn remove_event_listener(&self, event: &str, id: ListenerId) -> Result<bool, ServerError> {
        let EventKind::Fetch = event.parse::<EventKind>()?;
        let removed = self.registry.remove(id);
        tracing::debug!(listener = %id, event, removed, "Event listener removed");
        Ok(removed)
    }

    /// Serve exchanges until [`close`](Self::close) is called.
    pub async fn listen(&self) -> Result<(), ServerError> {
        if self.registry.is_empty() {
            return Err(ServerError::NoHandlers);
        }
        if self.listening.swap(true, Ordering::AcqRel) {
            return Err(ServerError::AlreadyListening);
        }

        tracing::info!(
            bind_address = %self.options.bind_address(),
            handlers = self.registry.len(),
            "Server listening"
        );

        let result = self
            .transport
            .serve(self.options.clone(), self.dispatcher(), self.shutdown.subscribe())
            .await;
        self.listening.store(false, Ordering::Release);

        match &result {
            Ok(()) => tracing::info!("Server stopped"),
            Err(e) => tracing::error!(error = %e, "Transport failed"),
        }
        result.map_err(ServerError::from)
    }

    /// Ask the transport to stop. A later `listen` returns at once.
    pub async fn close(&self) {
        tracing::info!(subscribers = self.shutdown.receiver_count(), "Closing server");
        self.shutdown.trigger();
    }

    pub fn stats(&self) -> ServerStats {
        self.transport.stats()
    }

    /// Dispatch handle for transports driven outside `listen`.
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(Arc::clone(&self.registry))
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Acquire)
    }

    pub fn listener_count(&self) -> usize {
        self.registry.len()
    }
}

impl std::fmt::Debug for FetchServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchServer")
            .field("options", &self.options)
            .field("listeners", &self.registry.len())
            .field("listening", &self.is_listening())
            .finish()
    }
}
