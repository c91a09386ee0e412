//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Options accepted by a server at construction.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerOptions {
    /// Port to listen on.
    pub port: u16,

    /// Host to bind to.
    pub host: String,

    /// Enable SO_REUSEPORT for multi-process scaling.
    pub reuse_port: bool,

    /// Maximum concurrent exchanges (backpressure, transport-enforced).
    pub max_connections: usize,

    /// Request body size limit in bytes (transport-enforced).
    pub max_body_size: usize,

    /// Time allowed for a reply, in milliseconds (transport-enforced).
    pub timeout_ms: u64,

    /// Logging settings.
    pub observability: ObservabilityConfig,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
            reuse_port: false,
            max_connections: 65_536,
            max_body_size: 10 * 1024 * 1024, // 10MB
            timeout_ms: 30_000,
            observability: ObservabilityConfig::default(),
        }
    }
}

impl ServerOptions {
    /// Options for `port` with every other field defaulted.
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }

    /// `host:port`, with IPv6 literals bracketed.
    pub fn bind_address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}
