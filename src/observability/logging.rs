//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber for hosts that want ours
//! - Honor `RUST_LOG`, falling back to the configured level
//! - Switch between JSON and human-readable output

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Directive used when neither `RUST_LOG` nor the config yields a valid filter.
const DEFAULT_DIRECTIVE: &str = "worker_fetch=info";

fn env_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("worker_fetch={}", config.log_level)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install the global subscriber.
///
/// Returns `false` if a subscriber was already installed (the existing one is kept).
pub fn init_logging(config: &ObservabilityConfig) -> bool {
    let registry = tracing_subscriber::registry().with(env_filter(config));

    let installed = if config.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    match installed {
        Ok(()) => {
            tracing::debug!(log_level = %config.log_level, json = config.json_logs, "Logging initialized");
            true
        }
        Err(_) => false,
    }
}
