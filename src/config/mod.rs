//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) or ServerOptions built in code
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerOptions (validated, immutable)
//!     → owned by one FetchServer, passed to its transport on listen()
//! ```
//!
//! # Design Decisions
//! - Options are immutable once a server is built
//! - All fields have defaults to allow minimal configs
//! - Limits beyond host/port are enforced by the transport, not the facade

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{ObservabilityConfig, ServerOptions};
pub use validation::{validate_options, ValidationError};
