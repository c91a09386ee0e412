//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, known log level)
//! - Check the host is something a transport can bind
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: ServerOptions → Result<(), Vec<ValidationError>>

use std::fmt;

use crate::config::schema::ServerOptions;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in the options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub fn validate_options(options: &ServerOptions) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if options.host.trim().is_empty() {
        errors.push(ValidationError::new("host", "must not be empty"));
    } else if options.host.chars().any(char::is_whitespace) {
        errors.push(ValidationError::new("host", "must not contain whitespace"));
    }

    if options.max_connections == 0 {
        errors.push(ValidationError::new("max_connections", "must be greater than 0"));
    }

    if options.max_body_size == 0 {
        errors.push(ValidationError::new("max_body_size", "must be greater than 0"));
    }

    if options.timeout_ms == 0 {
        errors.push(ValidationError::new("timeout_ms", "must be greater than 0"));
    }

    let level = options.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level {:?}", options.observability.log_level),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
