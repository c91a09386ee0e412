//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ServerOptions;
use crate::config::validation::{validate_options, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Validation(_) => None,
        }
    }
}

/// Parse and validate options from TOML text.
pub fn parse_config(content: &str) -> Result<ServerOptions, ConfigError> {
    let options: ServerOptions = toml::from_str(content).map_err(ConfigError::Parse)?;
    validate_options(&options).map_err(ConfigError::Validation)?;
    Ok(options)
}

/// Load and validate options from a TOML file.
pub fn load_config(path: &Path) -> Result<ServerOptions, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let options = parse_config(&content)?;

    tracing::debug!(path = %path.display(), bind_address = %options.bind_address(), "Configuration loaded");
    Ok(options)
}
