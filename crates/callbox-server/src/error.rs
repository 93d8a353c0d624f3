//! Server and configuration errors

use thiserror::Error;

/// Errors that can occur while loading `callbox.toml`
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is out of range
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors that stop the server itself. Request-level failures never
/// surface here; they become JSON error payloads.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding or accepting failed
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}
