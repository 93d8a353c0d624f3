//! Server configuration (callbox.toml)
//!
//! Every field has a default, so an empty file or no file at all is a valid
//! configuration. Unknown keys are rejected.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Listener settings
    pub server: ServerConfig,

    /// Logging settings
    pub log: LogConfig,
}

/// `[server]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address (default: "127.0.0.1")
    pub host: String,

    /// Bind port, 0 for an ephemeral port (default: 8085)
    pub port: u16,

    /// Per-connection socket read timeout in milliseconds, 0 for none
    pub read_timeout_ms: u64,

    /// Largest accepted request body
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8085,
            read_timeout_ms: 5000,
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Socket read timeout, `None` when disabled
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_ms > 0).then(|| Duration::from_millis(self.read_timeout_ms))
    }

    /// Parsed bind address
    pub fn addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("host is not an IP address: {}", self.host)))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// `[log]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// `tracing` filter directive, e.g. "info" or "callbox_core=debug"
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load and validate a config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate config text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "server.max_body_bytes must be greater than 0".to_string(),
            ));
        }
        self.server.addr()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_default() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.server.port, 8085);
        assert_eq!(config.log.filter, "info");
    }

    #[test]
    fn test_partial_section() {
        let config = Config::from_toml_str(
            r#"
[server]
port = 0
read_timeout_ms = 0
"#,
        )
        .unwrap();
        assert_eq!(config.server.port, 0);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.read_timeout(), None);
    }

    #[test]
    fn test_unknown_section_rejected() {
        let err = Config::from_toml_str("[database]\nurl = \"x\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = Config::from_toml_str("[server]\nthreads = 4\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_zero_body_limit_invalid() {
        let err = Config::from_toml_str("[server]\nmax_body_bytes = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_bad_host_invalid() {
        let err = Config::from_toml_str("[server]\nhost = \"not an ip\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_addr() {
        let mut config = ServerConfig::default();
        config.port = 9000;
        assert_eq!(config.addr().unwrap(), "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
    }
}
