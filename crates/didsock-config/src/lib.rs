#![deny(unsafe_code)]

//! Configuration loading and validation for didsock.
//!
//! Loads TOML configuration files and validates them against expected
//! schemas. Provides the [`AgentConfig`] type as the central configuration
//! structure. The TCP port may alternatively come from the
//! `DIDSOCK_AGENT_PORT` environment variable; the config file wins when
//! both are present.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Environment variable supplying the agent's loopback TCP port.
pub const PORT_ENV_VAR: &str = "DIDSOCK_AGENT_PORT";

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("DIDSOCK_AGENT_PORT is not a valid port number: {0}")]
    InvalidPortEnv(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Transport selection and overrides.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Transport selection and endpoint overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Transport mode: "auto" (pick by platform), "unix", or "tcp".
    #[serde(default = "default_transport_mode")]
    pub mode: String,

    /// Override for the agent's Unix socket path. When unset, the fixed
    /// system install path is probed first, then the per-user path.
    #[serde(default)]
    pub socket_path: Option<String>,

    /// Loopback TCP port of the agent. When unset, `DIDSOCK_AGENT_PORT`
    /// is consulted; for the TCP transport one of the two is required.
    #[serde(default)]
    pub port: Option<u16>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            mode: default_transport_mode(),
            socket_path: None,
            port: None,
        }
    }
}

fn default_transport_mode() -> String {
    "auto".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AgentConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: AgentConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AgentConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_modes = ["auto", "unix", "tcp"];
        if !valid_modes.contains(&self.transport.mode.as_str()) {
            return Err(ConfigError::Validation(format!(
                "transport.mode must be one of {:?}, got {:?}",
                valid_modes, self.transport.mode
            )));
        }
        if self.transport.port == Some(0) {
            return Err(ConfigError::Validation(
                "transport.port must be non-zero".to_string(),
            ));
        }
        if let Some(path) = &self.transport.socket_path
            && path.is_empty()
        {
            return Err(ConfigError::Validation(
                "transport.socket_path must not be empty".to_string(),
            ));
        }
        if self.logging.level.is_empty() {
            return Err(ConfigError::Validation(
                "logging.level must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Read the agent port from `DIDSOCK_AGENT_PORT`, if set.
///
/// An unset variable is `Ok(None)`; a set-but-unparsable one is an error —
/// silently ignoring a typo'd port would send requests nowhere.
pub fn agent_port_from_env() -> Result<Option<u16>, ConfigError> {
    match std::env::var(PORT_ENV_VAR) {
        Ok(raw) => parse_port(&raw).map(Some),
        Err(_) => Ok(None),
    }
}

fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    match raw.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(ConfigError::InvalidPortEnv(raw.to_string())),
        Ok(port) => Ok(port),
    }
}
