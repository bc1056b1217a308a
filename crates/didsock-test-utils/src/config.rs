//! Configuration builders for tests.
//!
//! Use [`TestConfigBuilder`] to create customised [`AgentConfig`] values
//! without repeating boilerplate across crate boundaries.

use didsock_config::AgentConfig;

/// Fluent builder for [`AgentConfig`] in tests.
///
/// # Example
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .mode("tcp")
///     .port(3000)
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AgentConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AgentConfig::default(),
        }
    }

    pub fn mode(mut self, mode: &str) -> Self {
        self.config.transport.mode = mode.to_string();
        self
    }

    pub fn socket_path(mut self, path: &str) -> Self {
        self.config.transport.socket_path = Some(path.to_string());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.transport.port = Some(port);
        self
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.logging.level = level.to_string();
        self
    }

    pub fn build(self) -> AgentConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
