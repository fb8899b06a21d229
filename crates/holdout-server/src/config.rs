//! Server configuration.

use std::time::Duration;

/// Tunables for a Holdout server instance.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,
    /// How often the coordinator scans rooms for expired round timers.
    pub sweep_interval: Duration,
    /// Chat messages longer than this are truncated, not rejected.
    pub chat_max_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            sweep_interval: Duration::from_millis(500),
            chat_max_len: 300,
        }
    }
}

impl ServerConfig {
    /// Default config overridden from the environment: `HOLDOUT_ADDR`
    /// replaces the bind address when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var("HOLDOUT_ADDR") {
            config.bind_addr = addr;
        }
        config
    }
}
