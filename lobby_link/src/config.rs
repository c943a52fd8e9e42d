//! Client configuration management.
//!
//! Consolidates environment variable reads and provides validated
//! configuration with CLI overrides taking precedence.

use std::str::FromStr;
use std::time::Duration;

use crate::net::endpoint::Endpoint;
use crate::net::errors::NetError;

/// Default connection URL when none is configured.
pub const DEFAULT_WS_URL: &str = "ws://127.0.0.1:8080/";

/// Default delay between reconnect attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(5000);

/// Default capacity of the inbound message queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Complete client configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Connection URL (`ws://...` or `wss://...`).
    pub url: String,
    /// Authentication token sent as the first frame of every session.
    pub token: String,
    /// Fixed delay between reconnect attempts.
    pub reconnect_delay: Duration,
    /// Capacity of the inbound message queue.
    pub queue_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WS_URL.to_string(),
            token: String::new(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Recognized variables: `LOBBY_WS_URL`, `LOBBY_TOKEN`,
    /// `LOBBY_RECONNECT_MS`, `LOBBY_QUEUE_CAPACITY`. Explicit overrides (from
    /// CLI args) take precedence over the environment, which takes precedence
    /// over the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::InvalidConfig`] or [`NetError::InvalidUrl`] if the
    /// resulting configuration fails validation.
    pub fn from_env(
        url_override: Option<String>,
        token_override: Option<String>,
        reconnect_ms_override: Option<u64>,
        queue_capacity_override: Option<usize>,
    ) -> Result<Self, NetError> {
        let url = url_override
            .or_else(|| std::env::var("LOBBY_WS_URL").ok())
            .unwrap_or_else(|| DEFAULT_WS_URL.to_string());

        let token = token_override
            .or_else(|| std::env::var("LOBBY_TOKEN").ok())
            .unwrap_or_default();

        let reconnect_ms = reconnect_ms_override
            .unwrap_or_else(|| parse_env_or("LOBBY_RECONNECT_MS", 5000));

        let queue_capacity = queue_capacity_override
            .unwrap_or_else(|| parse_env_or("LOBBY_QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY));

        let config = Self {
            url,
            token,
            reconnect_delay: Duration::from_millis(reconnect_ms),
            queue_capacity,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the transport cannot operate with.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::InvalidUrl`] for an unparsable URL and
    /// [`NetError::InvalidConfig`] for a zero reconnect delay or queue
    /// capacity.
    pub fn validate(&self) -> Result<(), NetError> {
        Endpoint::parse(&self.url)?;
        if self.reconnect_delay.is_zero() {
            return Err(NetError::InvalidConfig(
                "reconnect delay must be greater than zero".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(NetError::InvalidConfig(
                "queue capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse an environment variable, falling back to `default` when the variable
/// is absent or unparsable.
fn parse_env_or<T: FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
