//! Network error types for the transport client and its orchestration.

use thiserror::Error;

/// Errors reported synchronously by the transport layer.
///
/// Everything asynchronous (connect failures, dropped connections, decode
/// errors) is recovered internally and surfaced as connection transitions,
/// never as an error to the caller.
#[derive(Debug, Error)]
pub enum NetError {
    /// The connection URL could not be parsed into an endpoint.
    #[error("invalid connection URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The supplied configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// `start` was called while the component was already running.
    #[error("already running")]
    AlreadyRunning,

    /// A send was attempted without an established connection.
    #[error("not connected to a server")]
    NotConnected,

    /// A background thread could not be spawned.
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// An outbound payload could not be serialized.
    #[error("failed to serialize outbound message: {0}")]
    Serialize(#[from] serde_json::Error),
}
