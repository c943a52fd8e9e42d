//! # Lobby Link
//!
//! A resilient client-side transport layer for lobby/matchmaking servers.
//!
//! The library maintains a persistent bidirectional WebSocket connection,
//! tolerates disconnects with automatic fixed-delay reconnects, and bridges
//! network I/O into a single-consumer pull model: the host application drains
//! decoded messages at its own cadence and is never blocked by the network.
//!
//! ## Architecture
//!
//! Three collaborating pieces:
//!
//! - [`net::client::WebSocketClient`]: owns one logical connection and a
//!   dedicated event-loop thread. Parses the connection URL, multiplexes
//!   connect/read/write, re-sends the session token on every reconnect, and
//!   emits decoded messages and connection transitions as
//!   [`net::client::TransportEvent`]s on a channel.
//! - [`net::queue::MessageQueue`]: a bounded thread-safe FIFO decoupling the
//!   network side from the consumer. Push on a full queue fails without
//!   blocking; the oldest buffered messages are preserved.
//! - [`net::manager::NetworkManager`]: validates inbound messages, answers
//!   protocol pings without consumer involvement, observes authentication
//!   results, and forwards everything else into the queue.
//!
//! ## Example
//!
//! ```no_run
//! use lobby_link::{ClientConfig, NetworkManager};
//!
//! let config = ClientConfig {
//!     url: "wss://lobby.example.net/live".to_string(),
//!     token: "my-token".to_string(),
//!     ..ClientConfig::default()
//! };
//! let manager = NetworkManager::new(config);
//! manager.start().expect("start failed");
//!
//! // On the host's periodic tick:
//! while let Some(message) = manager.next_message() {
//!     println!("server says: {message}");
//! }
//! ```

/// Client configuration with environment-variable loading.
pub mod config;
pub use config::ClientConfig;

/// Networking components (transport client, message queue, orchestration).
pub mod net;
pub use net::{
    client::{TransportEvent, WebSocketClient},
    errors::NetError,
    manager::NetworkManager,
    queue::MessageQueue,
};
