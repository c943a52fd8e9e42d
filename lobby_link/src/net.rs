//! Networking layer for lobby client-server communication.
//!
//! This module provides a reconnecting WebSocket transport with a JSON text
//! frame protocol. The background client emits transport events onto a
//! channel; the manager consumes them, validates message shape, and buffers
//! deliverable messages in a bounded queue for the host to drain.

/// Reconnecting WebSocket client with a dedicated event-loop thread.
pub mod client;

/// Connection URL parsing.
pub mod endpoint;

/// Network error types.
pub mod errors;

/// Orchestration between the transport client and the message consumer.
pub mod manager;

/// Inbound message validation and protocol control messages.
pub mod messages;

/// Bounded thread-safe FIFO for decoded messages.
pub mod queue;
