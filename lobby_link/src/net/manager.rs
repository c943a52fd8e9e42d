//! Orchestration between the transport client and the message consumer.
//!
//! The manager owns a [`WebSocketClient`] and a bounded [`MessageQueue`]. A
//! dispatch thread consumes transport events, answers liveness probes without
//! consumer involvement, validates message shape, and buffers everything else
//! for the consumer to drain at its own pace via [`NetworkManager::next_message`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use serde_json::Value;

use super::client::{TransportEvent, WebSocketClient};
use super::errors::NetError;
use super::messages;
use super::queue::MessageQueue;
use crate::config::ClientConfig;

/// Connects the transport to a pull-based consumer.
pub struct NetworkManager {
    config: ClientConfig,
    client: Arc<WebSocketClient>,
    queue: Arc<MessageQueue<Value>>,
    connected: Arc<AtomicBool>,
    running: AtomicBool,
    dispatch: Mutex<Option<thread::JoinHandle<()>>>,
}

impl NetworkManager {
    /// Create a manager from a configuration. No I/O happens until `start`.
    pub fn new(config: ClientConfig) -> Self {
        let client = Arc::new(WebSocketClient::with_reconnect_delay(
            config.reconnect_delay,
        ));
        let queue = Arc::new(MessageQueue::new(config.queue_capacity));
        Self {
            config,
            client,
            queue,
            connected: Arc::new(AtomicBool::new(false)),
            running: AtomicBool::new(false),
            dispatch: Mutex::new(None),
        }
    }

    /// Validate the configuration, start the transport client, and spawn the
    /// dispatch thread.
    ///
    /// # Errors
    ///
    /// Propagates configuration and client start failures; returns
    /// [`NetError::AlreadyRunning`] when already started.
    pub fn start(&self) -> Result<(), NetError> {
        if self.running.load(Ordering::SeqCst) {
            log::warn!("network manager already running");
            return Err(NetError::AlreadyRunning);
        }
        self.config.validate()?;

        let (events_tx, events_rx) = mpsc::channel();
        self.client
            .start(&self.config.url, &self.config.token, events_tx)?;

        let client = Arc::clone(&self.client);
        let queue = Arc::clone(&self.queue);
        let connected = Arc::clone(&self.connected);
        let handle = match thread::Builder::new()
            .name("lobby-dispatch".to_string())
            .spawn(move || dispatch_loop(&events_rx, &client, &queue, &connected))
        {
            Ok(handle) => handle,
            Err(source) => {
                self.client.stop();
                return Err(NetError::Spawn {
                    name: "dispatch",
                    source,
                });
            }
        };

        *self.dispatch.lock().expect("dispatch handle mutex poisoned") = Some(handle);
        self.running.store(true, Ordering::SeqCst);
        log::info!("network manager started");
        Ok(())
    }

    /// Stop the client, join the dispatch thread, and clear the queue.
    ///
    /// Idempotent; safe to call from any thread. `start` may be called again
    /// afterwards.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        log::info!("stopping network manager");
        self.connected.store(false, Ordering::SeqCst);

        // Stopping the client ends the event loop, which closes the event
        // channel and lets the dispatch thread drain out.
        self.client.stop();
        let handle = self
            .dispatch
            .lock()
            .expect("dispatch handle mutex poisoned")
            .take();
        if let Some(handle) = handle
            && handle.join().is_err()
        {
            log::error!("dispatch thread panicked");
        }

        self.queue.clear();
        log::info!("network manager stopped");
    }

    /// Pull the next buffered message without blocking.
    ///
    /// Returns `None` when the manager is stopped or the queue is empty.
    pub fn next_message(&self) -> Option<Value> {
        if !self.running.load(Ordering::SeqCst) {
            return None;
        }
        self.queue.try_pop()
    }

    /// Pull the next buffered message, waiting up to `timeout` for one.
    ///
    /// For consumers that want to sleep on queue activity instead of
    /// polling; [`NetworkManager::next_message`] remains the non-blocking
    /// default.
    pub fn wait_for_message(&self, timeout: Duration) -> Option<Value> {
        if !self.running.load(Ordering::SeqCst) {
            return None;
        }
        self.queue.wait_for_pop(timeout)
    }

    /// Send a message to the server.
    ///
    /// # Errors
    ///
    /// Fails fast with [`NetError::NotConnected`] when no connection is
    /// established. Acceptance is fire-and-forget (see
    /// [`WebSocketClient::send`]).
    pub fn send(&self, message: &Value) -> Result<(), NetError> {
        if !self.is_connected() {
            log::warn!("cannot send message: not connected");
            return Err(NetError::NotConnected);
        }
        self.client.send(message)
    }

    /// Whether a connection to the server is currently established.
    pub fn is_connected(&self) -> bool {
        self.running.load(Ordering::SeqCst)
            && self.connected.load(Ordering::SeqCst)
            && self.client.is_connected()
    }

    /// Number of buffered messages awaiting the consumer.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Discard all buffered messages, e.g. after a manual reconnect.
    pub fn clear_queue(&self) {
        self.queue.clear();
    }
}

impl Drop for NetworkManager {
    fn drop(&mut self) {
        self.stop();
    }
}

fn dispatch_loop(
    events: &mpsc::Receiver<TransportEvent>,
    client: &WebSocketClient,
    queue: &MessageQueue<Value>,
    connected: &AtomicBool,
) {
    while let Ok(event) = events.recv() {
        match event {
            TransportEvent::ConnectionChanged(now) => on_connection_changed(connected, now),
            TransportEvent::Inbound(message) => on_message(client, queue, message),
        }
    }
    log::debug!("dispatch loop exiting");
}

/// Track the connection flag, logging only on actual transitions.
fn on_connection_changed(connected: &AtomicBool, now: bool) {
    let was = connected.swap(now, Ordering::SeqCst);
    if now && !was {
        log::info!("connected to server");
    } else if !now && was {
        log::info!("disconnected from server");
    }
}

/// Validate one inbound message and route it.
///
/// Liveness probes are answered here and never reach the consumer; auth
/// results are logged and still delivered; everything else valid is buffered.
fn on_message(client: &WebSocketClient, queue: &MessageQueue<Value>, message: Value) {
    if let Err(reason) = messages::validate(&message) {
        log::warn!("discarding invalid message: {reason}");
        return;
    }

    match messages::message_type(&message) {
        Some(messages::TYPE_PING) => {
            let pong = messages::pong_for(&message);
            if let Err(e) = client.send(&pong) {
                log::warn!("failed to answer ping: {e}");
            }
            return;
        }
        Some(messages::TYPE_AUTH_RESPONSE) => messages::log_auth_result(&message),
        _ => {}
    }

    if !queue.push(message) {
        log::warn!("message queue full, dropping message");
    }
}
