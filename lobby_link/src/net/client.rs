//! A reconnecting WebSocket client with a dedicated event-loop thread.
//!
//! The client owns one logical connection. `start` spawns a background thread
//! running a single-threaded runtime; the thread drives the session state
//! machine
//!
//! ```text
//! Disconnected -> Connecting -> Established -> (Closed | ConnectionError)
//!      ^                                                 |
//!      +---------------- reconnect delay ----------------+
//! ```
//!
//! and keeps retrying with a fixed delay for as long as the client is
//! running. Decoded messages and connection transitions are emitted as
//! [`TransportEvent`]s on the channel supplied to `start`, so the owner
//! consumes network activity without ever running inside this thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{Notify, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async_with_config};

use super::endpoint::Endpoint;
use super::errors::NetError;
use crate::config::DEFAULT_RECONNECT_DELAY;

/// Maximum accepted inbound message size, so a misbehaving server cannot
/// force unbounded allocation.
pub const MAX_MESSAGE_BYTES: usize = 1024 * 1024;

/// How long a single connect attempt may take before it counts as failed.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Events emitted by the network thread.
#[derive(Clone, Debug)]
pub enum TransportEvent {
    /// A decoded inbound message.
    Inbound(Value),
    /// The connection was established (`true`) or lost (`false`).
    ConnectionChanged(bool),
}

/// How a session ended, deciding the next state transition.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum SessionEnd {
    /// The server closed the connection; reconnect after the delay.
    Closed,
    /// The connection failed mid-session; reconnect after the delay.
    ConnectionError,
    /// Stop was requested; leave the event loop.
    Stopped,
}

/// Result of one connect attempt.
enum ConnectOutcome {
    Connected(Box<WsStream>),
    Failed,
    Stopped,
}

/// The single pending outbound write.
///
/// A mailbox, not a queue: installing a new message overwrites an unsent
/// previous one (last write wins). The network thread is the sole reader.
struct OutboundSlot {
    pending: Mutex<Option<String>>,
    wake: Notify,
}

impl OutboundSlot {
    fn new() -> Self {
        Self {
            pending: Mutex::new(None),
            wake: Notify::new(),
        }
    }

    fn install(&self, text: String) {
        let mut pending = self.pending.lock().expect("outbound slot mutex poisoned");
        if pending.replace(text).is_some() {
            log::debug!("overwriting an unsent outbound message");
        }
        drop(pending);
        self.wake.notify_one();
    }

    fn take(&self) -> Option<String> {
        self.pending
            .lock()
            .expect("outbound slot mutex poisoned")
            .take()
    }

    fn clear(&self) {
        self.pending
            .lock()
            .expect("outbound slot mutex poisoned")
            .take();
    }
}

/// State that only exists while the client is running.
struct Running {
    shutdown: watch::Sender<bool>,
    outbound: Arc<OutboundSlot>,
    handle: thread::JoinHandle<()>,
}

/// A WebSocket client for a lobby/matchmaking server.
///
/// The public API is synchronous and callable from any thread; all network
/// I/O happens on the client's own event-loop thread.
pub struct WebSocketClient {
    reconnect_delay: Duration,
    connected: Arc<AtomicBool>,
    running: Mutex<Option<Running>>,
}

impl Default for WebSocketClient {
    fn default() -> Self {
        Self::new()
    }
}

impl WebSocketClient {
    /// Create a client with the default reconnect delay.
    pub fn new() -> Self {
        Self::with_reconnect_delay(DEFAULT_RECONNECT_DELAY)
    }

    /// Create a client that waits `reconnect_delay` between connect attempts.
    pub fn with_reconnect_delay(reconnect_delay: Duration) -> Self {
        Self {
            reconnect_delay,
            connected: Arc::new(AtomicBool::new(false)),
            running: Mutex::new(None),
        }
    }

    /// Start connecting to `url`, emitting transport events onto `events`.
    ///
    /// Returns as soon as the event-loop thread is spawned, without waiting
    /// for the connection to establish. The `token` is sent verbatim as the
    /// first text frame of every session (skipped when empty).
    ///
    /// # Errors
    ///
    /// Fails with [`NetError::InvalidUrl`] before any thread is spawned when
    /// the URL does not parse, and with [`NetError::AlreadyRunning`] when the
    /// client is already started.
    pub fn start(
        &self,
        url: &str,
        token: &str,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<(), NetError> {
        let mut running = self.running.lock().expect("client state mutex poisoned");
        if running.is_some() {
            log::warn!("client already running");
            return Err(NetError::AlreadyRunning);
        }

        let endpoint = Endpoint::parse(url)?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let outbound = Arc::new(OutboundSlot::new());

        let event_loop = EventLoop {
            endpoint,
            token: token.to_string(),
            events,
            outbound: Arc::clone(&outbound),
            connected: Arc::clone(&self.connected),
            shutdown: shutdown_rx,
            reconnect_delay: self.reconnect_delay,
        };

        let handle = thread::Builder::new()
            .name("lobby-net".to_string())
            .spawn(move || {
                match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime.block_on(event_loop.run()),
                    Err(e) => log::error!("failed to build network runtime: {e}"),
                }
            })
            .map_err(|source| NetError::Spawn {
                name: "network",
                source,
            })?;

        *running = Some(Running {
            shutdown: shutdown_tx,
            outbound,
            handle,
        });
        log::info!("client started for {url}");
        Ok(())
    }

    /// Stop the client and join its event-loop thread.
    ///
    /// Idempotent, callable from any thread. After `stop`, `start` may be
    /// called again with a fresh session.
    pub fn stop(&self) {
        let running = self
            .running
            .lock()
            .expect("client state mutex poisoned")
            .take();
        let Some(running) = running else {
            return;
        };

        log::info!("stopping client");
        self.connected.store(false, Ordering::SeqCst);
        let _ = running.shutdown.send(true);
        if running.handle.join().is_err() {
            log::error!("network thread panicked");
        }
        log::info!("client stopped");
    }

    /// Queue `message` for transmission.
    ///
    /// Fire-and-forget: acceptance means the message occupies the outbound
    /// slot, not that it reached the socket. A second send before the first
    /// is flushed replaces it (last write wins).
    ///
    /// # Errors
    ///
    /// Returns [`NetError::NotConnected`] when no connection is established.
    pub fn send(&self, message: &Value) -> Result<(), NetError> {
        if !self.is_connected() {
            return Err(NetError::NotConnected);
        }
        let text = serde_json::to_string(message)?;

        let running = self.running.lock().expect("client state mutex poisoned");
        match running.as_ref() {
            Some(running) => {
                running.outbound.install(text);
                Ok(())
            }
            None => Err(NetError::NotConnected),
        }
    }

    /// Whether a connection is currently established.
    ///
    /// Lock-free and eventually consistent with the network thread.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl Drop for WebSocketClient {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Everything the event-loop thread owns.
struct EventLoop {
    endpoint: Endpoint,
    token: String,
    events: mpsc::Sender<TransportEvent>,
    outbound: Arc<OutboundSlot>,
    connected: Arc<AtomicBool>,
    shutdown: watch::Receiver<bool>,
    reconnect_delay: Duration,
}

impl EventLoop {
    async fn run(mut self) {
        let url = self.endpoint.url();
        while !self.stop_requested() {
            log::info!("connecting to {}", self.endpoint);
            match self.connect(&url).await {
                ConnectOutcome::Connected(ws) => {
                    self.connected.store(true, Ordering::SeqCst);
                    self.emit(TransportEvent::ConnectionChanged(true));
                    let end = self.run_session(*ws).await;
                    self.connected.store(false, Ordering::SeqCst);
                    self.emit(TransportEvent::ConnectionChanged(false));
                    if end == SessionEnd::Stopped {
                        break;
                    }
                }
                ConnectOutcome::Failed => {
                    self.emit(TransportEvent::ConnectionChanged(false));
                }
                ConnectOutcome::Stopped => break,
            }

            if self.stop_requested() {
                break;
            }
            log::info!("reconnecting in {:?}", self.reconnect_delay);
            self.sleep_before_reconnect().await;
        }
        log::debug!("network event loop exiting");
    }

    /// One connect attempt, bounded by [`CONNECT_TIMEOUT`] and interruptible
    /// by stop.
    async fn connect(&mut self, url: &str) -> ConnectOutcome {
        let config = WebSocketConfig::default()
            .max_message_size(Some(MAX_MESSAGE_BYTES))
            .max_frame_size(Some(MAX_MESSAGE_BYTES));
        let attempt = tokio::time::timeout(
            CONNECT_TIMEOUT,
            connect_async_with_config(url, Some(config), false),
        );

        tokio::select! {
            result = attempt => match result {
                Ok(Ok((ws, _response))) => ConnectOutcome::Connected(Box::new(ws)),
                Ok(Err(e)) => {
                    log::warn!("connection attempt to {} failed: {e}", self.endpoint);
                    ConnectOutcome::Failed
                }
                Err(_elapsed) => {
                    log::warn!(
                        "connection attempt to {} timed out after {:?}",
                        self.endpoint,
                        CONNECT_TIMEOUT
                    );
                    ConnectOutcome::Failed
                }
            },
            _ = self.shutdown.changed() => ConnectOutcome::Stopped,
        }
    }

    /// Drive one established session until it ends.
    async fn run_session(&mut self, mut ws: WsStream) -> SessionEnd {
        log::info!("connection established to {}", self.endpoint);

        // A new session never inherits writes queued for a previous one.
        self.outbound.clear();

        // The token authenticates the session and must be the first frame.
        if !self.token.is_empty()
            && let Err(e) = ws.send(Message::text(self.token.clone())).await
        {
            log::warn!("failed to send session token: {e}");
            return SessionEnd::ConnectionError;
        }

        loop {
            tokio::select! {
                incoming = ws.next() => match incoming {
                    Some(Ok(Message::Text(text))) => self.handle_frame(&text),
                    Some(Ok(Message::Close(_))) | None => {
                        log::info!("server closed the connection");
                        return SessionEnd::Closed;
                    }
                    // Binary payloads and protocol-level ping/pong frames are
                    // not part of this protocol.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        log::warn!("connection error: {e}");
                        return SessionEnd::ConnectionError;
                    }
                },
                _ = self.outbound.wake.notified() => {
                    if let Some(text) = self.outbound.take()
                        && let Err(e) = ws.send(Message::text(text)).await
                    {
                        log::warn!("failed to flush outbound message: {e}");
                        return SessionEnd::ConnectionError;
                    }
                }
                _ = self.shutdown.changed() => {
                    let _ = ws.close(None).await;
                    return SessionEnd::Stopped;
                }
            }
        }
    }

    /// Decode one inbound text frame. Decode failures are dropped without
    /// closing the connection.
    fn handle_frame(&self, text: &str) {
        match serde_json::from_str::<Value>(text) {
            Ok(message) => self.emit(TransportEvent::Inbound(message)),
            Err(e) => log::warn!("discarding undecodable frame: {e}"),
        }
    }

    fn emit(&self, event: TransportEvent) {
        // The receiver disappearing just means the owner is shutting down.
        let _ = self.events.send(event);
    }

    fn stop_requested(&self) -> bool {
        *self.shutdown.borrow()
    }

    async fn sleep_before_reconnect(&mut self) {
        tokio::select! {
            _ = tokio::time::sleep(self.reconnect_delay) => {}
            _ = self.shutdown.changed() => {}
        }
    }
}
