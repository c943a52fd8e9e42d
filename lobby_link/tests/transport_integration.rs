//! End-to-end tests for the transport layer against a local WebSocket server.
//!
//! Each test runs its own in-process server. Because the dispatch loop
//! handles events in order, a ping sent after other messages acts as a
//! barrier: once the server receives the pong, everything sent before the
//! ping has been validated and routed.

use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use lobby_link::{ClientConfig, NetworkManager};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};

const TOKEN: &str = "session-token-123";

type ServerWs = WebSocketStream<TcpStream>;

async fn bind() -> (TcpListener, String) {
    let _ = env_logger::builder().is_test(true).try_init();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/", listener.local_addr().unwrap());
    (listener, url)
}

fn manager_for(url: &str, queue_capacity: usize) -> NetworkManager {
    NetworkManager::new(ClientConfig {
        url: url.to_string(),
        token: TOKEN.to_string(),
        reconnect_delay: Duration::from_millis(300),
        queue_capacity,
    })
}

/// Accept one client session and assert the opening token frame.
async fn accept_session(listener: &TcpListener) -> ServerWs {
    let (stream, _) = listener.accept().await.unwrap();
    let mut ws = accept_async(stream).await.unwrap();
    let first = ws.next().await.unwrap().unwrap();
    assert_eq!(first.into_text().unwrap().as_str(), TOKEN);
    ws
}

async fn send_json(ws: &mut ServerWs, value: Value) {
    ws.send(Message::text(value.to_string())).await.unwrap();
}

/// Read frames until a JSON text message arrives, then decode it.
async fn recv_json(ws: &mut ServerWs) -> Value {
    loop {
        match ws.next().await.unwrap().unwrap() {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            _ => continue,
        }
    }
}

/// Send a ping and wait for the matching pong, proving the client has
/// dispatched everything sent before it.
async fn ping_barrier(ws: &mut ServerWs, marker: i64) {
    send_json(ws, json!({ "type": "ping", "timestamp": marker })).await;
    loop {
        let reply = recv_json(ws).await;
        if reply["type"] == "pong" {
            assert_eq!(reply["timestamp"], marker);
            return;
        }
    }
}

/// Poll `condition` until it holds or the deadline passes.
fn wait_until(condition: impl Fn() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}

// ============================================================================
// Session handshake
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn token_is_the_first_frame_of_a_session() {
    let (listener, url) = bind().await;
    let manager = manager_for(&url, 16);
    manager.start().unwrap();

    // accept_session asserts the token frame itself.
    let server = tokio::spawn(async move { accept_session(&listener).await });
    let _ws = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();

    assert!(wait_until(|| manager.is_connected(), Duration::from_secs(5)));
    manager.stop();
}

// ============================================================================
// Ping handling
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ping_is_answered_and_hidden_from_the_consumer() {
    let (listener, url) = bind().await;
    let manager = manager_for(&url, 16);
    manager.start().unwrap();

    let server = tokio::spawn(async move {
        let mut ws = accept_session(&listener).await;
        ping_barrier(&mut ws, 42).await;
        ws
    });
    let _ws = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();

    // The probe was answered on the network side; the consumer sees nothing.
    assert_eq!(manager.next_message(), None);
    manager.stop();
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn incomplete_join_is_dropped_and_complete_join_delivered() {
    let (listener, url) = bind().await;
    let manager = manager_for(&url, 16);
    manager.start().unwrap();

    let server = tokio::spawn(async move {
        let mut ws = accept_session(&listener).await;
        send_json(&mut ws, json!({ "type": "lobby_action", "action": "join" })).await;
        send_json(
            &mut ws,
            json!({
                "type": "lobby_action",
                "action": "join",
                "lobbyName": "c1721",
                "password": "ky1w"
            }),
        )
        .await;
        ping_barrier(&mut ws, 1).await;
        ws
    });
    let _ws = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();

    let delivered = manager.next_message().unwrap();
    assert_eq!(delivered["action"], "join");
    assert_eq!(delivered["lobbyName"], "c1721");
    assert_eq!(manager.next_message(), None);
    manager.stop();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn undecodable_frame_does_not_kill_the_connection() {
    let (listener, url) = bind().await;
    let manager = manager_for(&url, 16);
    manager.start().unwrap();

    let server = tokio::spawn(async move {
        let mut ws = accept_session(&listener).await;
        ws.send(Message::text("this is not json {{")).await.unwrap();
        send_json(&mut ws, json!({ "type": "note", "n": 1 })).await;
        ping_barrier(&mut ws, 2).await;
        ws
    });
    let _ws = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();

    // The garbage frame was discarded; the session survived to deliver the
    // following message and answer the ping.
    assert_eq!(manager.next_message(), Some(json!({ "type": "note", "n": 1 })));
    assert!(manager.is_connected());
    manager.stop();
}

// ============================================================================
// Reconnect
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reconnect_waits_the_delay_and_resends_the_token() {
    let (listener, url) = bind().await;
    let manager = manager_for(&url, 16);
    manager.start().unwrap();

    let server = tokio::spawn(async move {
        let ws = accept_session(&listener).await;
        let dropped_at = Instant::now();
        drop(ws);

        // accept_session asserts that the new session leads with the token.
        let ws = accept_session(&listener).await;
        (dropped_at.elapsed(), ws)
    });
    let (elapsed, _ws) = tokio::time::timeout(Duration::from_secs(10), server)
        .await
        .unwrap()
        .unwrap();

    // One full reconnect delay must pass before the new session (300 ms
    // configured, with a little slack for timer coarseness).
    assert!(
        elapsed >= Duration::from_millis(250),
        "reconnected after {elapsed:?}, before the reconnect delay"
    );
    assert!(wait_until(|| manager.is_connected(), Duration::from_secs(5)));
    manager.stop();
}

// ============================================================================
// Queue overflow
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn overflowing_the_queue_keeps_the_oldest_messages() {
    let (listener, url) = bind().await;
    let manager = manager_for(&url, 3);
    manager.start().unwrap();

    let server = tokio::spawn(async move {
        let mut ws = accept_session(&listener).await;
        for n in 0..5 {
            send_json(&mut ws, json!({ "type": "note", "n": n })).await;
        }
        ping_barrier(&mut ws, 3).await;
        ws
    });
    let _ws = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(manager.queue_len(), 3);
    for n in 0..3 {
        assert_eq!(
            manager.next_message(),
            Some(json!({ "type": "note", "n": n }))
        );
    }
    assert_eq!(manager.next_message(), None);
    manager.stop();
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_twice_then_start_again() {
    let (listener, url) = bind().await;
    let manager = manager_for(&url, 16);

    let (session_up, first_session) = tokio::sync::oneshot::channel();
    let server = tokio::spawn(async move {
        let mut ws = accept_session(&listener).await;
        session_up.send(()).unwrap();
        // Hold the session until the client closes it (on stop), so the
        // second accept can only match the restarted client.
        while let Some(Ok(_)) = ws.next().await {}
        accept_session(&listener).await
    });

    manager.start().unwrap();
    first_session.await.unwrap();
    assert!(wait_until(|| manager.is_connected(), Duration::from_secs(5)));

    manager.stop();
    manager.stop();
    assert!(!manager.is_connected());

    manager.start().unwrap();
    // accept_session asserts the restarted session leads with the token.
    let _ws = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();
    assert!(wait_until(|| manager.is_connected(), Duration::from_secs(5)));
    manager.stop();
}
