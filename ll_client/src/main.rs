//! A terminal client for a lobby relay server.
//!
//! Connects with a verification token, prints server messages as they
//! arrive, and sends lobby commands typed on stdin.

use std::io::{self, BufRead};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use lobby_link::{ClientConfig, NetworkManager};
use pico_args::Arguments;
use serde_json::Value;

use ll_client::commands::{self, Command, OutboundCommand};
use ll_client::join_guard::JoinGuard;

const HELP: &str = "\
Connect to a lobby relay server

USAGE:
  ll_client [OPTIONS]

OPTIONS:
  --server URL          Server URL  [default: ws://127.0.0.1:8080/]
  --token TOKEN         Verification token sent at session start
  --reconnect-ms N      Delay between reconnect attempts in milliseconds
  --queue-capacity N    Inbound message buffer capacity

FLAGS:
  -h, --help            Print help information
";

const COMMANDS_HELP: &str = "\
Available commands:
  join LOBBY PASSWORD   Request joining a lobby
  create                Request creating a lobby
  send RAW_JSON         Send a raw JSON payload
  status                Show connection status and queue depth
  clear                 Discard all buffered messages
  help                  Show this list
  quit                  Leave the client
";

/// Upper bound on messages processed per tick so a burst cannot stall
/// input handling.
const MAX_MESSAGES_PER_TICK: usize = 5;

/// How long one tick waits for input before draining messages again.
const TICK: Duration = Duration::from_millis(100);

/// How long a join attempt suppresses duplicates.
const JOIN_COOLDOWN: Duration = Duration::from_secs(1);

fn main() -> Result<()> {
    env_logger::builder().format_target(false).init();

    let mut pargs = Arguments::from_env();
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }

    let config = ClientConfig::from_env(
        pargs.opt_value_from_str("--server")?,
        pargs.opt_value_from_str("--token")?,
        pargs.opt_value_from_str("--reconnect-ms")?,
        pargs.opt_value_from_str("--queue-capacity")?,
    )
    .context("invalid configuration")?;

    run(config)
}

fn run(config: ClientConfig) -> Result<()> {
    println!("Connecting to {} ...", config.url);
    let manager = NetworkManager::new(config);
    manager.start().context("failed to start the network manager")?;

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))
            .context("failed to install the shutdown handler")?;
    }

    let input = spawn_stdin_reader();
    let mut join_guard = JoinGuard::new(JOIN_COOLDOWN);

    println!("Type 'help' for available commands.");
    while running.load(Ordering::SeqCst) {
        for _ in 0..MAX_MESSAGES_PER_TICK {
            match manager.next_message() {
                Some(message) => handle_server_message(&message, &mut join_guard),
                None => break,
            }
        }

        match input.recv_timeout(TICK) {
            Ok(line) => {
                if !handle_line(&manager, &mut join_guard, line.trim())? {
                    break;
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    println!("Disconnecting...");
    manager.stop();
    Ok(())
}

/// Forward stdin lines onto a channel so the main loop can poll them
/// alongside network messages.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
    rx
}

/// Act on one message pulled from the queue.
fn handle_server_message(message: &Value, join_guard: &mut JoinGuard) {
    match message.get("type").and_then(Value::as_str) {
        Some("lobby_action") => match message.get("action").and_then(Value::as_str) {
            Some("join") => {
                // Validation guarantees the credentials are present.
                let lobby = message
                    .get("lobbyName")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                if join_guard.begin() {
                    println!("Server requests joining lobby '{lobby}'");
                } else {
                    println!("Ignoring duplicate join request for lobby '{lobby}'");
                }
            }
            Some("create") => println!("Server requests creating a lobby"),
            action => println!("Unhandled lobby action: {action:?}"),
        },
        Some("auth_response") => {
            if message.get("success").and_then(Value::as_bool) == Some(true) {
                println!("Authenticated with the server");
            } else {
                let error = message
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error");
                println!("Authentication failed: {error}");
            }
        }
        _ => println!("<- {message}"),
    }
}

/// Act on one line typed at the prompt. Returns `false` to leave the loop.
fn handle_line(
    manager: &NetworkManager,
    join_guard: &mut JoinGuard,
    line: &str,
) -> Result<bool> {
    if line.is_empty() {
        return Ok(true);
    }

    let command = match commands::parse_command(line) {
        Ok(command) => command,
        Err(e) => {
            println!("{e}");
            return Ok(true);
        }
    };

    match command {
        Command::Quit => return Ok(false),
        Command::Help => print!("{COMMANDS_HELP}"),
        Command::Status => println!(
            "Connected: {} | buffered messages: {}",
            manager.is_connected(),
            manager.queue_len()
        ),
        Command::Clear => {
            manager.clear_queue();
            println!("Queue cleared");
        }
        Command::Create => send_command(manager, &OutboundCommand::create())?,
        Command::Join {
            lobby_name,
            password,
        } => {
            if join_guard.begin() {
                send_command(manager, &OutboundCommand::join(lobby_name, password))?;
            } else {
                println!("A join attempt is already in progress");
            }
        }
        Command::Send(value) => send_value(manager, &value),
    }
    Ok(true)
}

fn send_command(manager: &NetworkManager, command: &OutboundCommand) -> Result<()> {
    let value = serde_json::to_value(command).context("failed to encode command")?;
    send_value(manager, &value);
    Ok(())
}

fn send_value(manager: &NetworkManager, value: &Value) {
    match manager.send(value) {
        Ok(()) => println!("-> {value}"),
        Err(e) => println!("Cannot send: {e}"),
    }
}
