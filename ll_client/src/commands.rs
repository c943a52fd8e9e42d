//! Interactive command parsing and outbound command types.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// Errors that can occur during command parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Join command missing lobby name or password.
    MissingJoinArguments,
    /// The payload of a `send` command was not valid JSON.
    InvalidJson(String),
    /// Unrecognized command.
    UnrecognizedCommand(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingJoinArguments => {
                write!(f, "Join requires a lobby and a password (e.g., 'join c1721 ky1w')")
            }
            Self::InvalidJson(reason) => {
                write!(f, "Invalid JSON payload: {reason}")
            }
            Self::UnrecognizedCommand(cmd) => write!(
                f,
                "Unrecognized command '{cmd}'. Type 'help' to see available commands"
            ),
        }
    }
}

impl std::error::Error for ParseError {}

/// A parsed interactive command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Ask the server to join a lobby.
    Join { lobby_name: String, password: String },
    /// Ask the server to create a lobby.
    Create,
    /// Send a raw JSON payload.
    Send(Value),
    /// Print connection status and queue depth.
    Status,
    /// Discard all buffered messages.
    Clear,
    /// Print the command list.
    Help,
    /// Leave the client.
    Quit,
}

/// An outbound wire command.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundCommand {
    LobbyAction {
        action: &'static str,
        #[serde(rename = "lobbyName", skip_serializing_if = "Option::is_none")]
        lobby_name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        password: Option<String>,
    },
}

impl OutboundCommand {
    /// A join request carrying lobby credentials.
    pub fn join(lobby_name: String, password: String) -> Self {
        Self::LobbyAction {
            action: "join",
            lobby_name: Some(lobby_name),
            password: Some(password),
        }
    }

    /// A lobby creation request.
    pub fn create() -> Self {
        Self::LobbyAction {
            action: "create",
            lobby_name: None,
            password: None,
        }
    }
}

/// Parse a command string typed at the prompt.
///
/// # Examples
///
/// ```
/// use ll_client::commands::{Command, parse_command};
///
/// assert!(matches!(parse_command("create"), Ok(Command::Create)));
/// assert!(matches!(parse_command("quit"), Ok(Command::Quit)));
/// assert!(matches!(parse_command("join c1721 ky1w"), Ok(Command::Join { .. })));
/// ```
pub fn parse_command(input: &str) -> Result<Command, ParseError> {
    let trimmed = input.trim();

    match trimmed {
        "create" => return Ok(Command::Create),
        "status" => return Ok(Command::Status),
        "clear" => return Ok(Command::Clear),
        "help" | "?" => return Ok(Command::Help),
        "quit" | "exit" => return Ok(Command::Quit),
        _ => {}
    }

    let parts: Vec<&str> = trimmed.split_ascii_whitespace().collect();
    match parts.first() {
        Some(&"join") => parse_join_command(&parts),
        Some(&"send") => parse_send_command(trimmed),
        _ => Err(ParseError::UnrecognizedCommand(trimmed.to_string())),
    }
}

/// Parse a join command: "join LOBBY PASSWORD"
fn parse_join_command(parts: &[&str]) -> Result<Command, ParseError> {
    match (parts.get(1), parts.get(2)) {
        (Some(lobby_name), Some(password)) => Ok(Command::Join {
            lobby_name: (*lobby_name).to_string(),
            password: (*password).to_string(),
        }),
        _ => Err(ParseError::MissingJoinArguments),
    }
}

/// Parse a send command: "send RAW_JSON"
fn parse_send_command(input: &str) -> Result<Command, ParseError> {
    let payload = input.strip_prefix("send").unwrap_or(input).trim();
    serde_json::from_str(payload)
        .map(Command::Send)
        .map_err(|e| ParseError::InvalidJson(e.to_string()))
}
