//! Inbound message validation and protocol control messages.
//!
//! Wire messages are JSON objects carrying at least a `"type"` string that
//! routes handling. Known types enforce minimum required companion fields;
//! unknown types pass through untouched so newer servers keep working with
//! older clients.

use serde_json::{Value, json};
use thiserror::Error;

/// Liveness probe, answered by the manager without consumer involvement.
pub const TYPE_PING: &str = "ping";

/// Reply to a liveness probe.
pub const TYPE_PONG: &str = "pong";

/// Result of the session authentication handshake.
pub const TYPE_AUTH_RESPONSE: &str = "auth_response";

/// A lobby instruction (join/create/...).
pub const TYPE_LOBBY_ACTION: &str = "lobby_action";

/// The lobby action that requires lobby credentials.
pub const ACTION_JOIN: &str = "join";

/// Reasons a well-formed JSON value is rejected before reaching the consumer.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ValidationError {
    #[error("message is not a JSON object")]
    NotAnObject,
    #[error("message missing 'type' field")]
    MissingType,
    #[error("message 'type' is not a string")]
    NonStringType,
    #[error("lobby_action message missing 'action' field")]
    MissingAction,
    #[error("join action missing required fields (lobbyName, password)")]
    IncompleteJoin,
    #[error("auth_response message missing boolean 'success' field")]
    MissingSuccess,
}

/// The message's `"type"` discriminator, if present.
pub fn message_type(message: &Value) -> Option<&str> {
    message.get("type").and_then(Value::as_str)
}

/// Check that a decoded message has the minimum shape its type requires.
///
/// Unknown types are accepted: validation guards the fields this layer and
/// its consumers rely on, not the whole protocol.
pub fn validate(message: &Value) -> Result<(), ValidationError> {
    if !message.is_object() {
        return Err(ValidationError::NotAnObject);
    }
    let message_type = match message.get("type") {
        None => return Err(ValidationError::MissingType),
        Some(value) => value.as_str().ok_or(ValidationError::NonStringType)?,
    };

    match message_type {
        TYPE_LOBBY_ACTION => {
            let action = message
                .get("action")
                .and_then(Value::as_str)
                .ok_or(ValidationError::MissingAction)?;
            if action == ACTION_JOIN
                && (message.get("lobbyName").is_none() || message.get("password").is_none())
            {
                return Err(ValidationError::IncompleteJoin);
            }
        }
        TYPE_AUTH_RESPONSE => {
            if message.get("success").and_then(Value::as_bool).is_none() {
                return Err(ValidationError::MissingSuccess);
            }
        }
        TYPE_PING => {}
        other => {
            log::debug!("passing through unknown message type: {other}");
        }
    }

    Ok(())
}

/// Build the reply to a liveness probe, echoing its timestamp if present.
pub fn pong_for(ping: &Value) -> Value {
    match ping.get("timestamp") {
        Some(timestamp) => json!({ "type": TYPE_PONG, "timestamp": timestamp }),
        None => json!({ "type": TYPE_PONG }),
    }
}

/// Log the outcome of the authentication handshake.
///
/// The message is still delivered to the consumer; this is observability
/// only. Callers must have validated the message first.
pub fn log_auth_result(message: &Value) {
    match message.get("success").and_then(Value::as_bool) {
        Some(true) => log::info!("server authentication successful"),
        _ => {
            let error = message
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            log::warn!("server authentication failed: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // === Shape validation ===

    #[test]
    fn non_object_rejected() {
        assert_eq!(validate(&json!([1, 2, 3])), Err(ValidationError::NotAnObject));
        assert_eq!(validate(&json!("ping")), Err(ValidationError::NotAnObject));
        assert_eq!(validate(&json!(42)), Err(ValidationError::NotAnObject));
    }

    #[test]
    fn missing_type_rejected() {
        assert_eq!(
            validate(&json!({ "action": "join" })),
            Err(ValidationError::MissingType)
        );
    }

    #[test]
    fn non_string_type_rejected() {
        assert_eq!(
            validate(&json!({ "type": 7 })),
            Err(ValidationError::NonStringType)
        );
    }

    #[test]
    fn unknown_type_accepted() {
        assert_eq!(validate(&json!({ "type": "match_found", "id": 9 })), Ok(()));
    }

    // === lobby_action ===

    #[test]
    fn lobby_action_requires_action() {
        assert_eq!(
            validate(&json!({ "type": "lobby_action" })),
            Err(ValidationError::MissingAction)
        );
    }

    #[test]
    fn join_requires_lobby_credentials() {
        assert_eq!(
            validate(&json!({ "type": "lobby_action", "action": "join" })),
            Err(ValidationError::IncompleteJoin)
        );
        assert_eq!(
            validate(&json!({
                "type": "lobby_action",
                "action": "join",
                "lobbyName": "c1721"
            })),
            Err(ValidationError::IncompleteJoin)
        );
        assert_eq!(
            validate(&json!({
                "type": "lobby_action",
                "action": "join",
                "lobbyName": "c1721",
                "password": "ky1w"
            })),
            Ok(())
        );
    }

    #[test]
    fn create_needs_no_credentials() {
        assert_eq!(
            validate(&json!({ "type": "lobby_action", "action": "create" })),
            Ok(())
        );
    }

    // === auth_response ===

    #[test]
    fn auth_response_requires_boolean_success() {
        assert_eq!(
            validate(&json!({ "type": "auth_response" })),
            Err(ValidationError::MissingSuccess)
        );
        assert_eq!(
            validate(&json!({ "type": "auth_response", "success": "yes" })),
            Err(ValidationError::MissingSuccess)
        );
        assert_eq!(
            validate(&json!({ "type": "auth_response", "success": false })),
            Ok(())
        );
    }

    // === ping/pong ===

    #[test]
    fn ping_is_always_valid() {
        assert_eq!(validate(&json!({ "type": "ping" })), Ok(()));
        assert_eq!(validate(&json!({ "type": "ping", "timestamp": 42 })), Ok(()));
    }

    #[test]
    fn pong_echoes_timestamp() {
        let pong = pong_for(&json!({ "type": "ping", "timestamp": 42 }));
        assert_eq!(pong, json!({ "type": "pong", "timestamp": 42 }));
    }

    #[test]
    fn pong_omits_absent_timestamp() {
        let pong = pong_for(&json!({ "type": "ping" }));
        assert_eq!(pong, json!({ "type": "pong" }));
    }

    #[test]
    fn message_type_reads_discriminator() {
        assert_eq!(message_type(&json!({ "type": "ping" })), Some("ping"));
        assert_eq!(message_type(&json!({ "type": 1 })), None);
        assert_eq!(message_type(&json!({})), None);
    }
}
