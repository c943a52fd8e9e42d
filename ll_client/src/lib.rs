//! Library surface of the lobby terminal client, exposed for tests.

/// Interactive command parsing and outbound command types.
pub mod commands;

/// Duplicate-suppression for join requests.
pub mod join_guard;
