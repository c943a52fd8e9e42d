//! Duplicate-suppression for join requests.
//!
//! Joining a lobby takes a moment to go through; firing a second request
//! while one is pending tends to end with the matchmaking backend rejecting
//! both. The guard accepts one attempt per cooldown window and is owned by
//! whichever component issues join requests.

use std::time::{Duration, Instant};

/// Tracks whether a join attempt is currently in flight.
#[derive(Debug)]
pub struct JoinGuard {
    cooldown: Duration,
    last_attempt: Option<Instant>,
}

impl JoinGuard {
    /// Create a guard that considers an attempt in flight for `cooldown`.
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_attempt: None,
        }
    }

    /// Try to begin a join attempt.
    ///
    /// Returns `false` when a previous attempt is still within its cooldown
    /// window; otherwise records the attempt and returns `true`.
    pub fn begin(&mut self) -> bool {
        if self.in_progress() {
            return false;
        }
        self.last_attempt = Some(Instant::now());
        true
    }

    /// Whether an attempt is currently considered in flight.
    pub fn in_progress(&self) -> bool {
        self.last_attempt
            .is_some_and(|at| at.elapsed() < self.cooldown)
    }

    /// Forget the current attempt, allowing an immediate retry.
    pub fn reset(&mut self) {
        self.last_attempt = None;
    }
}
