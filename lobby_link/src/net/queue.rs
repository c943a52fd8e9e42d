//! A bounded thread-safe FIFO for decoded messages.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// A fixed-capacity FIFO that is safe to share between a producer and a
/// consumer thread (and safe with many of either).
///
/// Pushing to a full queue fails without blocking; the caller decides whether
/// to log or drop. Popping never blocks unless the timed variant is used.
pub struct MessageQueue<T> {
    items: Mutex<VecDeque<T>>,
    available: Condvar,
    capacity: usize,
}

impl<T> MessageQueue<T> {
    /// Create a queue holding at most `capacity` items.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            available: Condvar::new(),
            capacity,
        }
    }

    /// Push an item, returning `false` (and discarding nothing held inside
    /// the queue) when the queue is already at capacity.
    ///
    /// Wakes one waiter blocked in [`MessageQueue::wait_for_pop`].
    pub fn push(&self, item: T) -> bool {
        let mut items = self.items.lock().expect("queue mutex poisoned");
        if items.len() >= self.capacity {
            return false;
        }
        items.push_back(item);
        self.available.notify_one();
        true
    }

    /// Remove and return the oldest item, or `None` when empty. Never blocks.
    pub fn try_pop(&self) -> Option<T> {
        self.items
            .lock()
            .expect("queue mutex poisoned")
            .pop_front()
    }

    /// Remove and return the oldest item, waiting up to `timeout` for one to
    /// arrive. Returns `None` when the timeout elapses first.
    pub fn wait_for_pop(&self, timeout: Duration) -> Option<T> {
        let items = self.items.lock().expect("queue mutex poisoned");
        let (mut items, _result) = self
            .available
            .wait_timeout_while(items, timeout, |items| items.is_empty())
            .expect("queue mutex poisoned");
        items.pop_front()
    }

    /// Number of buffered items.
    pub fn len(&self) -> usize {
        self.items.lock().expect("queue mutex poisoned").len()
    }

    /// Whether the queue is currently empty.
    pub fn is_empty(&self) -> bool {
        self.items.lock().expect("queue mutex poisoned").is_empty()
    }

    /// Atomically discard all buffered items.
    pub fn clear(&self) {
        self.items.lock().expect("queue mutex poisoned").clear();
    }
}
