//! One-shot event — a single-slot exchange consumed at most once.
//!
//! `fire` fills the slot (replacing a value nobody consumed yet) and wakes
//! a waiter; `take` / `recv` empty it. A second consumer after the first
//! observes nothing until the next `fire`.

use std::fmt;
use std::sync::Mutex;

use tokio::sync::Notify;

/// A fire-once notification slot.
pub struct OneShotEvent<T> {
    slot: Mutex<Option<T>>, // None = consumed or never fired
    fired: Notify,
}

impl<T> fmt::Debug for OneShotEvent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneShotEvent")
            .field("pending", &self.is_pending())
            .finish()
    }
}

impl<T> Default for OneShotEvent<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> OneShotEvent<T> {
    /// Create an event with nothing pending.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            fired: Notify::new(),
        }
    }

    /// Store `value` for the next consumer and wake one waiter.
    pub fn fire(&self, value: T) {
        *self.slot.lock().unwrap() = Some(value);
        self.fired.notify_one();
    }

    /// Consume the pending value, if any.
    pub fn take(&self) -> Option<T> {
        self.slot.lock().unwrap().take()
    }

    /// Check if a fired value is waiting to be consumed.
    pub fn is_pending(&self) -> bool {
        self.slot.lock().unwrap().is_some()
    }

    /// Wait for the next fired value and consume it.
    pub async fn recv(&self) -> T {
        loop {
            // Register before checking the slot to avoid a lost wakeup.
            let notified = self.fired.notified();
            if let Some(v) = self.take() {
                return v;
            }
            notified.await;
        }
    }
}
