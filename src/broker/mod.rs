//! The `broker` module is the in-process message bus.
//!
//! A `Broker` keeps the registered bus clients and the subscription
//! patterns each of them holds, and fans published envelopes out to every
//! client with a matching pattern. It is shared behind a `Bus` handle by the
//! loopback transport and the WebSocket server alike.

pub mod engine;
pub mod message;
pub mod topic;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use engine::Broker;
pub use message::Envelope;

/// A clonable handle to a shared `Broker`.
#[derive(Debug, Clone, Default)]
pub struct Bus {
    inner: Arc<Mutex<Broker>>,
}

impl Bus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_broker(broker: Broker) -> Self {
        Self {
            inner: Arc::new(Mutex::new(broker)),
        }
    }

    /// Locks the broker. A panic while the lock was held does not leave the
    /// broker unusable; its maps are still consistent after any single call.
    pub fn lock(&self) -> MutexGuard<'_, Broker> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests;
