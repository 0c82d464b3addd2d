use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use super::Connection;
use crate::message::Message;
use crate::utils::Status;

/// Conditions a connection reports through event callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// A message callback panicked.
    DispatcherError,
    /// A request got no (final) reply in time, or was cancelled.
    RequestTimeout,
    ConnectionSuccessful,
    /// The transport lost its bus while connected.
    ConnectionBroken,
    ConnectionException,
    /// A publish failed after the call had returned: republish, heartbeat,
    /// or a rejection reported by the middleware.
    MsgPublishFailure,
    /// An inbound message could not be decoded or failed validation.
    InvalidMessage,
    /// Catch-all registration for events without a specific callback.
    AllEvents,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

pub type MessageCallback = Arc<dyn Fn(&Connection, &Message) + Send + Sync>;

pub type EventCallback = Arc<dyn Fn(&Connection, &Status, Event) + Send + Sync>;

pub type ReplyHandler = Arc<dyn Fn(&Connection, &Message, &Message) + Send + Sync>;

/// Callbacks of an asynchronous request: `on_reply(conn, request, reply)`
/// for each reply and `on_event(conn, status, event)` when the request
/// times out or is cancelled.
#[derive(Clone)]
pub struct ReplyCallback {
    pub(crate) on_reply: ReplyHandler,
    pub(crate) on_event: EventCallback,
}

impl ReplyCallback {
    pub fn new<R, E>(on_reply: R, on_event: E) -> Self
    where
        R: Fn(&Connection, &Message, &Message) + Send + Sync + 'static,
        E: Fn(&Connection, &Status, Event) + Send + Sync + 'static,
    {
        Self {
            on_reply: Arc::new(on_reply),
            on_event: Arc::new(on_event),
        }
    }

    /// Replies only; timeouts are just logged.
    pub fn on_reply<R>(on_reply: R) -> Self
    where
        R: Fn(&Connection, &Message, &Message) + Send + Sync + 'static,
    {
        Self::new(on_reply, |_: &Connection, status: &Status, event: Event| {
            tracing::debug!("Unhandled {} for request: {}", event, status)
        })
    }
}

impl fmt::Debug for ReplyCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ReplyCallback")
    }
}

/// Runs user code, returning false if it panicked.
pub(crate) fn guarded(f: impl FnOnce()) -> bool {
    catch_unwind(AssertUnwindSafe(f)).is_ok()
}
