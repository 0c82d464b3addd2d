//! Pending-request bookkeeping and request timer rules.

use std::collections::HashMap;
use std::sync::Weak;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};
use tracing::{trace, warn};

use super::callback::{Event, ReplyCallback, guarded};
use super::{Connection, Inner};
use crate::config::{Config, options};
use crate::message::Message;
use crate::utils::{Status, StatusClass, StatusCode};

/// Block until a reply arrives.
pub const WAIT_FOREVER: i64 = -1;
/// Do not block.
pub const NO_WAIT: i64 = 0;
/// Never republish a request.
pub const REQUEST_REPUBLISH_NEVER: i64 = -1;

const MIN_TIMEOUT_MS: i64 = 10;
const MIN_REPUBLISH_MS: i64 = 100;
const DEFAULT_REPUBLISH_MS: i64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Pending,
    Replied,
    TimedOut,
    Cancelled,
}

pub(crate) enum Delivery {
    Reply { reply: Message, last: bool },
    Cancelled,
}

pub(crate) enum ReplySink {
    Blocking(oneshot::Sender<Message>),
    Callback(mpsc::UnboundedSender<Delivery>),
}

pub(crate) struct PendingRequest {
    pub(crate) sent_at: Instant,
    pub(crate) multi_response: bool,
    pub(crate) replies: usize,
    sink: ReplySink,
}

impl PendingRequest {
    pub(crate) fn new(sink: ReplySink, multi_response: bool) -> Self {
        Self {
            sent_at: Instant::now(),
            multi_response,
            replies: 0,
            sink,
        }
    }
}

/// Requests awaiting replies, keyed by correlation ID.
#[derive(Default)]
pub(crate) struct RequestTable {
    pending: HashMap<String, PendingRequest>,
}

impl RequestTable {
    pub(crate) fn insert(&mut self, id: String, request: PendingRequest) {
        self.pending.insert(id, request);
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<PendingRequest> {
        self.pending.remove(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    /// Hands a reply to the request with `id`. Returns `None` for an
    /// unknown (finished or never issued) request, otherwise the state the
    /// request is left in.
    ///
    /// A blocking requester is done after its first reply. A callback
    /// requester with multi-response enabled stays pending while replies
    /// carry a non-terminal response status.
    pub(crate) fn deliver(&mut self, id: &str, reply: Message) -> Option<RequestState> {
        let pending = self.pending.get_mut(id)?;
        pending.replies += 1;

        let keep = match pending.sink {
            ReplySink::Blocking(_) => false,
            ReplySink::Callback(_) => {
                pending.multi_response
                    && reply.response_status().is_some_and(|status| !status.is_terminal())
            }
        };

        if keep {
            if let ReplySink::Callback(tx) = &pending.sink {
                let _ = tx.send(Delivery::Reply { reply, last: false });
            }
            return Some(RequestState::Pending);
        }

        let pending = self.pending.remove(id)?;
        trace!(
            "Request {} finished after {} replies in {:?}",
            id,
            pending.replies,
            pending.sent_at.elapsed()
        );
        match pending.sink {
            ReplySink::Blocking(tx) => {
                let _ = tx.send(reply);
            }
            ReplySink::Callback(tx) => {
                let _ = tx.send(Delivery::Reply { reply, last: true });
            }
        }
        Some(RequestState::Replied)
    }

    /// Cancels every pending request. Blocking requesters see their reply
    /// channel close; callback requesters get a `Cancelled` delivery.
    pub(crate) fn cancel_all(&mut self) -> usize {
        let count = self.pending.len();
        for (_, pending) in self.pending.drain() {
            if let ReplySink::Callback(tx) = pending.sink {
                let _ = tx.send(Delivery::Cancelled);
            }
        }
        count
    }
}

/// Overall request timeout. Negative values wait forever; anything below
/// the 10 ms minimum, `NO_WAIT` included, is raised to it.
pub(crate) fn timeout_duration(timeout_ms: i64) -> Option<Duration> {
    if timeout_ms < 0 {
        return None;
    }
    Some(Duration::from_millis(timeout_ms.max(MIN_TIMEOUT_MS) as u64))
}

/// Republish interval. Negative values never republish; `0` takes
/// `MW-REPUBLISH-MS` from the config (60 s when unset); the result is at
/// least 100 ms.
pub(crate) fn republish_duration(republish_ms: i64, config: &Config) -> Option<Duration> {
    let ms = match republish_ms {
        r if r < 0 => return None,
        0 => config.get_integer_value_or(options::REPUBLISH_MS, DEFAULT_REPUBLISH_MS),
        r => r,
    };
    if ms < 0 {
        return None;
    }
    Some(Duration::from_millis(ms.max(MIN_REPUBLISH_MS) as u64))
}

/// Sleeps until `deadline`, or forever when there is none.
pub(crate) async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// An asynchronous request in flight, driven by its own task.
pub(crate) struct AsyncRequest {
    pub(crate) id: String,
    pub(crate) original: Message,
    pub(crate) outgoing: Message,
    pub(crate) timeout: Option<Duration>,
    pub(crate) republish: Option<Duration>,
    pub(crate) callback: ReplyCallback,
}

impl AsyncRequest {
    pub(crate) async fn run(
        self,
        weak: Weak<Inner>,
        mut deliveries: mpsc::UnboundedReceiver<Delivery>,
    ) {
        let deadline = self.timeout.map(|t| Instant::now() + t);
        let mut next_republish = self.republish.map(|r| Instant::now() + r);

        loop {
            tokio::select! {
                biased;
                delivery = deliveries.recv() => {
                    let Some(conn) = Connection::upgrade(&weak) else { break };
                    match delivery {
                        Some(Delivery::Reply { reply, last }) => {
                            let on_reply = &self.callback.on_reply;
                            if !guarded(|| on_reply(&conn, &self.original, &reply)) {
                                warn!("Reply callback for {} panicked", self.id);
                            }
                            if last {
                                break;
                            }
                        }
                        Some(Delivery::Cancelled) | None => {
                            let status = Status::new(
                                StatusClass::Request,
                                StatusCode::RequestCancelled,
                                format!("Request {} cancelled", self.id),
                            );
                            self.notify(&conn, &status);
                            break;
                        }
                    }
                }
                _ = sleep_until_opt(deadline) => {
                    let Some(conn) = Connection::upgrade(&weak) else { break };
                    conn.inner.shared.lock().requests.remove(&self.id);
                    let status = Status::new(
                        StatusClass::Request,
                        StatusCode::TimeoutOccurred,
                        format!("Request {} timed out", self.id),
                    );
                    self.notify(&conn, &status);
                    break;
                }
                _ = sleep_until_opt(next_republish) => {
                    let Some(conn) = Connection::upgrade(&weak) else { break };
                    conn.republish(&self.id, &self.outgoing);
                    next_republish = self.republish.map(|r| Instant::now() + r);
                }
            }
        }
    }

    fn notify(&self, conn: &Connection, status: &Status) {
        let on_event = &self.callback.on_event;
        if !guarded(|| on_event(conn, status, Event::RequestTimeout)) {
            warn!("Request event callback for {} panicked", self.id);
        }
    }
}
