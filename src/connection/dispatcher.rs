//! Inbound routing and the auto-dispatch task.

use std::sync::Weak;

use tokio::sync::{OwnedMutexGuard, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::callback::{Event, MessageCallback, guarded};
use super::{Connection, Inner};
use crate::broker::Envelope;
use crate::config::options;
use crate::message::{Message, MessageKind};
use crate::subject;
use crate::transport::{Inbound, Operation, TransportFault};
use crate::utils::{Status, StatusClass, StatusCode};

pub(crate) struct DispatcherHandle {
    pub(crate) stop: oneshot::Sender<()>,
    pub(crate) task: JoinHandle<()>,
}

/// Moves envelopes from the transport into the connection: replies to our
/// own requests go to the request table, everything else that passes the
/// exclusion filter and matches a subscription is queued. Transport
/// faults become events.
pub(crate) async fn pump(
    weak: Weak<Inner>,
    inbound: Inbound,
    queue: mpsc::UnboundedSender<Message>,
) {
    let Inbound {
        mut envelopes,
        mut faults,
    } = inbound;
    let mut faults_open = true;

    loop {
        tokio::select! {
            next = envelopes.recv() => {
                let Some(envelope) = next else { break };
                let Some(conn) = Connection::upgrade(&weak) else { break };
                if let Some(msg) = conn.accept(envelope) {
                    if queue.send(msg).is_err() {
                        trace!("Inbound queue closed");
                    }
                }
            }
            fault = faults.recv(), if faults_open => {
                let Some(fault) = fault else {
                    faults_open = false;
                    continue;
                };
                let Some(conn) = Connection::upgrade(&weak) else { break };
                conn.report_fault(fault);
            }
        }
    }

    if let Some(conn) = Connection::upgrade(&weak) {
        conn.transport_lost();
    }
}

/// Delivers queued messages to subscription callbacks until stopped.
/// Holds the inbox lock while running; `receive` resumes once it is
/// released.
pub(crate) async fn run(
    weak: Weak<Inner>,
    mut inbox: OwnedMutexGuard<Option<mpsc::UnboundedReceiver<Message>>>,
    mut stop: oneshot::Receiver<()>,
) {
    let Some(queue) = inbox.as_mut() else {
        return;
    };
    loop {
        tokio::select! {
            biased;
            _ = &mut stop => break,
            next = queue.recv() => {
                let Some(msg) = next else { break };
                let Some(conn) = Connection::upgrade(&weak) else { break };
                conn.dispatch_message(&msg);
            }
        }
    }
    debug!("Auto-dispatch stopped");
}

impl Connection {
    fn report_fault(&self, fault: TransportFault) {
        let (event, code, what) = match fault.operation {
            Some(Operation::Publish) => (Event::MsgPublishFailure, StatusCode::PublishFailed, "publish"),
            Some(Operation::Subscribe) => (Event::ConnectionException, StatusCode::OperationRejected, "subscribe"),
            Some(Operation::Unsubscribe) => (Event::ConnectionException, StatusCode::OperationRejected, "unsubscribe"),
            None => (Event::ConnectionException, StatusCode::OperationRejected, "frame"),
        };
        self.emit(
            event,
            &Status::new(
                StatusClass::Connection,
                code,
                format!("{} rejected {}: {}", self.mw_info(), what, fault.message),
            ),
        );
    }

    fn accept(&self, envelope: Envelope) -> Option<Message> {
        let mut msg = match Message::from_json(&envelope.payload) {
            Ok(msg) => msg,
            Err(e) => {
                self.emit(
                    Event::InvalidMessage,
                    &Status::new(
                        StatusClass::Message,
                        StatusCode::InvalidMessage,
                        format!("Undecodable message on {}: {}", envelope.subject, e),
                    ),
                );
                return None;
            }
        };
        if msg.subject().is_empty() {
            msg.set_subject_unchecked(envelope.subject);
        }
        self.inner.factory.attach_schema(&mut msg);

        if msg.kind() == MessageKind::Reply {
            if let Some(id) = self.inner.correlation.extract(&msg) {
                if id.starts_with(self.inner.id.as_str()) {
                    self.route_reply(&id, msg);
                    return None;
                }
            }
        }

        let shared = self.inner.shared.lock();
        if shared
            .excluded
            .iter()
            .any(|pattern| subject::matches(msg.subject(), pattern))
        {
            trace!("Excluded {}", msg.subject());
            return None;
        }
        if !shared
            .subscriptions
            .iter()
            .any(|s| subject::matches(msg.subject(), &s.pattern))
        {
            trace!("No subscription for {}", msg.subject());
            return None;
        }
        drop(shared);

        if self.validates(options::MSG_CONTENT_VALIDATE_RECV) {
            let status = self.inner.factory.validate(&msg);
            if status.is_error() {
                self.emit(Event::InvalidMessage, &status);
                return None;
            }
        }
        Some(msg)
    }

    fn route_reply(&self, id: &str, mut reply: Message) {
        self.inner.correlation.strip(&mut reply);
        let state = self.inner.shared.lock().requests.deliver(id, reply);
        match state {
            Some(state) => trace!("Reply for {} left it {:?}", id, state),
            None => debug!("Dropping late reply for {}", id),
        }
    }

    /// Invokes the callbacks of every subscription matching the message, in
    /// subscription order, with the connection unlocked.
    pub(crate) fn dispatch_message(&self, msg: &Message) {
        let callbacks: Vec<MessageCallback> = self
            .inner
            .shared
            .lock()
            .subscriptions
            .iter()
            .filter(|s| subject::matches(msg.subject(), &s.pattern))
            .filter_map(|s| s.callback.clone())
            .collect();

        if callbacks.is_empty() {
            trace!("No callback for {}", msg.subject());
        }
        for callback in callbacks {
            if !guarded(|| callback(self, msg)) {
                warn!("Callback for {} panicked", msg.subject());
                self.emit(
                    Event::DispatcherError,
                    &Status::new(
                        StatusClass::Dispatcher,
                        StatusCode::CallbackFailed,
                        format!("Callback for {} panicked", msg.subject()),
                    ),
                );
            }
        }
    }
}
