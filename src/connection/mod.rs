//! The `connection` module is the client side of the API.
//!
//! A `Connection` binds a `Transport` and offers publish/subscribe,
//! synchronous and asynchronous request/reply, pull-mode `receive` and a
//! push-mode auto-dispatcher.
//!
//! Inbound envelopes are decoded by a pump task started on `connect`,
//! which also turns faults the middleware reports into events.
//! Replies to this connection's own requests go straight to the pending
//! request table; everything else that passes the exclusion filter and
//! matches a subscription is queued for `receive` or the auto-dispatcher.
//!
//! `Connection` is a cheap handle (`Clone + Send + Sync`). All mutable
//! state sits behind one lock that is never held while user callbacks run,
//! so callbacks may freely call back into the connection.

pub mod callback;
pub mod correlation;
mod dispatcher;
pub mod request;
pub mod subscription;
pub mod tracking;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::broker::{Bus, Envelope};
use crate::config::{Config, options};
use crate::message::{Message, MessageKind};
use crate::specification::MessageFactory;
use crate::subject;
use crate::transport::{LoopbackTransport, Transport, WebSocketTransport};
use crate::utils::{GmsecError, Result, Status, StatusClass, StatusCode};

use dispatcher::DispatcherHandle;
use request::{
    AsyncRequest, PendingRequest, ReplySink, RequestTable, republish_duration, sleep_until_opt,
    timeout_duration,
};
use subscription::Subscription;
use tracking::Tracking;

pub use callback::{Event, EventCallback, MessageCallback, ReplyCallback};
pub use correlation::{CorrelationStrategy, FieldCorrelation, REPLY_UNIQUE_ID_FIELD};
pub use request::{NO_WAIT, REQUEST_REPUBLISH_NEVER, RequestState, WAIT_FOREVER};
pub use subscription::SubscriptionInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Created,
    Connected,
    /// Terminal; a disconnected connection cannot reconnect.
    Disconnected,
}

struct Shared {
    state: ConnectionState,
    name: String,
    subscriptions: Vec<Subscription>,
    next_subscription_id: u64,
    reply_subjects: HashSet<String>,
    excluded: Vec<String>,
    events: HashMap<Event, EventCallback>,
    requests: RequestTable,
}

pub(crate) struct Inner {
    id: String,
    config: Config,
    transport: Arc<dyn Transport>,
    factory: Arc<MessageFactory>,
    correlation: Arc<dyn CorrelationStrategy>,
    shared: Mutex<Shared>,
    inbox: Arc<tokio::sync::Mutex<Option<mpsc::UnboundedReceiver<Message>>>>,
    pump: Mutex<Option<JoinHandle<()>>>,
    dispatcher: Mutex<Option<DispatcherHandle>>,
    request_counter: AtomicU64,
    publish_counter: AtomicU64,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.get_mut().take() {
            pump.abort();
        }
        if let Some(dispatcher) = self.dispatcher.get_mut().take() {
            dispatcher.task.abort();
        }
    }
}

/// Assembles a `Connection` from a config and optional parts.
pub struct ConnectionBuilder {
    config: Config,
    transport: Option<Arc<dyn Transport>>,
    factory: Option<Arc<MessageFactory>>,
    correlation: Option<Arc<dyn CorrelationStrategy>>,
}

impl ConnectionBuilder {
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Uses a loopback transport on `bus`.
    pub fn bus(mut self, bus: &Bus) -> Self {
        self.transport = Some(Arc::new(LoopbackTransport::new(bus.clone(), &self.config)));
        self
    }

    pub fn message_factory(mut self, factory: Arc<MessageFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn correlation(mut self, correlation: Arc<dyn CorrelationStrategy>) -> Self {
        self.correlation = Some(correlation);
        self
    }

    pub fn build(self) -> Result<Connection> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => transport_from_config(&self.config)?,
        };
        let factory = match self.factory {
            Some(factory) => factory,
            None => Arc::new(MessageFactory::new(&self.config)?),
        };
        let correlation = self
            .correlation
            .unwrap_or_else(|| Arc::new(FieldCorrelation));

        let id = Uuid::new_v4().simple().to_string().to_uppercase();
        debug!("Created connection {} over {}", id, transport.mw_info());

        Ok(Connection {
            inner: Arc::new(Inner {
                shared: Mutex::new(Shared {
                    state: ConnectionState::Created,
                    name: id.clone(),
                    subscriptions: Vec::new(),
                    next_subscription_id: 1,
                    reply_subjects: HashSet::new(),
                    excluded: Vec::new(),
                    events: HashMap::new(),
                    requests: RequestTable::default(),
                }),
                id,
                config: self.config,
                transport,
                factory,
                correlation,
                inbox: Arc::new(tokio::sync::Mutex::new(None)),
                pump: Mutex::new(None),
                dispatcher: Mutex::new(None),
                request_counter: AtomicU64::new(0),
                publish_counter: AtomicU64::new(0),
            }),
        })
    }
}

fn transport_from_config(config: &Config) -> Result<Arc<dyn Transport>> {
    let mw_id = config
        .get_value(options::MW_ID)
        .ok_or_else(|| GmsecError::illegal_argument("Config has no mw-id"))?;

    match mw_id.to_ascii_lowercase().as_str() {
        "websocket" | "ws" => {
            let server = config.get_value(options::MW_SERVER).ok_or_else(|| {
                GmsecError::illegal_argument("mw-id=websocket requires mw-server")
            })?;
            Ok(Arc::new(WebSocketTransport::new(server)?))
        }
        "loopback" => Err(GmsecError::illegal_argument(
            "mw-id=loopback needs a bus; use Connection::with_bus",
        )),
        other => Err(GmsecError::illegal_argument(format!(
            "Unsupported middleware '{other}'"
        ))),
    }
}

#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

impl Connection {
    /// A connection over the middleware named by `mw-id`.
    pub fn new(config: &Config) -> Result<Self> {
        Self::builder(config).build()
    }

    /// A connection to an in-process bus.
    pub fn with_bus(config: &Config, bus: &Bus) -> Result<Self> {
        Self::builder(config).bus(bus).build()
    }

    pub fn with_transport(config: &Config, transport: Arc<dyn Transport>) -> Result<Self> {
        Self::builder(config).transport(transport).build()
    }

    pub fn builder(config: &Config) -> ConnectionBuilder {
        ConnectionBuilder {
            config: config.clone(),
            transport: None,
            factory: None,
            correlation: None,
        }
    }

    pub(crate) fn upgrade(weak: &Weak<Inner>) -> Option<Connection> {
        weak.upgrade().map(|inner| Connection { inner })
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn name(&self) -> String {
        self.inner.shared.lock().name.clone()
    }

    pub fn set_name(&self, name: &str) {
        self.inner.shared.lock().name = name.to_string();
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.shared.lock().state
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn message_factory(&self) -> &MessageFactory {
        &self.inner.factory
    }

    pub fn library_version(&self) -> &'static str {
        concat!("gmsec-rs ", env!("CARGO_PKG_VERSION"))
    }

    /// The middleware identifier, e.g. `loopback` or `websocket`.
    pub fn library_root_name(&self) -> String {
        self.mw_info()
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string()
    }

    pub fn mw_info(&self) -> String {
        self.inner.transport.mw_info()
    }

    /// Number of requests still waiting for a (final) reply.
    pub fn pending_request_count(&self) -> usize {
        self.inner.shared.lock().requests.len()
    }

    pub fn register_event_callback<F>(&self, event: Event, callback: F)
    where
        F: Fn(&Connection, &Status, Event) + Send + Sync + 'static,
    {
        self.inner
            .shared
            .lock()
            .events
            .insert(event, Arc::new(callback));
    }

    /// Reports an event to its callback, or to the `AllEvents` callback
    /// when the event has none of its own.
    pub(crate) fn emit(&self, event: Event, status: &Status) {
        if status.is_error() {
            warn!("[{}] {}: {}", self.inner.id, event, status);
        } else {
            info!("[{}] {}: {}", self.inner.id, event, status.reason());
        }

        let callback = {
            let shared = self.inner.shared.lock();
            shared
                .events
                .get(&event)
                .or_else(|| shared.events.get(&Event::AllEvents))
                .cloned()
        };
        if let Some(callback) = callback {
            if !callback::guarded(|| callback(self, status, event)) {
                warn!("Event callback for {} panicked", event);
            }
        }
    }

    fn check_connected(&self) -> Result<()> {
        match self.state() {
            ConnectionState::Connected => Ok(()),
            state => Err(GmsecError::invalid_state(format!(
                "Connection is {state:?}, not connected"
            ))),
        }
    }

    fn lenient_subjects(&self) -> bool {
        self.inner
            .config
            .get_boolean_value_or(options::LENIENT_SUBJECTS, true)
    }

    pub(crate) fn validates(&self, direction: &str) -> bool {
        let config = &self.inner.config;
        config.get_boolean_value_or(direction, false)
            || config.get_boolean_value_or(options::MSG_CONTENT_VALIDATE_ALL, false)
            || (direction == options::MSG_CONTENT_VALIDATE_SEND
                && config.get_boolean_value_or(options::MSG_CONTENT_VALIDATE, false))
    }

    /// The connection config overlaid with message and per-call config.
    fn effective_config(&self, message_config: &Config, call_config: &Config) -> Config {
        let mut config = self.inner.config.clone();
        config.merge(message_config, true);
        config.merge(call_config, true);
        config
    }

    pub async fn connect(&self) -> Result<()> {
        self.ensure_created()?;

        let inbound = match self.inner.transport.connect().await {
            Ok(inbound) => inbound,
            Err(e) => {
                self.emit(
                    Event::ConnectionException,
                    &Status::new(StatusClass::Connection, StatusCode::ConnectionLost, e.to_string()),
                );
                return Err(e);
            }
        };

        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        *self.inner.inbox.lock().await = Some(queue_rx);

        if let Err(e) = self.mark_connected() {
            let _ = self.inner.transport.disconnect().await;
            return Err(e);
        }

        let pump = tokio::spawn(dispatcher::pump(
            Arc::downgrade(&self.inner),
            inbound,
            queue_tx,
        ));
        *self.inner.pump.lock() = Some(pump);

        self.emit(
            Event::ConnectionSuccessful,
            &Status::new(
                StatusClass::NoError,
                StatusCode::ConnectionEstablished,
                format!("Connected to {}", self.mw_info()),
            ),
        );
        Ok(())
    }

    fn ensure_created(&self) -> Result<()> {
        match self.state() {
            ConnectionState::Created => Ok(()),
            ConnectionState::Connected => {
                Err(GmsecError::invalid_state("Connection is already connected"))
            }
            ConnectionState::Disconnected => {
                Err(GmsecError::invalid_state("Connection has been disconnected"))
            }
        }
    }

    fn mark_connected(&self) -> Result<()> {
        let mut shared = self.inner.shared.lock();
        if shared.state != ConnectionState::Created {
            return Err(GmsecError::invalid_state("Connection changed state while connecting"));
        }
        shared.state = ConnectionState::Connected;
        Ok(())
    }

    /// Stops auto-dispatch, cancels pending requests, drops subscriptions
    /// and releases the transport. Calling it again does nothing.
    pub async fn disconnect(&self) -> Result<()> {
        let cancelled = {
            let mut shared = self.inner.shared.lock();
            let was_connected = shared.state == ConnectionState::Connected;
            shared.state = ConnectionState::Disconnected;
            if !was_connected {
                return Ok(());
            }
            shared.subscriptions.clear();
            shared.reply_subjects.clear();
            shared.requests.cancel_all()
        };
        if cancelled > 0 {
            debug!("Cancelled {} pending requests", cancelled);
        }

        self.stop_auto_dispatch(true).await?;

        let pump = self.inner.pump.lock().take();
        if let Some(pump) = pump {
            pump.abort();
        }

        if let Err(e) = self.inner.transport.disconnect().await {
            self.emit(
                Event::ConnectionException,
                &Status::new(StatusClass::Connection, StatusCode::ConnectionLost, e.to_string()),
            );
        }
        self.inner.inbox.lock().await.take();

        info!("Connection {} disconnected", self.inner.id);
        Ok(())
    }

    pub(crate) fn transport_lost(&self) {
        if self.state() == ConnectionState::Connected {
            self.emit(
                Event::ConnectionBroken,
                &Status::new(
                    StatusClass::Connection,
                    StatusCode::ConnectionLost,
                    format!("Lost connection to {}", self.mw_info()),
                ),
            );
        }
    }

    pub fn subscribe(&self, pattern: &str) -> Result<SubscriptionInfo> {
        self.add_subscription(pattern, &Config::new(), None)
    }

    pub fn subscribe_with_config(&self, pattern: &str, config: &Config) -> Result<SubscriptionInfo> {
        self.add_subscription(pattern, config, None)
    }

    /// Subscribes with a callback invoked by `dispatch` or the
    /// auto-dispatcher for every matching message.
    pub fn subscribe_with_callback<F>(&self, pattern: &str, callback: F) -> Result<SubscriptionInfo>
    where
        F: Fn(&Connection, &Message) + Send + Sync + 'static,
    {
        self.add_subscription(pattern, &Config::new(), Some(Arc::new(callback)))
    }

    pub fn subscribe_with_config_and_callback<F>(
        &self,
        pattern: &str,
        config: &Config,
        callback: F,
    ) -> Result<SubscriptionInfo>
    where
        F: Fn(&Connection, &Message) + Send + Sync + 'static,
    {
        self.add_subscription(pattern, config, Some(Arc::new(callback)))
    }

    fn add_subscription(
        &self,
        pattern: &str,
        config: &Config,
        callback: Option<MessageCallback>,
    ) -> Result<SubscriptionInfo> {
        subject::validate_pattern(pattern, self.lenient_subjects())?;
        self.check_connected()?;
        let effective = self.effective_config(&Config::new(), config);

        let mut shared = self.inner.shared.lock();
        let existing = shared.subscriptions.iter().any(|s| s.pattern == pattern);
        if existing && callback.is_none() {
            return Err(GmsecError::Duplicate(format!(
                "Already subscribed to {pattern}"
            )));
        }
        if !existing && !shared.reply_subjects.contains(pattern) {
            self.inner.transport.subscribe(pattern, &effective)?;
        }

        let id = shared.next_subscription_id;
        shared.next_subscription_id += 1;
        let subscription = Subscription {
            id,
            pattern: pattern.to_string(),
            config: config.clone(),
            callback,
        };
        let info = subscription.info(&self.inner.id);
        shared.subscriptions.push(subscription);
        debug!("Subscribed to {}", pattern);
        Ok(info)
    }

    /// Cancels a subscription. The transport subscription goes away with
    /// the last subscription on the pattern.
    pub fn unsubscribe(&self, info: SubscriptionInfo) -> Result<()> {
        if info.connection_id != self.inner.id {
            return Err(GmsecError::illegal_argument(
                "Subscription belongs to another connection",
            ));
        }
        self.check_connected()?;

        let mut shared = self.inner.shared.lock();
        let position = shared
            .subscriptions
            .iter()
            .position(|s| s.id == info.id)
            .ok_or_else(|| {
                GmsecError::illegal_argument(format!("No subscription on {}", info.pattern()))
            })?;

        let last = shared
            .subscriptions
            .iter()
            .filter(|s| s.pattern == info.pattern())
            .count()
            == 1;
        if last && !shared.reply_subjects.contains(info.pattern()) {
            self.inner.transport.unsubscribe(info.pattern())?;
        }
        shared.subscriptions.remove(position);
        debug!("Unsubscribed from {}", info.pattern());
        Ok(())
    }

    /// Drops inbound messages whose subject matches `pattern`.
    pub fn exclude_subject(&self, pattern: &str) -> Result<()> {
        subject::validate_pattern(pattern, self.lenient_subjects())?;
        let mut shared = self.inner.shared.lock();
        if !shared.excluded.iter().any(|p| p == pattern) {
            shared.excluded.push(pattern.to_string());
        }
        Ok(())
    }

    pub fn remove_excluded_subject(&self, pattern: &str) -> bool {
        let mut shared = self.inner.shared.lock();
        let before = shared.excluded.len();
        shared.excluded.retain(|p| p != pattern);
        shared.excluded.len() != before
    }

    pub fn publish(&self, msg: &Message) -> Result<()> {
        self.publish_with_config(msg, &Config::new())
    }

    /// Publishes a copy of `msg`; `config` applies to this publish only.
    pub fn publish_with_config(&self, msg: &Message, config: &Config) -> Result<()> {
        if msg.kind() != MessageKind::Publish {
            return Err(GmsecError::illegal_argument(format!(
                "Cannot publish a {} message",
                msg.kind()
            )));
        }
        self.send(msg, config)
    }

    fn send(&self, msg: &Message, call_config: &Config) -> Result<()> {
        self.check_connected()?;

        let mut outgoing = msg.clone();
        let subject = self.inner.factory.subject_for(&outgoing)?;
        outgoing.set_subject_unchecked(subject.clone());

        if self.validates(options::MSG_CONTENT_VALIDATE_SEND) {
            let status = self.inner.factory.validate(&outgoing);
            if status.is_error() {
                return Err(GmsecError::Validation(status.reason().to_string()));
            }
        }

        let config = self.effective_config(outgoing.config(), call_config);
        let sequence = self.inner.publish_counter.fetch_add(1, Ordering::Relaxed) + 1;
        Tracking::from_config(&config).apply(
            &mut outgoing,
            &self.inner.id,
            &self.mw_info(),
            sequence,
        )?;

        let envelope = Envelope::new(subject, outgoing.kind(), outgoing.to_json());
        self.inner.transport.publish(envelope, &config)
    }

    pub(crate) fn republish(&self, id: &str, outgoing: &Message) {
        debug!("Republishing request {}", id);
        if let Err(e) = self.send(outgoing, &Config::new()) {
            self.emit(
                Event::MsgPublishFailure,
                &Status::new(
                    StatusClass::Request,
                    StatusCode::PublishFailed,
                    format!("Republish of request {id} failed: {e}"),
                ),
            );
        }
    }

    fn next_request_id(&self) -> String {
        let counter = self.inner.request_counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}_{}_{}", self.inner.id, std::process::id(), counter)
    }

    fn prepare_request(&self, request: &Message) -> Result<(String, Message, Config)> {
        if request.kind() != MessageKind::Request {
            return Err(GmsecError::illegal_argument(format!(
                "Cannot request with a {} message",
                request.kind()
            )));
        }
        self.check_connected()?;

        let config = self.effective_config(request.config(), &Config::new());
        let mut outgoing = request.clone();
        if config.get_boolean_value_or(options::SUBSCRIBE_FOR_RESP, false) {
            self.subscribe_for_response(&mut outgoing, &config)?;
        }

        let id = self.next_request_id();
        self.inner.correlation.attach(&mut outgoing, &id)?;
        Ok((id, outgoing, config))
    }

    /// Subscribes to the reply subject named by `MW-REPLY-STRING` (a `*`
    /// stands for the connection ID) and records it in the request so the
    /// replier knows where to answer.
    fn subscribe_for_response(&self, outgoing: &mut Message, config: &Config) -> Result<()> {
        let reply_string = config.get_value(options::REPLY_STRING).ok_or_else(|| {
            GmsecError::illegal_argument("MW-SUBSCRIBE-FOR-RESP requires MW-REPLY-STRING")
        })?;
        let reply_subject = reply_string.replacen('*', &self.inner.id, 1);
        subject::validate_subject(&reply_subject, self.lenient_subjects())?;
        outgoing.add_field(options::REPLY_STRING, reply_subject.as_str())?;

        let mut shared = self.inner.shared.lock();
        if !shared.reply_subjects.contains(&reply_subject) {
            if !shared.subscriptions.iter().any(|s| s.pattern == reply_subject) {
                self.inner.transport.subscribe(&reply_subject, config)?;
            }
            shared.reply_subjects.insert(reply_subject);
        }
        Ok(())
    }

    /// Sends a request and waits for the first reply.
    ///
    /// Returns `Ok(None)` when the timeout expires or the request is
    /// cancelled by `disconnect`/`stop_auto_dispatch`. See `WAIT_FOREVER`
    /// and `REQUEST_REPUBLISH_NEVER` for the sentinel values.
    pub async fn request(
        &self,
        request: &Message,
        timeout_ms: i64,
        republish_ms: i64,
    ) -> Result<Option<Message>> {
        let (id, outgoing, config) = self.prepare_request(request)?;

        let (tx, mut rx) = oneshot::channel();
        self.inner
            .shared
            .lock()
            .requests
            .insert(id.clone(), PendingRequest::new(ReplySink::Blocking(tx), false));

        if let Err(e) = self.send(&outgoing, &Config::new()) {
            self.inner.shared.lock().requests.remove(&id);
            return Err(e);
        }

        let deadline = timeout_duration(timeout_ms).map(|t| Instant::now() + t);
        let interval = republish_duration(republish_ms, &config);
        let mut next_republish = interval.map(|r| Instant::now() + r);

        loop {
            tokio::select! {
                biased;
                reply = &mut rx => return Ok(reply.ok()),
                _ = sleep_until_opt(deadline) => {
                    self.inner.shared.lock().requests.remove(&id);
                    self.emit(
                        Event::RequestTimeout,
                        &Status::new(
                            StatusClass::Request,
                            StatusCode::TimeoutOccurred,
                            format!("Request {id} timed out"),
                        ),
                    );
                    return Ok(None);
                }
                _ = sleep_until_opt(next_republish) => {
                    self.republish(&id, &outgoing);
                    next_republish = interval.map(|r| Instant::now() + r);
                }
            }
        }
    }

    /// Sends a request whose replies are handed to `callback` on a
    /// dedicated task.
    ///
    /// With `MW-MULTI-RESP` (the default) replies carrying an
    /// acknowledgement or working status keep the request open.
    pub fn request_with_callback(
        &self,
        request: &Message,
        timeout_ms: i64,
        callback: ReplyCallback,
        republish_ms: i64,
    ) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| GmsecError::invalid_state("Asynchronous requests need a tokio runtime"))?;
        let (id, outgoing, config) = self.prepare_request(request)?;
        let multi_response = config.get_boolean_value_or(options::MULTI_RESP, true);

        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.shared.lock().requests.insert(
            id.clone(),
            PendingRequest::new(ReplySink::Callback(tx), multi_response),
        );

        if let Err(e) = self.send(&outgoing, &Config::new()) {
            self.inner.shared.lock().requests.remove(&id);
            return Err(e);
        }

        let task = AsyncRequest {
            id,
            original: request.clone(),
            outgoing,
            timeout: timeout_duration(timeout_ms),
            republish: republish_duration(republish_ms, &config),
            callback,
        };
        runtime.spawn(task.run(Arc::downgrade(&self.inner), rx));
        Ok(())
    }

    /// Answers `request`. May be called several times for one request,
    /// e.g. an acknowledgement followed by a final reply.
    pub fn reply(&self, request: &Message, reply: &Message) -> Result<()> {
        if reply.kind() != MessageKind::Reply {
            return Err(GmsecError::illegal_argument(format!(
                "Cannot reply with a {} message",
                reply.kind()
            )));
        }
        if request.kind() != MessageKind::Request {
            return Err(GmsecError::invalid_state("Message being answered is not a request"));
        }

        let mut outgoing = reply.clone();
        self.inner.correlation.propagate(request, &mut outgoing)?;
        if outgoing.subject().is_empty() {
            if let Some(field) = request.get_field(options::REPLY_STRING) {
                outgoing.set_subject(&field.get_string_value())?;
            }
        }
        self.send(&outgoing, &Config::new())
    }

    /// Next message from a subscription, waiting up to `timeout_ms`.
    /// `Ok(None)` means nothing arrived in time.
    ///
    /// Right after `stop_auto_dispatch(false)` this first waits for the
    /// dispatcher to finish its current message.
    pub async fn receive(&self, timeout_ms: i64) -> Result<Option<Message>> {
        self.check_connected()?;
        if self.is_auto_dispatching() {
            return Err(GmsecError::invalid_state(
                "Cannot receive while auto-dispatch is running",
            ));
        }
        let mut inbox = self.inner.inbox.lock().await;
        let queue = inbox
            .as_mut()
            .ok_or_else(|| GmsecError::invalid_state("Inbound queue is unavailable"))?;

        let msg = match timeout_ms {
            t if t < 0 => queue.recv().await,
            0 => queue.try_recv().ok(),
            t => tokio::time::timeout(Duration::from_millis(t as u64), queue.recv())
                .await
                .ok()
                .flatten(),
        };
        Ok(msg)
    }

    /// Invokes the callbacks of every subscription matching `msg`.
    pub fn dispatch(&self, msg: &Message) -> Result<()> {
        if self.inner.dispatcher.lock().is_some() {
            return Err(GmsecError::invalid_state(
                "Cannot dispatch manually while auto-dispatch is running",
            ));
        }
        self.dispatch_message(msg);
        Ok(())
    }

    /// Starts delivering messages to callbacks on a background task.
    /// Returns false if it is already running.
    pub fn start_auto_dispatch(&self) -> Result<bool> {
        self.check_connected()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| GmsecError::invalid_state("Auto-dispatch needs a tokio runtime"))?;

        let mut dispatcher = self.inner.dispatcher.lock();
        if dispatcher.is_some() {
            return Ok(false);
        }
        let queue = self
            .inner
            .inbox
            .clone()
            .try_lock_owned()
            .map_err(|_| GmsecError::invalid_state("A receive is in progress"))?;
        if queue.is_none() {
            return Err(GmsecError::invalid_state("Inbound queue is unavailable"));
        }

        let (stop, stop_rx) = oneshot::channel();
        let task = runtime.spawn(dispatcher::run(Arc::downgrade(&self.inner), queue, stop_rx));
        *dispatcher = Some(DispatcherHandle { stop, task });
        debug!("Auto-dispatch started");
        Ok(true)
    }

    /// Stops the auto-dispatcher and cancels pending requests. With `wait`
    /// the call returns once the dispatcher has finished its current
    /// message; otherwise a following `receive` waits for that instead.
    /// Returns false if it was not running.
    pub async fn stop_auto_dispatch(&self, wait: bool) -> Result<bool> {
        let handle = self.inner.dispatcher.lock().take();
        let Some(DispatcherHandle { stop, task }) = handle else {
            return Ok(false);
        };

        let cancelled = self.inner.shared.lock().requests.cancel_all();
        if cancelled > 0 {
            debug!("Cancelled {} pending requests", cancelled);
        }
        let _ = stop.send(());

        if wait {
            if let Err(e) = task.await {
                warn!("Auto-dispatch task failed: {}", e);
            }
        }
        Ok(true)
    }

    pub fn is_auto_dispatching(&self) -> bool {
        self.inner.dispatcher.lock().is_some()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.inner.id)
            .field("mw_info", &self.inner.transport.mw_info())
            .field("state", &self.state())
            .finish()
    }
}
