//! The `transport` module moves envelopes between a `Connection` and a bus.
//!
//! `Transport` is the seam: the in-process `LoopbackTransport` talks to a
//! shared `Bus` directly, while `WebSocketTransport` speaks the JSON frame
//! protocol of `message` to a bus served by `start_websocket_server`.

pub mod loopback;
pub mod message;
pub mod websocket;
pub mod ws_client;

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::broker::Envelope;
use crate::config::Config;
use crate::utils::Result;

pub use loopback::LoopbackTransport;
pub use message::Operation;
pub use websocket::start_websocket_server;
pub use ws_client::WebSocketTransport;

/// A failure the bus reported after the operation had already returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFault {
    pub operation: Option<Operation>,
    pub message: String,
}

/// The receiving sides a transport hands back on `connect`.
#[derive(Debug)]
pub struct Inbound {
    /// Every envelope the bus routes to this transport. Closes when the
    /// transport loses its bus.
    pub envelopes: UnboundedReceiver<Envelope>,
    pub faults: UnboundedReceiver<TransportFault>,
}

impl Inbound {
    /// An `Inbound` around `envelopes` plus the sender for its faults.
    pub fn new(envelopes: UnboundedReceiver<Envelope>) -> (Self, UnboundedSender<TransportFault>) {
        let (faults_tx, faults) = mpsc::unbounded_channel();
        (Self { envelopes, faults }, faults_tx)
    }
}

/// A middleware binding.
///
/// `connect` hands back the transport's `Inbound` channels: routed
/// envelopes, and faults the bus reports for operations that already
/// returned `Ok`. The `config` passed to
/// `subscribe` and `publish` is the connection config overlaid with any
/// per-call config.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Describes the middleware, e.g. `loopback` or `websocket ws://host:port`.
    fn mw_info(&self) -> String;

    async fn connect(&self) -> Result<Inbound>;

    async fn disconnect(&self) -> Result<()>;

    fn subscribe(&self, pattern: &str, config: &Config) -> Result<()>;

    fn unsubscribe(&self, pattern: &str) -> Result<()>;

    fn publish(&self, envelope: Envelope, config: &Config) -> Result<()>;
}


#[cfg(test)]
mod websocket_tests;
