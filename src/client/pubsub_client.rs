use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::broker::Envelope;

/// A bus client: one loopback connection or one WebSocket peer.
///
/// The broker pushes matching envelopes into `sender`; whoever owns the
/// receiving half decides what to do with them.
#[derive(Debug)]
pub struct Client {
    /// Unique identifier, `client-<uuid>`.
    pub id: String,

    pub sender: UnboundedSender<Envelope>,
}

impl Client {
    pub fn new(sender: UnboundedSender<Envelope>) -> Self {
        Self {
            id: format!("client-{}", Uuid::new_v4()),
            sender,
        }
    }
}
