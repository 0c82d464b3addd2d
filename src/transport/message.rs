use serde::{Deserialize, Serialize};

use crate::broker::Envelope;

/// Frames a WebSocket peer sends to the bus server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "subscribe")]
    Subscribe {
        pattern: String,
        #[serde(default)]
        durable: bool,
    },

    #[serde(rename = "unsubscribe")]
    Unsubscribe { pattern: String },

    #[serde(rename = "publish")]
    Publish {
        envelope: Envelope,
        #[serde(default)]
        durable: bool,
    },
}

/// Frames the bus server sends back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "deliver")]
    Deliver { envelope: Envelope },

    #[serde(rename = "error")]
    Error {
        message: String,
        /// The kind of client frame that failed, if it could be parsed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operation: Option<Operation>,
    },
}

/// A client operation the bus can reject after the client has sent it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Subscribe,
    Unsubscribe,
    Publish,
}

impl ClientMessage {
    pub fn operation(&self) -> Operation {
        match self {
            ClientMessage::Subscribe { .. } => Operation::Subscribe,
            ClientMessage::Unsubscribe { .. } => Operation::Unsubscribe,
            ClientMessage::Publish { .. } => Operation::Publish,
        }
    }
}
