use serde::{Deserialize, Serialize};

use crate::message::MessageKind;
use crate::utils::time::now_millis;

/// A message as it travels across the bus.
///
/// The bus routes on `subject` alone and never looks inside `payload`,
/// which holds the JSON form of the published `Message`.
///
/// # Fields
///
/// - `subject` - The subject the message was published under.
/// - `kind` - Publish, request or reply.
/// - `payload` - The encoded message.
/// - `timestamp` - Milliseconds since the Unix epoch when the envelope was created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub subject: String,
    pub kind: MessageKind,
    pub payload: String,
    pub timestamp: i64,
}

impl Envelope {
    pub fn new(subject: impl Into<String>, kind: MessageKind, payload: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            kind,
            payload: payload.into(),
            timestamp: now_millis(),
        }
    }
}
