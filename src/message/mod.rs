//! The `message` module defines `Message`, the unit exchanged over a
//! connection: a subject, a kind and an ordered set of named, typed fields.
//!
//! Messages serialise to XML and JSON; both forms round-trip every field
//! type exactly (floating point values carry their bit pattern).

pub mod field;
mod json;
mod xml;

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::subject;
use crate::utils::{GmsecError, Result};

pub use field::{Field, FieldType, FieldValue};

/// Name of the field carrying a response status code.
pub const RESPONSE_STATUS_FIELD: &str = "RESPONSE-STATUS";
/// Name of the field carrying the schema message type (`MSG`, `REQ`, `RESP`).
pub const MESSAGE_TYPE_FIELD: &str = "MESSAGE-TYPE";
pub const MESSAGE_SUBTYPE_FIELD: &str = "MESSAGE-SUBTYPE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageKind {
    #[default]
    Publish,
    Request,
    Reply,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Publish => "PUBLISH",
            MessageKind::Request => "REQUEST",
            MessageKind::Reply => "REPLY",
        }
    }

    /// Kind implied by a `MESSAGE-TYPE` value.
    pub fn from_message_type(message_type: &str) -> MessageKind {
        match message_type.trim().to_ascii_uppercase().as_str() {
            "REQ" => MessageKind::Request,
            "RESP" => MessageKind::Reply,
            _ => MessageKind::Publish,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = GmsecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PUBLISH" => Ok(MessageKind::Publish),
            "REQUEST" => Ok(MessageKind::Request),
            "REPLY" => Ok(MessageKind::Reply),
            other => Err(GmsecError::parse(format!("unknown message kind '{other}'"))),
        }
    }
}

/// Status codes carried in the `RESPONSE-STATUS` field of a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum ResponseStatus {
    Acknowledgement = 1,
    WorkingKeepAlive = 2,
    SuccessfulCompletion = 3,
    FailedCompletion = 4,
    InvalidRequest = 5,
    FinalMessage = 6,
}

impl ResponseStatus {
    pub fn code(self) -> i16 {
        self as i16
    }

    pub fn from_code(code: i64) -> Option<ResponseStatus> {
        let status = match code {
            1 => ResponseStatus::Acknowledgement,
            2 => ResponseStatus::WorkingKeepAlive,
            3 => ResponseStatus::SuccessfulCompletion,
            4 => ResponseStatus::FailedCompletion,
            5 => ResponseStatus::InvalidRequest,
            6 => ResponseStatus::FinalMessage,
            _ => return None,
        };
        Some(status)
    }

    /// Terminal statuses end a multi-part response.
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            ResponseStatus::Acknowledgement | ResponseStatus::WorkingKeepAlive
        )
    }
}

/// Encodings accepted by `Message::from_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Xml,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    subject: String,
    kind: MessageKind,
    fields: IndexMap<String, Field>,
    config: Config,
    schema_id: Option<String>,
}

impl Message {
    /// An empty PUBLISH message with no subject.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subject(subject: &str, kind: MessageKind) -> Result<Self> {
        let mut msg = Self::new();
        msg.set_subject(subject)?;
        msg.kind = kind;
        Ok(msg)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Sets the subject. Lower-case letters are accepted; wildcards are not.
    pub fn set_subject(&mut self, subject: &str) -> Result<()> {
        subject::validate_subject(subject, true)?;
        self.subject = subject.to_string();
        Ok(())
    }

    pub(crate) fn set_subject_unchecked(&mut self, subject: String) {
        self.subject = subject;
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: MessageKind) {
        self.kind = kind;
    }

    pub fn schema_id(&self) -> Option<&str> {
        self.schema_id.as_deref()
    }

    pub(crate) fn set_schema_id(&mut self, schema_id: Option<String>) {
        self.schema_id = schema_id;
    }

    /// Adds a field, returning true when a field of that name was replaced.
    pub fn add_field(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<bool> {
        let field = Field::new(name, value)?;
        Ok(self.put_field(field))
    }

    /// Adds a prepared field, returning true when it replaced another.
    pub fn put_field(&mut self, field: Field) -> bool {
        self.fields
            .insert(field.name().to_string(), field)
            .is_some()
    }

    pub fn get_field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn clear_field(&mut self, name: &str) -> bool {
        self.fields.shift_remove(name).is_some()
    }

    pub fn clear_fields(&mut self) {
        self.fields.clear();
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    fn require_field(&self, name: &str) -> Result<&Field> {
        self.get_field(name)
            .ok_or_else(|| GmsecError::NotFound(format!("Message has no field named {name}")))
    }

    pub fn get_string_value(&self, name: &str) -> Result<String> {
        Ok(self.require_field(name)?.get_string_value())
    }

    pub fn get_i64_value(&self, name: &str) -> Result<i64> {
        self.require_field(name)?.get_i64_value()
    }

    pub fn get_f64_value(&self, name: &str) -> Result<f64> {
        self.require_field(name)?.get_f64_value()
    }

    pub fn get_bool_value(&self, name: &str) -> Result<bool> {
        self.require_field(name)?.get_bool_value()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    pub fn add_config_value(&mut self, key: &str, value: &str) -> Result<()> {
        self.config.add_value(key, value)
    }

    /// The raw `RESPONSE-STATUS` code, if the field is present and integral.
    pub fn response_status_code(&self) -> Option<i64> {
        self.get_field(RESPONSE_STATUS_FIELD)
            .and_then(|f| f.value().as_i64())
    }

    pub fn response_status(&self) -> Option<ResponseStatus> {
        self.response_status_code().and_then(ResponseStatus::from_code)
    }

    pub fn set_response_status(&mut self, status: ResponseStatus) {
        // name is non-empty
        let _ = self.add_field(RESPONSE_STATUS_FIELD, status.code());
    }

    /// Sets the kind from the `MESSAGE-TYPE` field, when present.
    pub(crate) fn deduce_kind(&mut self) {
        if let Some(field) = self.get_field(MESSAGE_TYPE_FIELD) {
            self.kind = MessageKind::from_message_type(&field.get_string_value());
        }
    }

    pub fn from_data(data: &str, data_type: DataType) -> Result<Message> {
        match data_type {
            DataType::Xml => Message::from_xml(data),
            DataType::Json => Message::from_json(data),
        }
    }

    /// Number of bytes of the JSON encoding.
    pub fn size(&self) -> usize {
        self.to_json().len()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_xml())
    }
}

#[cfg(test)]
mod tests;
