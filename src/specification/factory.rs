use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::validator::{ComplianceValidator, MessageValidator};
use super::{DEFAULT_VERSION, Specification};
use crate::config::{Config, options};
use crate::message::field::Field;
use crate::message::{DataType, MESSAGE_SUBTYPE_FIELD, MESSAGE_TYPE_FIELD, Message};
use crate::subject;
use crate::utils::{GmsecError, Result, Status};

/// Subject element used when a template references a field the message
/// does not carry.
pub const FILL_ELEMENT: &str = "FILL";

#[derive(Default)]
struct FactoryState {
    standard_fields: Vec<Field>,
    message_config: Config,
    validator: Option<Arc<dyn MessageValidator>>,
}

/// Builds messages from schema templates and checks their compliance.
///
/// Safe to share between tasks; standard fields, message config and the
/// custom validator sit behind an internal lock.
pub struct MessageFactory {
    spec: Arc<Specification>,
    compliance: ComplianceValidator,
    state: Mutex<FactoryState>,
}

impl MessageFactory {
    /// A factory over the built-in specification. A
    /// `GMSEC-SPECIFICATION-VERSION` other than the built-in one is rejected.
    pub fn new(config: &Config) -> Result<Self> {
        let version = config
            .get_integer_value_or(options::SPECIFICATION_VERSION, i64::from(DEFAULT_VERSION));
        if version != i64::from(DEFAULT_VERSION) {
            return Err(GmsecError::illegal_argument(format!(
                "Specification version {version} is not available"
            )));
        }
        Ok(Self::with_specification(Specification::default()))
    }

    pub fn with_specification(spec: Specification) -> Self {
        let spec = Arc::new(spec);
        Self {
            compliance: ComplianceValidator::new(spec.clone()),
            spec,
            state: Mutex::new(FactoryState::default()),
        }
    }

    pub fn specification(&self) -> &Specification {
        &self.spec
    }

    /// Fields added to every message this factory creates.
    pub fn set_standard_fields(&self, fields: Vec<Field>) {
        self.state.lock().standard_fields = fields;
    }

    pub fn clear_standard_fields(&self) {
        self.state.lock().standard_fields.clear();
    }

    pub fn set_message_config(&self, config: Config) {
        self.state.lock().message_config = config;
    }

    pub fn message_config(&self) -> Config {
        self.state.lock().message_config.clone()
    }

    /// Registers a validator run after the built-in compliance check.
    pub fn register_message_validator(&self, validator: Arc<dyn MessageValidator>) {
        self.state.lock().validator = Some(validator);
    }

    /// A message with the standard fields and message config but no schema.
    pub fn create_message_bare(&self) -> Message {
        let state = self.state.lock();
        let mut msg = Message::new();
        msg.set_config(state.message_config.clone());
        for field in &state.standard_fields {
            msg.put_field(field.clone());
        }
        msg
    }

    /// A message built from the template registered under `schema_id`.
    pub fn create_message(&self, schema_id: &str) -> Result<Message> {
        if schema_id.is_empty() {
            return Err(GmsecError::illegal_argument("Schema ID cannot be empty"));
        }
        let template = self.spec.message_specification(schema_id).ok_or_else(|| {
            GmsecError::illegal_argument(format!("Unknown schema ID {schema_id}"))
        })?;

        let mut msg = Message::new();
        for field_spec in template.field_specifications() {
            if let Some(value) = field_spec.value() {
                let field = Field::new(field_spec.name(), value)?.with_header(field_spec.is_header());
                msg.put_field(field);
            }
        }

        let state = self.state.lock();
        msg.set_config(state.message_config.clone());
        for field in &state.standard_fields {
            msg.put_field(field.clone());
        }
        drop(state);

        msg.set_kind(template.kind());
        msg.set_schema_id(Some(schema_id.to_string()));
        Ok(msg)
    }

    /// Decodes a message and attaches the schema deduced from its
    /// `MESSAGE-TYPE`/`MESSAGE-SUBTYPE` fields. The factory's message
    /// config wins over config carried in the data.
    pub fn from_data(&self, data: &str, data_type: DataType) -> Result<Message> {
        let mut msg = Message::from_data(data, data_type)?;
        let config = self.state.lock().message_config.clone();
        msg.config_mut().merge(&config, true);
        self.attach_schema(&mut msg);
        Ok(msg)
    }

    pub(crate) fn attach_schema(&self, msg: &mut Message) {
        if msg.schema_id().is_some() {
            return;
        }
        let message_type = msg.get_string_value(MESSAGE_TYPE_FIELD).ok();
        let subtype = msg.get_string_value(MESSAGE_SUBTYPE_FIELD).ok();
        if let (Some(message_type), Some(subtype)) = (message_type, subtype) {
            match self.spec.find_schema(&message_type, &subtype) {
                Some(template) => msg.set_schema_id(Some(template.schema_id().to_string())),
                None => debug!("No schema for {}.{}", message_type, subtype),
            }
        }
    }

    /// Built-in compliance followed by the registered custom validator.
    pub fn validate(&self, msg: &Message) -> Status {
        let status = self.compliance.validate_message(msg);
        if status.is_error() {
            return status;
        }
        let validator = self.state.lock().validator.clone();
        match validator {
            Some(validator) => validator.validate_message(msg),
            None => status,
        }
    }

    /// The subject a message is published under: its explicit subject, or
    /// one built from its schema's subject template.
    pub fn subject_for(&self, msg: &Message) -> Result<String> {
        if !msg.subject().is_empty() {
            return Ok(msg.subject().to_string());
        }
        let template = msg
            .schema_id()
            .and_then(|id| self.spec.message_specification(id))
            .ok_or_else(|| GmsecError::illegal_argument("Message has no subject"))?;

        let elements: Vec<String> = template
            .subject_template()
            .iter()
            .map(|element| match field_reference(element) {
                Some(name) => msg
                    .get_field(name)
                    .map(|f| f.get_string_value())
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| FILL_ELEMENT.to_string()),
                None => element.clone(),
            })
            .collect();
        let built = elements.join(".");
        subject::validate_subject(&built, true)?;
        Ok(built)
    }
}

fn field_reference(element: &str) -> Option<&str> {
    element.strip_prefix('{')?.strip_suffix('}')
}

impl fmt::Debug for MessageFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageFactory")
            .field("version", &self.spec.version())
            .finish()
    }
}
