//! The `specification` module describes message schemas and builds
//! messages from them.
//!
//! A `Specification` is a read-only set of `MessageSpecification`s, each
//! naming the fields a message of that schema carries and how its subject
//! is formed. `MessageFactory` creates messages from those templates and
//! checks compliance through the `MessageValidator` capability.
//!
//! The built-in specification covers heartbeat, log and directive
//! request/response messages. Applications add their own schemas with
//! `Specification::add_message_specification`.

pub mod factory;
pub mod validator;

use indexmap::IndexMap;

use crate::message::field::FieldType;
use crate::message::{MESSAGE_SUBTYPE_FIELD, MESSAGE_TYPE_FIELD, MessageKind};
use crate::utils::{GmsecError, Result};

pub use factory::MessageFactory;
pub use validator::{ComplianceValidator, MessageValidator};

/// The default specification version, `2019_00` in `YYYY_RR` form.
pub const DEFAULT_VERSION: u32 = 201900;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldMode {
    #[default]
    Required,
    Optional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaLevel {
    #[default]
    Level0,
    Level1,
    Level2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpecification {
    name: String,
    field_type: FieldType,
    mode: FieldMode,
    value: Option<String>,
    description: String,
    header: bool,
}

impl FieldSpecification {
    pub fn new(name: &str, field_type: FieldType, mode: FieldMode) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            mode,
            value: None,
            description: String::new(),
            header: false,
        }
    }

    pub fn required(name: &str, field_type: FieldType) -> Self {
        Self::new(name, field_type, FieldMode::Required)
    }

    pub fn optional(name: &str, field_type: FieldType) -> Self {
        Self::new(name, field_type, FieldMode::Optional)
    }

    /// Fixes the value every compliant message must carry for this field.
    pub fn with_value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn as_header(mut self) -> Self {
        self.header = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn mode(&self) -> FieldMode {
        self.mode
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_header(&self) -> bool {
        self.header
    }
}

/// Schema of one kind of message.
///
/// Subject template elements are either literal tokens or `{FIELD}`
/// references resolved from the message's fields.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageSpecification {
    schema_id: String,
    subject_template: Vec<String>,
    description: String,
    fields: Vec<FieldSpecification>,
}

impl MessageSpecification {
    pub fn new(schema_id: &str, subject_template: &[&str]) -> Result<Self> {
        if schema_id.is_empty() {
            return Err(GmsecError::illegal_argument("Schema ID cannot be empty"));
        }
        Ok(Self {
            schema_id: schema_id.to_string(),
            subject_template: subject_template.iter().map(|s| s.to_string()).collect(),
            description: String::new(),
            fields: Vec::new(),
        })
    }

    pub fn with_field(mut self, field: FieldSpecification) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn schema_id(&self) -> &str {
        &self.schema_id
    }

    pub fn subject_template(&self) -> &[String] {
        &self.subject_template
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn field_specifications(&self) -> &[FieldSpecification] {
        &self.fields
    }

    /// The fixed value of `MESSAGE-TYPE`, if the schema defines one.
    pub fn message_type(&self) -> Option<&str> {
        self.fixed_value(MESSAGE_TYPE_FIELD)
    }

    pub fn message_subtype(&self) -> Option<&str> {
        self.fixed_value(MESSAGE_SUBTYPE_FIELD)
    }

    pub fn kind(&self) -> MessageKind {
        self.message_type()
            .map(MessageKind::from_message_type)
            .unwrap_or_default()
    }

    fn fixed_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .and_then(|f| f.value())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Specification {
    version: u32,
    schema_level: SchemaLevel,
    headers: Vec<FieldSpecification>,
    messages: IndexMap<String, MessageSpecification>,
}

impl Specification {
    /// An empty specification with the standard header fields.
    pub fn new(version: u32) -> Self {
        Self {
            version,
            schema_level: SchemaLevel::Level0,
            headers: standard_headers(),
            messages: IndexMap::new(),
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn schema_level(&self) -> SchemaLevel {
        self.schema_level
    }

    pub fn headers(&self) -> &[FieldSpecification] {
        &self.headers
    }

    pub fn add_message_specification(&mut self, spec: MessageSpecification) {
        self.messages.insert(spec.schema_id.clone(), spec);
    }

    pub fn message_specification(&self, schema_id: &str) -> Option<&MessageSpecification> {
        self.messages.get(schema_id)
    }

    pub fn message_specifications(&self) -> impl Iterator<Item = &MessageSpecification> {
        self.messages.values()
    }

    /// Finds the schema whose `MESSAGE-TYPE`/`MESSAGE-SUBTYPE` pair matches.
    pub fn find_schema(&self, message_type: &str, message_subtype: &str) -> Option<&MessageSpecification> {
        self.messages.values().find(|spec| {
            spec.message_type()
                .is_some_and(|t| t.eq_ignore_ascii_case(message_type))
                && spec
                    .message_subtype()
                    .is_some_and(|s| s.eq_ignore_ascii_case(message_subtype))
        })
    }
}

impl Default for Specification {
    fn default() -> Self {
        let mut spec = Specification::new(DEFAULT_VERSION);
        for msg in builtin_messages() {
            spec.add_message_specification(msg);
        }
        spec
    }
}

fn standard_headers() -> Vec<FieldSpecification> {
    use FieldType::*;
    vec![
        FieldSpecification::optional("SPECIFICATION", String).as_header(),
        FieldSpecification::optional("DOMAIN1", String).as_header(),
        FieldSpecification::optional("DOMAIN2", String).as_header(),
        FieldSpecification::required("MISSION-ID", String).as_header(),
        FieldSpecification::optional("CONSTELLATION-ID", String).as_header(),
        FieldSpecification::optional("SAT-ID-PHYSICAL", String).as_header(),
        FieldSpecification::optional("SAT-ID-LOGICAL", String).as_header(),
        FieldSpecification::optional("FACILITY", String).as_header(),
        FieldSpecification::required("COMPONENT", String).as_header(),
        FieldSpecification::optional("CONTENT-VERSION", F32).as_header(),
        FieldSpecification::required(MESSAGE_TYPE_FIELD, String).as_header(),
        FieldSpecification::required(MESSAGE_SUBTYPE_FIELD, String).as_header(),
    ]
}

const SUBJECT_PREFIX: [&str; 9] = [
    "C2MS",
    "{DOMAIN1}",
    "{DOMAIN2}",
    "{MISSION-ID}",
    "{CONSTELLATION-ID}",
    "{SAT-ID-PHYSICAL}",
    "{SAT-ID-LOGICAL}",
    "{MESSAGE-TYPE}",
    "{MESSAGE-SUBTYPE}",
];

fn subject_template(extra: &[&'static str]) -> Vec<&'static str> {
    SUBJECT_PREFIX.iter().chain(extra).copied().collect()
}

fn schema(id: &str, extra: &[&'static str], message_type: &str, subtype: &str) -> MessageSpecification {
    MessageSpecification {
        schema_id: id.to_string(),
        subject_template: subject_template(extra).into_iter().map(String::from).collect(),
        description: String::new(),
        fields: vec![
            FieldSpecification::required(MESSAGE_TYPE_FIELD, FieldType::String)
                .with_value(message_type)
                .as_header(),
            FieldSpecification::required(MESSAGE_SUBTYPE_FIELD, FieldType::String)
                .with_value(subtype)
                .as_header(),
        ],
    }
}

fn builtin_messages() -> Vec<MessageSpecification> {
    use FieldType::*;
    vec![
        schema("MSG.HB", &["{COMPONENT}"], "MSG", "HB")
            .with_description("Heartbeat")
            .with_field(FieldSpecification::required("PUB-RATE", U16))
            .with_field(FieldSpecification::required("COUNTER", U16))
            .with_field(FieldSpecification::optional("COMPONENT-STATUS", I16)),
        schema("MSG.RSRC", &["{COMPONENT}"], "MSG", "RSRC")
            .with_description("Resource")
            .with_field(FieldSpecification::required("PUB-RATE", U16))
            .with_field(FieldSpecification::required("COUNTER", U16))
            .with_field(FieldSpecification::optional("OPER-SYS", String))
            .with_field(FieldSpecification::optional("NUM-OF-CPUS", U16))
            .with_field(FieldSpecification::optional("CPU.TOTAL.UTIL", F32))
            .with_field(FieldSpecification::optional("MEM.UTIL", F32))
            .with_field(FieldSpecification::optional("MEM.PHYSICAL.TOTAL", U64))
            .with_field(FieldSpecification::optional("MEM.PHYSICAL.AVAIL", U64))
            .with_field(FieldSpecification::optional("MEM.VIRTUAL.TOTAL", U64))
            .with_field(FieldSpecification::optional("MEM.VIRTUAL.AVAIL", U64))
            .with_field(FieldSpecification::optional("NUM-OF-DISKS", U16))
            .with_field(FieldSpecification::optional("NUM-OF-NET-PORTS", U16)),
        schema("MSG.LOG", &["{COMPONENT}", "{SUBCLASS}", "{SEVERITY}"], "MSG", "LOG")
            .with_description("Log")
            .with_field(FieldSpecification::required("SUBCLASS", String))
            .with_field(FieldSpecification::required("OCCURRENCE-TYPE", String))
            .with_field(FieldSpecification::required("SEVERITY", I16))
            .with_field(FieldSpecification::optional("MSG-TEXT", String)),
        schema("REQ.DIR", &["{DESTINATION-COMPONENT}"], "REQ", "DIR")
            .with_description("Directive request")
            .with_field(FieldSpecification::required("DESTINATION-COMPONENT", String))
            .with_field(FieldSpecification::required("DIRECTIVE-STRING", String))
            .with_field(FieldSpecification::required("RESPONSE", Bool)),
        schema("RESP.DIR", &["{DESTINATION-COMPONENT}"], "RESP", "DIR")
            .with_description("Directive response")
            .with_field(FieldSpecification::required("DESTINATION-COMPONENT", String))
            .with_field(FieldSpecification::required("RESPONSE-STATUS", I16))
            .with_field(FieldSpecification::optional("DATA", String)),
    ]
}

#[cfg(test)]
mod tests;
