use serde_json::{Map, Value, json};

use super::{Field, FieldType, FieldValue, Message, MessageKind};
use crate::config::Config;
use crate::subject;
use crate::utils::json::{get_ci, one_or_many, scalar_text};
use crate::utils::{GmsecError, Result};

impl Message {
    pub fn to_json(&self) -> String {
        self.to_json_value().to_string()
    }

    pub(crate) fn to_json_value(&self) -> Value {
        let fields: Vec<Value> = self.fields().map(field_to_json).collect();

        let mut body = Map::new();
        body.insert("SUBJECT".into(), Value::String(self.subject().to_string()));
        body.insert("KIND".into(), Value::String(self.kind().as_str().to_string()));
        if !self.config().is_empty() {
            body.insert("CONFIG".into(), self.config().json_body());
        }
        body.insert("FIELD".into(), Value::Array(fields));

        json!({ "MESSAGE": body })
    }

    pub fn from_json(data: &str) -> Result<Message> {
        let value: Value =
            serde_json::from_str(data).map_err(|e| GmsecError::parse(e.to_string()))?;
        let root = value
            .as_object()
            .and_then(|obj| get_ci(obj, "MESSAGE"))
            .and_then(Value::as_object)
            .ok_or_else(|| GmsecError::parse("JSON data has no MESSAGE object"))?;

        let mut msg = Message::new();
        if let Some(subject) = get_ci(root, "SUBJECT").and_then(Value::as_str) {
            if !subject.is_empty() {
                subject::validate_subject(subject, true)
                    .map_err(|e| GmsecError::parse(e.to_string()))?;
                msg.set_subject_unchecked(subject.to_string());
            }
        }

        if let Some(config) = get_ci(root, "CONFIG").and_then(Value::as_object) {
            msg.set_config(Config::from_json_body(config)?);
        }

        if let Some(fields) = get_ci(root, "FIELD") {
            for field in one_or_many(fields) {
                let field = field
                    .as_object()
                    .ok_or_else(|| GmsecError::parse("FIELD entry is not an object"))?;
                msg.put_field(field_from_json(field)?);
            }
        }

        match get_ci(root, "KIND").and_then(Value::as_str) {
            Some(kind) => msg.set_kind(kind.parse::<MessageKind>()?),
            None => msg.deduce_kind(),
        }

        Ok(msg)
    }
}

fn field_to_json(field: &Field) -> Value {
    let value = field.value();
    let rendered = match value {
        FieldValue::I8(v) => json!(v),
        FieldValue::I16(v) => json!(v),
        FieldValue::I32(v) => json!(v),
        FieldValue::I64(v) => json!(v),
        FieldValue::U8(v) => json!(v),
        FieldValue::U16(v) => json!(v),
        FieldValue::U32(v) => json!(v),
        FieldValue::U64(v) => json!(v),
        other => Value::String(other.to_text()),
    };

    let mut entry = Map::new();
    entry.insert("NAME".into(), Value::String(field.name().to_string()));
    entry.insert("TYPE".into(), Value::String(field.field_type().name().to_string()));
    entry.insert("VALUE".into(), rendered);
    if field.is_header() {
        entry.insert("HEAD".into(), Value::String("T".into()));
    }
    if let Some(bits) = value.float_bits() {
        entry.insert("BITS".into(), Value::String(bits));
    }
    Value::Object(entry)
}

fn field_from_json(entry: &Map<String, Value>) -> Result<Field> {
    let name = get_ci(entry, "NAME")
        .and_then(Value::as_str)
        .ok_or_else(|| GmsecError::parse("FIELD entry has no NAME"))?;
    let type_name = get_ci(entry, "TYPE")
        .and_then(Value::as_str)
        .ok_or_else(|| GmsecError::parse(format!("FIELD {name} has no TYPE")))?;
    let ty = FieldType::from_name(type_name)
        .ok_or_else(|| GmsecError::parse(format!("FIELD {name} has unknown TYPE {type_name}")))?;

    let bits = get_ci(entry, "BITS").and_then(Value::as_str);
    let value = match bits {
        Some(bits) if ty.is_float() => FieldValue::from_float_bits(ty, bits)?,
        _ => {
            let text = get_ci(entry, "VALUE")
                .and_then(scalar_text)
                .ok_or_else(|| GmsecError::parse(format!("FIELD {name} has no VALUE")))?;
            FieldValue::parse(ty, &text)?
        }
    };
    let header = get_ci(entry, "HEAD")
        .and_then(scalar_text)
        .is_some_and(|h| h.eq_ignore_ascii_case("T") || h.eq_ignore_ascii_case("TRUE"));

    Field::new(name, value)
        .map(|f| f.with_header(header))
        .map_err(|e| GmsecError::parse(e.to_string()))
}
