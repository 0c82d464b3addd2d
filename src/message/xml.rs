use super::{Field, FieldType, FieldValue, Message, MessageKind};
use crate::config::Config;
use crate::subject;
use crate::utils::xml::{XmlElement, escape};
use crate::utils::{GmsecError, Result};

impl Message {
    pub fn to_xml(&self) -> String {
        self.xml_with_name(None)
    }

    /// XML form with an optional `NAME` attribute, as used by definitions files.
    pub(crate) fn xml_with_name(&self, name: Option<&str>) -> String {
        let mut out = String::from("<MESSAGE");
        if let Some(name) = name {
            out.push_str(&format!(" NAME=\"{}\"", escape(name)));
        }
        out.push_str(&format!(
            " SUBJECT=\"{}\" KIND=\"{}\">\n",
            escape(self.subject()),
            self.kind()
        ));

        if !self.config().is_empty() {
            out.push_str(&self.config().to_xml());
            out.push('\n');
        }

        for field in self.fields() {
            let value = field.value();
            out.push_str(&format!(
                "\t<FIELD NAME=\"{}\" TYPE=\"{}\"",
                escape(field.name()),
                field.field_type()
            ));
            if field.is_header() {
                out.push_str(" HEAD=\"T\"");
            }
            if let Some(bits) = value.float_bits() {
                out.push_str(&format!(" BITS=\"{bits}\""));
            }
            out.push_str(&format!(">{}</FIELD>\n", escape(&value.to_text())));
        }

        out.push_str("</MESSAGE>");
        out
    }

    pub fn from_xml(data: &str) -> Result<Message> {
        let root = XmlElement::parse(data)?;
        Message::from_xml_element(&root)
    }

    pub(crate) fn from_xml_element(root: &XmlElement) -> Result<Message> {
        if !root.is("MESSAGE") {
            return Err(GmsecError::parse(format!(
                "expected a MESSAGE element, found {}",
                root.name
            )));
        }

        let mut msg = Message::new();
        if let Some(subject) = root.attr("SUBJECT").filter(|s| !s.is_empty()) {
            subject::validate_subject(subject, true)
                .map_err(|e| GmsecError::parse(e.to_string()))?;
            msg.set_subject_unchecked(subject.to_string());
        }

        if let Some(config) = root.child("CONFIG") {
            msg.set_config(Config::from_xml_element(config)?);
        }

        for element in root.children_named("FIELD") {
            msg.put_field(field_from_xml(element)?);
        }

        match root.attr("KIND") {
            Some(kind) => msg.set_kind(kind.parse::<MessageKind>()?),
            None => msg.deduce_kind(),
        }

        Ok(msg)
    }
}

fn field_from_xml(element: &XmlElement) -> Result<Field> {
    let name = element
        .attr("NAME")
        .ok_or_else(|| GmsecError::parse("FIELD element has no NAME attribute"))?;
    let type_name = element
        .attr("TYPE")
        .ok_or_else(|| GmsecError::parse(format!("FIELD {name} has no TYPE attribute")))?;
    let ty = FieldType::from_name(type_name)
        .ok_or_else(|| GmsecError::parse(format!("FIELD {name} has unknown TYPE {type_name}")))?;

    let value = match element.attr("BITS") {
        Some(bits) if ty.is_float() => FieldValue::from_float_bits(ty, bits)?,
        _ => FieldValue::parse(ty, &element.text)?,
    };
    let header = element
        .attr("HEAD")
        .is_some_and(|h| h.eq_ignore_ascii_case("T") || h.eq_ignore_ascii_case("TRUE"));

    Field::new(name, value)
        .map(|f| f.with_header(header))
        .map_err(|e| GmsecError::parse(e.to_string()))
}
