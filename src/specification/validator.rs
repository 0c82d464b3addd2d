use std::sync::Arc;

use super::{FieldMode, FieldSpecification, MessageSpecification, Specification};
use crate::message::Message;
use crate::message::field::FieldType;
use crate::utils::{Status, StatusClass, StatusCode};

/// A message compliance check.
///
/// Validators return a `Status` rather than an error so a custom
/// validator can run after the built-in one and report in the same form.
pub trait MessageValidator: Send + Sync {
    fn validate_message(&self, msg: &Message) -> Status;
}

impl<F> MessageValidator for F
where
    F: Fn(&Message) -> Status + Send + Sync,
{
    fn validate_message(&self, msg: &Message) -> Status {
        self(msg)
    }
}

/// Checks a message against the template of its schema: every required
/// field is present, present fields have the specified type and fixed
/// values match.
#[derive(Debug, Clone)]
pub struct ComplianceValidator {
    spec: Arc<Specification>,
}

impl ComplianceValidator {
    pub fn new(spec: Arc<Specification>) -> Self {
        Self { spec }
    }

    fn template_for(&self, msg: &Message) -> Option<&MessageSpecification> {
        msg.schema_id()
            .and_then(|id| self.spec.message_specification(id))
    }
}

impl MessageValidator for ComplianceValidator {
    fn validate_message(&self, msg: &Message) -> Status {
        let Some(template) = self.template_for(msg) else {
            return Status::new(
                StatusClass::Validation,
                StatusCode::UnknownSchema,
                format!(
                    "Message {} is not associated with a known schema",
                    msg.subject()
                ),
            );
        };

        let mut problems: Vec<(StatusCode, String)> = Vec::new();
        let headers = self.spec.headers().iter();
        let body = template.field_specifications().iter();

        for field_spec in headers.chain(body) {
            if let Some(problem) = check_field(msg, field_spec) {
                problems.push(problem);
            }
        }

        match problems.first() {
            None => Status::ok(),
            Some((code, _)) => {
                let reason = problems
                    .iter()
                    .map(|(_, reason)| reason.as_str())
                    .collect::<Vec<_>>()
                    .join("\n");
                Status::new(StatusClass::Validation, *code, reason)
            }
        }
    }
}

fn check_field(msg: &Message, spec: &FieldSpecification) -> Option<(StatusCode, String)> {
    let Some(field) = msg.get_field(spec.name()) else {
        return match spec.mode() {
            FieldMode::Required => Some((
                StatusCode::MissingRequiredField,
                format!("Missing required field {}", spec.name()),
            )),
            FieldMode::Optional => None,
        };
    };

    if !type_compatible(spec.field_type(), field.field_type()) {
        return Some((
            StatusCode::IncorrectFieldType,
            format!(
                "Field {} has type {}, expected {}",
                spec.name(),
                field.field_type(),
                spec.field_type()
            ),
        ));
    }

    if let Some(expected) = spec.value() {
        let actual = field.get_string_value();
        if !actual.eq_ignore_ascii_case(expected) {
            return Some((
                StatusCode::IncorrectFieldValue,
                format!(
                    "Field {} has value {}, expected {}",
                    spec.name(),
                    actual,
                    expected
                ),
            ));
        }
    }

    None
}

// Integer fields may be carried in any integer width.
fn type_compatible(expected: FieldType, actual: FieldType) -> bool {
    expected == actual || (expected.is_integer() && actual.is_integer())
}
