use std::sync::Arc;

use super::*;
use crate::config::Config;
use crate::message::field::Field;
use crate::message::{DataType, Message, MessageKind};
use crate::utils::{GmsecError, Status, StatusClass, StatusCode};

fn standard_fields() -> Vec<Field> {
    vec![
        Field::new("MISSION-ID", "MSN").unwrap().with_header(true),
        Field::new("COMPONENT", "GMSEC-RS").unwrap().with_header(true),
        Field::new("SAT-ID-PHYSICAL", "SAT1").unwrap().with_header(true),
    ]
}

#[test]
fn test_default_specification_contents() {
    let spec = Specification::default();
    assert_eq!(spec.version(), DEFAULT_VERSION);
    assert_eq!(spec.schema_level(), SchemaLevel::Level0);

    let ids: Vec<&str> = spec.message_specifications().map(|m| m.schema_id()).collect();
    assert_eq!(ids, vec!["MSG.HB", "MSG.RSRC", "MSG.LOG", "REQ.DIR", "RESP.DIR"]);

    let hb = spec.message_specification("MSG.HB").unwrap();
    assert_eq!(hb.message_type(), Some("MSG"));
    assert_eq!(hb.message_subtype(), Some("HB"));
    assert_eq!(hb.kind(), MessageKind::Publish);
    assert_eq!(spec.message_specification("REQ.DIR").unwrap().kind(), MessageKind::Request);
    assert_eq!(spec.find_schema("resp", "dir").unwrap().schema_id(), "RESP.DIR");
    assert!(spec.headers().iter().any(|h| h.name() == "MISSION-ID"));
}

#[test]
fn test_create_message_from_template() {
    let factory = MessageFactory::new(&Config::new()).unwrap();
    factory.set_standard_fields(standard_fields());

    let msg = factory.create_message("REQ.DIR").unwrap();
    assert_eq!(msg.kind(), MessageKind::Request);
    assert_eq!(msg.schema_id(), Some("REQ.DIR"));
    assert_eq!(msg.get_string_value("MESSAGE-TYPE").unwrap(), "REQ");
    assert_eq!(msg.get_string_value("MESSAGE-SUBTYPE").unwrap(), "DIR");
    assert_eq!(msg.get_string_value("MISSION-ID").unwrap(), "MSN");

    assert!(matches!(
        factory.create_message(""),
        Err(GmsecError::IllegalArgument(_))
    ));
    assert!(matches!(
        factory.create_message("MSG.NOPE"),
        Err(GmsecError::IllegalArgument(_))
    ));
}

#[test]
fn test_unsupported_version_rejected() {
    let config = Config::from_pairs([("GMSEC-SPECIFICATION-VERSION", "201400")]).unwrap();
    assert!(MessageFactory::new(&config).is_err());
}

#[test]
fn test_validation_reports_missing_and_mistyped_fields() {
    let factory = MessageFactory::new(&Config::new()).unwrap();
    factory.set_standard_fields(standard_fields());

    let mut msg = factory.create_message("MSG.HB").unwrap();
    let status = factory.validate(&msg);
    assert!(status.is_error());
    assert_eq!(status.class(), StatusClass::Validation);
    assert_eq!(status.code(), StatusCode::MissingRequiredField);
    assert!(status.reason().contains("PUB-RATE"));
    assert!(status.reason().contains("COUNTER"));

    msg.add_field("PUB-RATE", 30u16).unwrap();
    msg.add_field("COUNTER", "one").unwrap();
    let status = factory.validate(&msg);
    assert_eq!(status.code(), StatusCode::IncorrectFieldType);

    msg.add_field("COUNTER", 1i32).unwrap();
    assert!(!factory.validate(&msg).is_error());

    msg.add_field("MESSAGE-SUBTYPE", "LOG").unwrap();
    assert_eq!(factory.validate(&msg).code(), StatusCode::IncorrectFieldValue);
}

#[test]
fn test_message_without_schema_fails_validation() {
    let factory = MessageFactory::new(&Config::new()).unwrap();
    let msg = Message::with_subject("GMSEC.TEST", MessageKind::Publish).unwrap();
    assert_eq!(factory.validate(&msg).code(), StatusCode::UnknownSchema);
}

#[test]
fn test_custom_validator_runs_after_compliance() {
    let factory = MessageFactory::new(&Config::new()).unwrap();
    factory.set_standard_fields(standard_fields());
    factory.register_message_validator(Arc::new(|msg: &Message| {
        if msg.has_field("MSG-TEXT") {
            Status::ok()
        } else {
            Status::new(
                StatusClass::Validation,
                StatusCode::CustomValidation,
                "MSG-TEXT is mandatory here",
            )
        }
    }));

    let mut msg = factory.create_message("MSG.LOG").unwrap();
    // Built-in compliance fails first.
    assert_eq!(factory.validate(&msg).code(), StatusCode::MissingRequiredField);

    msg.add_field("SUBCLASS", "INFO").unwrap();
    msg.add_field("OCCURRENCE-TYPE", "SYS").unwrap();
    msg.add_field("SEVERITY", 1i16).unwrap();
    assert_eq!(factory.validate(&msg).code(), StatusCode::CustomValidation);

    msg.add_field("MSG-TEXT", "hello").unwrap();
    assert!(!factory.validate(&msg).is_error());
}

#[test]
fn test_subject_from_template() {
    let factory = MessageFactory::new(&Config::new()).unwrap();
    factory.set_standard_fields(standard_fields());

    let mut msg = factory.create_message("MSG.HB").unwrap();
    assert_eq!(
        factory.subject_for(&msg).unwrap(),
        "C2MS.FILL.FILL.MSN.FILL.SAT1.FILL.MSG.HB.GMSEC-RS"
    );

    msg.set_subject("GMSEC.EXPLICIT").unwrap();
    assert_eq!(factory.subject_for(&msg).unwrap(), "GMSEC.EXPLICIT");

    let bare = factory.create_message_bare();
    assert!(factory.subject_for(&bare).is_err());
}

#[test]
fn test_from_data_attaches_schema_and_message_config() {
    let factory = MessageFactory::new(&Config::new()).unwrap();
    factory.set_message_config(Config::from_pairs([("MW-REPLY-STRING", "GMSEC.R")]).unwrap());

    let mut source = Message::new();
    source.add_field("MESSAGE-TYPE", "RESP").unwrap();
    source.add_field("MESSAGE-SUBTYPE", "DIR").unwrap();
    source.add_config_value("MW-REPLY-STRING", "OTHER").unwrap();

    let msg = factory.from_data(&source.to_json(), DataType::Json).unwrap();
    assert_eq!(msg.schema_id(), Some("RESP.DIR"));
    assert_eq!(msg.config().get_value("MW-REPLY-STRING"), Some("GMSEC.R"));
}

#[test]
fn test_custom_specification() {
    let mut spec = Specification::new(DEFAULT_VERSION);
    spec.add_message_specification(
        MessageSpecification::new("MSG.TLM", &["TLM", "{MISSION-ID}"])
            .unwrap()
            .with_field(
                FieldSpecification::required("MESSAGE-TYPE", crate::message::FieldType::String)
                    .with_value("MSG"),
            )
            .with_field(FieldSpecification::optional("SAMPLE", crate::message::FieldType::F64)),
    );
    let factory = MessageFactory::with_specification(spec);
    let mut msg = factory.create_message("MSG.TLM").unwrap();
    msg.add_field("MISSION-ID", "M1").unwrap();
    assert_eq!(factory.subject_for(&msg).unwrap(), "TLM.M1");
    assert!(MessageSpecification::new("", &[]).is_err());
}
