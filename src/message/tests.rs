use super::*;
use crate::utils::GmsecError;

fn every_type_message() -> Message {
    let mut msg = Message::with_subject("GMSEC.TEST.ALL.TYPES", MessageKind::Request).unwrap();
    msg.add_field("BOOL", true).unwrap();
    msg.add_field("CHAR", 'x').unwrap();
    msg.add_field("I8", -8i8).unwrap();
    msg.add_field("I16", -16i16).unwrap();
    msg.add_field("I32", -32i32).unwrap();
    msg.add_field("I64", i64::MIN).unwrap();
    msg.add_field("U8", 8u8).unwrap();
    msg.add_field("U16", u16::MAX).unwrap();
    msg.add_field("U32", 32u32).unwrap();
    msg.add_field("U64", u64::MAX).unwrap();
    msg.add_field("F32", 0.1f32).unwrap();
    msg.add_field("F64", std::f64::consts::PI).unwrap();
    msg.add_field("STRING", "  padded <&> \"quoted\"  ").unwrap();
    msg.add_field("BIN", vec![0u8, 1, 0xAB, 0xFF]).unwrap();
    msg.put_field(Field::new("HEADER", "yes").unwrap().with_header(true));
    msg
}

#[test]
fn test_add_and_get_field() {
    let mut msg = Message::new();
    assert_eq!(msg.kind(), MessageKind::Publish);

    assert!(!msg.add_field("COUNT", 1i32).unwrap());
    assert!(msg.add_field("COUNT", 2i64).unwrap());
    assert_eq!(msg.field_count(), 1);

    let field = msg.get_field("COUNT").unwrap();
    assert_eq!(field.value(), &FieldValue::I64(2));
    assert_eq!(field.field_type(), FieldType::I64);
    assert!(msg.get_field("MISSING").is_none());

    assert!(matches!(
        msg.add_field("", 1i32),
        Err(GmsecError::IllegalArgument(_))
    ));
}

#[test]
fn test_field_order_and_clear() {
    let mut msg = Message::new();
    msg.add_field("C", 1u8).unwrap();
    msg.add_field("A", 2u8).unwrap();
    msg.add_field("B", 3u8).unwrap();
    assert!(msg.clear_field("A"));
    assert!(!msg.clear_field("A"));

    let names: Vec<&str> = msg.fields().map(|f| f.name()).collect();
    assert_eq!(names, vec!["C", "B"]);

    msg.clear_fields();
    assert_eq!(msg.field_count(), 0);
}

#[test]
fn test_typed_value_conversion() {
    let mut msg = Message::new();
    msg.add_field("NUM", "42").unwrap();
    msg.add_field("FLAG", 1u16).unwrap();
    msg.add_field("BLOB", vec![1u8]).unwrap();

    assert_eq!(msg.get_i64_value("NUM").unwrap(), 42);
    assert_eq!(msg.get_f64_value("NUM").unwrap(), 42.0);
    assert!(msg.get_bool_value("FLAG").unwrap());
    assert_eq!(msg.get_string_value("BLOB").unwrap(), "01");
    assert!(matches!(
        msg.get_i64_value("BLOB"),
        Err(GmsecError::TypeConversion(_))
    ));
    assert!(matches!(
        msg.get_i64_value("NONE"),
        Err(GmsecError::NotFound(_))
    ));
}

#[test]
fn test_subject_validation() {
    let mut msg = Message::new();
    assert!(msg.set_subject("GMSEC.MISSION.SAT.MSG").is_ok());
    assert!(msg.set_subject("GMSEC.*.SAT").is_err());
    assert!(msg.set_subject("").is_err());
    assert_eq!(msg.subject(), "GMSEC.MISSION.SAT.MSG");
}

#[test]
fn test_xml_round_trip_all_types() {
    let msg = every_type_message();
    let xml = msg.to_xml();
    assert!(xml.contains("KIND=\"REQUEST\""));
    assert!(xml.contains("HEAD=\"T\""));

    let decoded = Message::from_data(&xml, DataType::Xml).unwrap();
    assert_eq!(decoded, msg);
    assert_eq!(decoded.kind(), MessageKind::Request);
    assert!(decoded.get_field("HEADER").unwrap().is_header());
}

#[test]
fn test_json_round_trip_all_types() {
    let msg = every_type_message();
    let decoded = Message::from_data(&msg.to_json(), DataType::Json).unwrap();
    assert_eq!(decoded, msg);
}

#[test]
fn test_round_trip_keeps_message_config() {
    let mut msg = Message::with_subject("GMSEC.TEST", MessageKind::Reply).unwrap();
    msg.add_config_value("MW-REPLY-STRING", "GMSEC.REPLY").unwrap();

    assert_eq!(Message::from_xml(&msg.to_xml()).unwrap(), msg);
    assert_eq!(Message::from_json(&msg.to_json()).unwrap(), msg);
}

#[test]
fn test_nan_float_round_trips_through_bits() {
    let mut msg = Message::new();
    msg.add_field("NAN", f64::NAN).unwrap();
    let decoded = Message::from_xml(&msg.to_xml()).unwrap();
    let value = decoded.get_f64_value("NAN").unwrap();
    assert!(value.is_nan());
}

#[test]
fn test_decode_accepts_type_aliases_and_deduces_kind() {
    let xml = r#"<MESSAGE SUBJECT="GMSEC.A.B">
        <FIELD NAME="MESSAGE-TYPE" TYPE="STRING">REQ</FIELD>
        <FIELD NAME="S" TYPE="SHORT">-3</FIELD>
        <FIELD NAME="D" TYPE="DOUBLE">1.25</FIELD>
        <FIELD NAME="B" TYPE="BLOB">abcd</FIELD>
        <FIELD NAME="F" TYPE="BOOLEAN">false</FIELD>
    </MESSAGE>"#;
    let msg = Message::from_xml(xml).unwrap();
    assert_eq!(msg.kind(), MessageKind::Request);
    assert_eq!(msg.get_field("S").unwrap().value(), &FieldValue::I16(-3));
    assert_eq!(msg.get_field("D").unwrap().value(), &FieldValue::F64(1.25));
    assert_eq!(
        msg.get_field("B").unwrap().value(),
        &FieldValue::Binary(vec![0xAB, 0xCD])
    );
    assert_eq!(msg.get_field("F").unwrap().value(), &FieldValue::Bool(false));
}

#[test]
fn test_malformed_data_is_parse_error() {
    let bad = [
        r#"<MESSAGE SUBJECT="A"><FIELD NAME="X" TYPE="I8">300</FIELD></MESSAGE>"#,
        r#"<MESSAGE SUBJECT="A"><FIELD NAME="X" TYPE="NOPE">1</FIELD></MESSAGE>"#,
        r#"<MESSAGE SUBJECT="A..B"/>"#,
        r#"<MESSAGE KIND="SOMETIMES"/>"#,
        r#"<CONFIG/>"#,
        r#"<MESSAGE>"#,
    ];
    for data in bad {
        assert!(
            matches!(Message::from_xml(data), Err(GmsecError::Parse(_))),
            "expected parse error for {data}"
        );
    }
    assert!(matches!(
        Message::from_json(r#"{"MESSAGE":{"FIELD":[{"NAME":"X"}]}}"#),
        Err(GmsecError::Parse(_))
    ));
}

#[test]
fn test_response_status() {
    let mut reply = Message::new();
    assert_eq!(reply.response_status(), None);

    reply.set_response_status(ResponseStatus::WorkingKeepAlive);
    assert_eq!(reply.response_status(), Some(ResponseStatus::WorkingKeepAlive));
    assert_eq!(reply.get_field(RESPONSE_STATUS_FIELD).unwrap().field_type(), FieldType::I16);

    reply.add_field(RESPONSE_STATUS_FIELD, 6u32).unwrap();
    assert_eq!(reply.response_status(), Some(ResponseStatus::FinalMessage));

    reply.add_field(RESPONSE_STATUS_FIELD, 99i32).unwrap();
    assert_eq!(reply.response_status(), None);
    assert_eq!(reply.response_status_code(), Some(99));

    assert!(!ResponseStatus::Acknowledgement.is_terminal());
    assert!(!ResponseStatus::WorkingKeepAlive.is_terminal());
    assert!(ResponseStatus::SuccessfulCompletion.is_terminal());
    assert!(ResponseStatus::FailedCompletion.is_terminal());
    assert!(ResponseStatus::InvalidRequest.is_terminal());
    assert!(ResponseStatus::FinalMessage.is_terminal());
    assert_eq!(ResponseStatus::InvalidRequest.code(), 5);
}

#[test]
fn test_kind_from_message_type() {
    assert_eq!(MessageKind::from_message_type("REQ"), MessageKind::Request);
    assert_eq!(MessageKind::from_message_type("resp"), MessageKind::Reply);
    assert_eq!(MessageKind::from_message_type("MSG"), MessageKind::Publish);
    assert_eq!("reply".parse::<MessageKind>().unwrap(), MessageKind::Reply);
}
