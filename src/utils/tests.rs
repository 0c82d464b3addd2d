use super::error::GmsecError;
use super::logging::{init, parse_level};
use super::time::format_time;
use chrono::{TimeZone, Utc};

#[test]
fn test_parse_level() {
    assert_eq!(parse_level("error"), tracing::Level::ERROR);
    assert_eq!(parse_level("WARNING"), tracing::Level::WARN);
    assert_eq!(parse_level(" debug "), tracing::Level::DEBUG);
    assert_eq!(parse_level("verbose"), tracing::Level::TRACE);
    assert_eq!(parse_level("nonsense"), tracing::Level::INFO);
}

#[test]
fn test_init_twice_does_not_panic() {
    init("debug");
    init("info");
}

#[test]
fn test_format_time_uses_day_of_year() {
    let at = Utc.with_ymd_and_hms(2024, 2, 1, 13, 4, 5).unwrap();
    assert_eq!(format_time(at), "2024-032-13:04:05.000");
}

#[test]
fn test_error_display() {
    let err = GmsecError::illegal_argument("field name cannot be empty");
    assert_eq!(err.to_string(), "illegal argument: field name cannot be empty");

    let err: GmsecError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
    assert!(matches!(err, GmsecError::Json(_)));
}

#[test]
fn test_xml_element_tree() {
    use super::xml::XmlElement;

    let root = XmlElement::parse(
        r#"<ROOT a="1"><item NAME="x">one &amp; two</item><ITEM NAME="y"/><other/></ROOT>"#,
    )
    .unwrap();
    assert!(root.is("root"));
    assert_eq!(root.attr("A"), Some("1"));
    assert_eq!(root.children_named("ITEM").count(), 2);
    assert_eq!(root.child("item").unwrap().text, "one & two");
    assert_eq!(root.child("item").unwrap().attr("name"), Some("x"));
    assert!(root.child("missing").is_none());

    assert!(matches!(XmlElement::parse("<ROOT>"), Err(GmsecError::Parse(_))));
}
