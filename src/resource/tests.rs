use std::time::Duration;

use tokio::sync::mpsc;

use super::*;
use crate::broker::Bus;

const COMPONENT: &str = "RSRC-TEST";

async fn observer(bus: &Bus) -> Connection {
    let conn = Connection::with_bus(&Config::new(), bus).unwrap();
    conn.connect().await.unwrap();
    conn.subscribe("C2MS.>").unwrap();
    conn
}

fn generator(bus: &Bus, config: &Config, rate: u16) -> ResourceGenerator {
    let conn = Connection::with_bus(config, bus).unwrap();
    let rsrc = ResourceGenerator::with_connection(conn, rate, 1, 3).unwrap();
    rsrc.set_field(Field::new("COMPONENT", COMPONENT).unwrap().with_header(true))
        .unwrap();
    rsrc
}

#[test]
fn test_intervals_are_checked() {
    let bus = Bus::new();
    for (sample, average) in [(0, 10), (5, 4)] {
        let conn = Connection::with_bus(&Config::new(), &bus).unwrap();
        assert!(matches!(
            ResourceGenerator::with_connection(conn, 1, sample, average),
            Err(GmsecError::IllegalArgument(_))
        ));
    }
    assert!(matches!(
        ResourceGenerator::new(&Config::new(), 1, 0, 10),
        Err(GmsecError::IllegalArgument(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_resource_messages_count_up() {
    let bus = Bus::new();
    let watcher = observer(&bus).await;
    let rsrc = generator(&bus, &Config::new(), 2);
    rsrc.set_field(Field::new("CUSTOM-FIELD", 3i16).unwrap())
        .unwrap();

    assert!(rsrc.start().await.unwrap());
    assert!(!rsrc.start().await.unwrap());
    assert!(rsrc.is_running());

    for expected in 1..=3u16 {
        let msg = watcher.receive(5000).await.unwrap().unwrap();
        assert!(msg.subject().ends_with(&format!(".MSG.RSRC.{COMPONENT}")));
        assert_eq!(msg.schema_id(), Some(RESOURCE_SCHEMA));
        assert_eq!(msg.get_i64_value(COUNTER_FIELD).unwrap(), i64::from(expected));
        assert_eq!(msg.get_i64_value(PUB_RATE_FIELD).unwrap(), 2);
        assert_eq!(msg.get_i64_value("CUSTOM-FIELD").unwrap(), 3);
        assert!(!msg.get_string_value(OPER_SYS_FIELD).unwrap().is_empty());
        for name in ["NUM-OF-CPUS", "CPU.TOTAL.UTIL", "MEM.UTIL", "NUM-OF-DISKS", "NUM-OF-NET-PORTS"] {
            assert!(msg.has_field(name), "missing {name}");
        }
    }

    assert!(rsrc.stop().await.unwrap());
    assert!(!rsrc.stop().await.unwrap());
    assert!(!rsrc.is_running());
    assert!(watcher.receive(5000).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_set_field_and_rate_change() {
    let bus = Bus::new();
    let watcher = observer(&bus).await;
    let rsrc = generator(&bus, &Config::new(), 60);

    rsrc.start().await.unwrap();
    assert!(watcher.receive(1000).await.unwrap().is_some());

    assert!(!rsrc.set_field(Field::new("MISSION-ID", "MSN").unwrap()).unwrap());
    assert!(rsrc.set_field(Field::new("MISSION-ID", "MSN2").unwrap()).unwrap());
    rsrc.set_field(Field::new(PUB_RATE_FIELD, 5u16).unwrap())
        .unwrap();
    assert_eq!(rsrc.publish_rate(), 5);

    let msg = watcher.receive(1000).await.unwrap().unwrap();
    assert_eq!(msg.get_i64_value(PUB_RATE_FIELD).unwrap(), 5);
    assert_eq!(msg.get_string_value("MISSION-ID").unwrap(), "MSN2");
    assert_eq!(msg.get_i64_value(COUNTER_FIELD).unwrap(), 2);

    assert!(matches!(
        rsrc.set_field(Field::new(COUNTER_FIELD, 7u16).unwrap()),
        Err(GmsecError::IllegalArgument(_))
    ));
    assert!(matches!(
        rsrc.set_field(Field::new(PUB_RATE_FIELD, 70_000i32).unwrap()),
        Err(GmsecError::IllegalArgument(_))
    ));
    rsrc.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_zero_rate_publishes_once() {
    let bus = Bus::new();
    let watcher = observer(&bus).await;
    let rsrc = generator(&bus, &Config::new(), 0);

    rsrc.start().await.unwrap();
    assert!(watcher.receive(1000).await.unwrap().is_some());
    assert!(watcher.receive(5000).await.unwrap().is_none());
    assert!(!rsrc.is_running());
}

#[tokio::test]
async fn test_start_rejects_non_compliant_template() {
    let bus = Bus::new();
    let validating = Config::from_pairs([(options::MSG_CONTENT_VALIDATE_SEND, "true")]).unwrap();
    let rsrc = generator(&bus, &validating, 1);

    // MISSION-ID is a required header and was never set.
    assert!(matches!(rsrc.start().await, Err(GmsecError::Validation(_))));
    assert!(!rsrc.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_publish_failure_is_reported() {
    let bus = Bus::new();
    let failing = Config::from_pairs([(options::SIM_PUBLISH_FAILURE, "true")]).unwrap();
    let rsrc = generator(&bus, &failing, 1);

    let (tx, mut rx) = mpsc::unbounded_channel();
    rsrc.connection()
        .register_event_callback(Event::MsgPublishFailure, move |_, status, _| {
            let _ = tx.send(status.code());
        });

    rsrc.start().await.unwrap();
    let code = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap();
    assert_eq!(code, Some(StatusCode::PublishFailed));
    assert!(rsrc.is_running());
    rsrc.stop().await.unwrap();
}

#[test]
fn test_create_resource_message() {
    let factory = MessageFactory::new(&Config::new()).unwrap();

    let msg = ResourceGenerator::create_resource_message(&factory, 1, 5).unwrap();
    assert_eq!(msg.schema_id(), Some(RESOURCE_SCHEMA));
    assert_eq!(msg.get_string_value("MESSAGE-SUBTYPE").unwrap(), "RSRC");
    assert!(msg.has_field(OPER_SYS_FIELD));
    assert!(msg.has_field("CPU.TOTAL.UTIL"));
    assert!(!msg.has_field(COUNTER_FIELD));

    assert!(matches!(
        ResourceGenerator::create_resource_message(&factory, 0, 5),
        Err(GmsecError::IllegalArgument(_))
    ));
}
