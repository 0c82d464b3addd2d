use super::topic::Topic;
use super::{Broker, Bus, Envelope};
use crate::client::Client;
use crate::config::BusSettings;
use crate::message::MessageKind;
use crate::persistence::Persistence;
use tokio::sync::mpsc;

fn envelope(subject: &str, payload: &str) -> Envelope {
    Envelope::new(subject, MessageKind::Publish, payload)
}

fn register(broker: &mut Broker) -> (String, mpsc::UnboundedReceiver<Envelope>) {
    let (tx, rx) = mpsc::unbounded_channel::<Envelope>();
    let client = Client::new(tx);
    let id = client.id.clone();
    broker.register_client(client).unwrap();
    (id, rx)
}

#[test]
fn test_topic_subscribe_and_match() {
    let mut topic = Topic::new("GMSEC.*.HB");
    topic.subscribe("client1".to_string());
    topic.subscribe("client1".to_string());
    assert_eq!(topic.subscribers.len(), 1);
    assert!(topic.matches("GMSEC.SAT1.HB"));
    assert!(!topic.matches("GMSEC.SAT1.LOG"));

    topic.unsubscribe(&"client1".to_string());
    assert!(topic.is_empty());
}

#[test]
fn test_broker_new() {
    let broker = Broker::default();
    assert!(broker.topics.is_empty());
    assert!(broker.clients.is_empty());
    assert!(!broker.has_persistence());
}

#[test]
fn test_broker_register_and_remove_client() {
    let mut broker = Broker::default();
    let (client_id, _rx) = register(&mut broker);
    assert!(broker.is_registered(&client_id));

    broker.remove_client(&client_id);
    assert!(!broker.is_registered(&client_id));
}

#[test]
fn test_broker_rejects_clients_beyond_limit() {
    let mut broker = Broker::default();
    broker.set_max_clients(Some(1));
    let _first = register(&mut broker);

    let (tx, _rx) = mpsc::unbounded_channel::<Envelope>();
    assert!(broker.register_client(Client::new(tx)).is_err());
    assert_eq!(broker.client_count(), 1);
}

#[test]
fn test_broker_subscribe_and_unsubscribe() {
    let mut broker = Broker::default();
    let (client_id, _rx) = register(&mut broker);

    broker.subscribe("GMSEC.>", client_id.clone());
    assert!(broker.topics["GMSEC.>"].subscribers.contains(&client_id));

    broker.unsubscribe("GMSEC.>", &client_id);
    assert!(!broker.topics.contains_key("GMSEC.>"));
}

#[test]
fn test_broker_publish_matches_patterns() {
    let mut broker = Broker::default();
    let (wild, mut wild_rx) = register(&mut broker);
    let (exact, mut exact_rx) = register(&mut broker);
    broker.subscribe("GMSEC.*.CONST.SAT.>", wild);
    broker.subscribe("GMSEC.MSN.CONST.SAT.HB", exact);

    assert_eq!(broker.publish(envelope("GMSEC.MSN.CONST.SAT.HB", "hb")), 2);
    assert_eq!(wild_rx.try_recv().unwrap().payload, "hb");
    assert_eq!(exact_rx.try_recv().unwrap().payload, "hb");

    assert_eq!(broker.publish(envelope("GMSEC.X.CONST.SAT.LOG.1", "log")), 1);
    assert_eq!(wild_rx.try_recv().unwrap().payload, "log");
    assert!(exact_rx.try_recv().is_err());

    assert_eq!(broker.publish(envelope("GMSEC.MSN.CONST.SAT", "short")), 0);
}

#[test]
fn test_overlapping_patterns_deliver_once() {
    let mut broker = Broker::default();
    let (client_id, mut rx) = register(&mut broker);
    broker.subscribe("GMSEC.>", client_id.clone());
    broker.subscribe("GMSEC.A.*", client_id.clone());
    broker.subscribe("GMSEC.A.B", client_id);

    assert_eq!(broker.publish(envelope("GMSEC.A.B", "once")), 1);
    assert_eq!(rx.try_recv().unwrap().payload, "once");
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_broker_cleanup_client() {
    let mut broker = Broker::default();
    let (client_id, _rx) = register(&mut broker);
    let (other, _other_rx) = register(&mut broker);
    broker.subscribe("GMSEC.A", client_id.clone());
    broker.subscribe("GMSEC.B", client_id.clone());
    broker.subscribe("GMSEC.B", other.clone());

    broker.cleanup_client(&client_id);
    assert!(!broker.is_registered(&client_id));
    let patterns: Vec<&str> = broker.patterns().collect();
    assert_eq!(patterns, vec!["GMSEC.B"]);
    assert!(broker.topics["GMSEC.B"].subscribers.contains(&other));
}

#[test]
fn test_publish_to_client_with_closed_channel() {
    let mut broker = Broker::default();
    let (client_id, rx) = register(&mut broker);
    broker.subscribe("GMSEC.A", client_id);
    drop(rx);

    assert_eq!(broker.publish(envelope("GMSEC.A", "lost")), 0);
}

#[test]
fn test_durable_subscribe_replays_stored() {
    let persistence = Persistence::temporary(None, None).unwrap();
    let mut broker = Broker::new_with_persistence(persistence);

    broker
        .publish_durable(envelope("GMSEC.SAT1.HB", "stored"))
        .unwrap();
    broker.publish(envelope("GMSEC.SAT1.HB", "not stored"));

    let (client_id, mut rx) = register(&mut broker);
    assert_eq!(broker.subscribe_durable("GMSEC.*.HB", client_id).unwrap(), 1);
    assert_eq!(rx.try_recv().unwrap().payload, "stored");
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_durable_without_store_is_plain() {
    let mut broker = Broker::default();
    let (client_id, mut rx) = register(&mut broker);
    assert_eq!(broker.subscribe_durable("GMSEC.A", client_id).unwrap(), 0);
    assert_eq!(broker.publish_durable(envelope("GMSEC.A", "x")).unwrap(), 1);
    assert_eq!(rx.try_recv().unwrap().payload, "x");
}

#[test]
fn test_from_settings_applies_limits() {
    let dir = tempfile::tempdir().unwrap();
    let settings = BusSettings {
        max_connections: 2,
        message_ttl_secs: 60,
        max_messages_per_subject: 10,
        persistence_path: Some(dir.path().join("bus").to_string_lossy().into_owned()),
    };
    let mut broker = Broker::from_settings(&settings).unwrap();
    assert!(broker.has_persistence());
    let _a = register(&mut broker);
    let _b = register(&mut broker);
    let (tx, _rx) = mpsc::unbounded_channel::<Envelope>();
    assert!(broker.register_client(Client::new(tx)).is_err());
}

#[test]
fn test_bus_handle_is_shared() {
    let bus = Bus::new();
    let other = bus.clone();
    let (tx, _rx) = mpsc::unbounded_channel::<Envelope>();
    bus.lock().register_client(Client::new(tx)).unwrap();
    assert_eq!(other.lock().client_count(), 1);
}
