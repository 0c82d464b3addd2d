use super::pubsub_client::Client;
use crate::broker::Envelope;
use crate::message::MessageKind;
use tokio::sync::mpsc;

#[test]
fn test_client_new() {
    let (tx, _) = mpsc::unbounded_channel::<Envelope>();
    let client = Client::new(tx);
    assert!(client.id.starts_with("client-"));

    let (tx, _) = mpsc::unbounded_channel::<Envelope>();
    assert_ne!(Client::new(tx).id, client.id);
}

#[test]
fn test_client_sender_delivers() {
    let (tx, mut rx) = mpsc::unbounded_channel::<Envelope>();
    let client = Client::new(tx);
    client
        .sender
        .send(Envelope::new("GMSEC.A", MessageKind::Publish, "{}"))
        .unwrap();
    assert_eq!(rx.try_recv().unwrap().subject, "GMSEC.A");
}
