use crate::broker::{Bus, Envelope};
use crate::config::{Config, Settings};
use crate::connection::{Connection, Event};
use crate::message::MessageKind;
use crate::transport::{Operation, Transport};
use crate::utils::StatusCode;
use crate::transport::message::{ClientMessage, ServerMessage};
use crate::transport::websocket::start_websocket_server;
use crate::transport::ws_client::WebSocketTransport;
use futures_util::{SinkExt, Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message as WsMessage;

async fn setup_server(settings: Settings) -> (String, Bus) {
    let addr = format!(
        "127.0.0.1:{}",
        portpicker::pick_unused_port().expect("No free ports")
    );
    let bus = Bus::new();

    tokio::spawn(start_websocket_server(addr.clone(), bus.clone(), settings));

    // Give the server a moment to start up
    sleep(Duration::from_millis(100)).await;
    (format!("ws://{addr}"), bus)
}

async fn read_frame<S>(ws_stream: &mut S) -> ServerMessage
where
    S: Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let frame = timeout(Duration::from_secs(2), ws_stream.next())
        .await
        .expect("Timed out waiting for a frame")
        .expect("Stream closed")
        .unwrap();
    let raw_data = frame.into_data();
    serde_json::from_slice(&raw_data).unwrap_or_else(|e| {
        panic!("Failed to deserialize ServerMessage from '{raw_data:?}': {e}");
    })
}

#[tokio::test]
async fn test_raw_peer_subscribe_and_deliver() {
    let (url, bus) = setup_server(Settings::default()).await;
    let (mut ws_stream, _) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .expect("WebSocket handshake failed");

    let subscribe = ClientMessage::Subscribe {
        pattern: "GMSEC.>".to_string(),
        durable: false,
    };
    ws_stream
        .send(WsMessage::text(serde_json::to_string(&subscribe).unwrap()))
        .await
        .unwrap();

    let publish = ClientMessage::Publish {
        envelope: Envelope::new("GMSEC.TEST", MessageKind::Publish, "hello"),
        durable: false,
    };
    ws_stream
        .send(WsMessage::text(serde_json::to_string(&publish).unwrap()))
        .await
        .unwrap();

    match read_frame(&mut ws_stream).await {
        ServerMessage::Deliver { envelope } => {
            assert_eq!(envelope.subject, "GMSEC.TEST");
            assert_eq!(envelope.payload, "hello");
        }
        other => panic!("Expected Deliver, got {other:?}"),
    }
    assert_eq!(bus.lock().client_count(), 1);
}

#[tokio::test]
async fn test_invalid_frame_gets_error() {
    let (url, _bus) = setup_server(Settings::default()).await;
    let (mut ws_stream, _) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .expect("WebSocket handshake failed");

    ws_stream
        .send(WsMessage::text(r#"{"type":"subscribe","pattern":"BAD..PATTERN"}"#))
        .await
        .unwrap();

    match read_frame(&mut ws_stream).await {
        ServerMessage::Error { message, operation } => {
            assert!(message.contains("BAD..PATTERN"));
            assert_eq!(operation, Some(Operation::Subscribe));
        }
        other => panic!("Expected Error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_connection_limit() {
    let mut settings = Settings::default();
    settings.bus.max_connections = 1;
    let (url, bus) = setup_server(settings).await;

    let (_first, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    sleep(Duration::from_millis(50)).await;

    let (mut second, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    match read_frame(&mut second).await {
        ServerMessage::Error { message, .. } => assert!(message.contains("full")),
        other => panic!("Expected Error, got {other:?}"),
    }
    assert_eq!(bus.lock().client_count(), 1);
}

#[tokio::test]
async fn test_transport_pair_over_server() {
    let (url, bus) = setup_server(Settings::default()).await;

    let publisher = WebSocketTransport::new(&url).unwrap();
    let subscriber = WebSocketTransport::new(&url).unwrap();
    let _pub_rx = publisher.connect().await.unwrap().envelopes;
    let mut sub_rx = subscriber.connect().await.unwrap().envelopes;

    subscriber.subscribe("GMSEC.*.HB", &Config::new()).unwrap();
    sleep(Duration::from_millis(100)).await;

    publisher
        .publish(
            Envelope::new("GMSEC.SAT1.HB", MessageKind::Publish, "{}"),
            &Config::new(),
        )
        .unwrap();

    let envelope = timeout(Duration::from_secs(2), sub_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(envelope.subject, "GMSEC.SAT1.HB");
    assert!(subscriber.mw_info().starts_with("websocket ws://"));

    subscriber.disconnect().await.unwrap();
    publisher.disconnect().await.unwrap();
    sleep(Duration::from_millis(100)).await;
    assert_eq!(bus.lock().client_count(), 0);
}

#[tokio::test]
async fn test_transport_errors() {
    assert!(WebSocketTransport::new("http://localhost").is_err());

    let port = portpicker::pick_unused_port().expect("No free ports");
    let transport = WebSocketTransport::new(&format!("ws://127.0.0.1:{port}")).unwrap();
    assert!(transport.connect().await.is_err());
    assert!(transport.subscribe("GMSEC.A", &Config::new()).is_err());
}

#[tokio::test]
async fn test_transport_forwards_server_errors() {
    let (url, _bus) = setup_server(Settings::default()).await;
    let transport = WebSocketTransport::new(&url).unwrap();
    let mut inbound = transport.connect().await.unwrap();

    // The client sends frames as-is; the server is the one that checks them.
    transport.subscribe("GMSEC..BAD", &Config::new()).unwrap();
    let fault = timeout(Duration::from_secs(2), inbound.faults.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fault.operation, Some(Operation::Subscribe));
    assert!(fault.message.contains("GMSEC..BAD"));

    transport.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_server_rejections_reach_event_callbacks() {
    let (url, _bus) = setup_server(Settings::default()).await;
    let transport = Arc::new(WebSocketTransport::new(&url).unwrap());
    let conn = Connection::with_transport(&Config::new(), transport.clone()).unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let publish_tx = tx.clone();
    conn.register_event_callback(Event::MsgPublishFailure, move |_, status, event| {
        let _ = publish_tx.send((event, status.code()));
    });
    conn.register_event_callback(Event::ConnectionException, move |_, status, event| {
        let _ = tx.send((event, status.code()));
    });
    conn.connect().await.unwrap();

    transport
        .publish(
            Envelope::new("GMSEC..BAD", MessageKind::Publish, "{}"),
            &Config::new(),
        )
        .unwrap();
    let reported = timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
    assert_eq!(
        reported,
        Some((Event::MsgPublishFailure, StatusCode::PublishFailed))
    );

    transport.subscribe("GMSEC..BAD", &Config::new()).unwrap();
    let reported = timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
    assert_eq!(
        reported,
        Some((Event::ConnectionException, StatusCode::OperationRejected))
    );

    conn.disconnect().await.unwrap();
}
