//! WebSocket bus server
//!
//! Accepts WebSocket peers, registers each one as a bus client and
//! translates their JSON frames into broker operations:
//! - `subscribe` / `unsubscribe` manage the peer's patterns
//! - `publish` fans an envelope out to every matching client
//!
//! Matching envelopes flow back to the peer as `deliver` frames; a frame
//! the server cannot act on is answered with an `error` frame.

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::topic::SubscriberId;
use crate::broker::{Bus, Envelope};
use crate::client::Client;
use crate::config::Settings;
use crate::subject;
use crate::transport::message::{ClientMessage, Operation, ServerMessage};
use crate::utils::{GmsecError, Result};

/// Binds `addr` and serves the bus until the listener fails.
pub async fn start_websocket_server(addr: String, bus: Bus, settings: Settings) -> Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    bus.lock()
        .set_max_clients(Some(settings.bus.max_connections));

    info!("WebSocket bus listening on ws://{}", addr);
    serve(listener, bus).await
}

/// Serves the bus on an already bound listener.
pub async fn serve(listener: TcpListener, bus: Bus) -> Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        debug!("Accepted TCP connection from {}", peer);
        spawn(handle_connection(stream, bus.clone()));
    }
}

async fn handle_connection(stream: TcpStream, bus: Bus) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake error: {}", e);
            return;
        }
    };
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let (tx, mut deliveries) = mpsc::unbounded_channel::<Envelope>();
    let client = Client::new(tx);
    let client_id = client.id.clone();

    let registered = bus.lock().register_client(client);
    if let Err(e) = registered {
        warn!("Rejecting WebSocket peer: {}", e);
        let _ = ws_sender
            .send(encode(&ServerMessage::Error {
                message: e.to_string(),
                operation: None,
            }))
            .await;
        let _ = ws_sender.close().await;
        return;
    }

    let (replies, mut reply_rx) = mpsc::unbounded_channel::<ServerMessage>();

    {
        let client_id = client_id.clone();
        spawn(async move {
            loop {
                let frame = tokio::select! {
                    Some(envelope) = deliveries.recv() => ServerMessage::Deliver { envelope },
                    Some(reply) = reply_rx.recv() => reply,
                    else => break,
                };
                if let Err(e) = ws_sender.send(encode(&frame)).await {
                    warn!("Failed to send frame to {}: {}", client_id, e);
                    break;
                }
            }
            let _ = ws_sender.close().await;
            debug!("Send loop closed for {}", client_id);
        });
    }

    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            WsMessage::Text(text) => {
                if let Err((operation, e)) = handle_frame(&bus, &client_id, text.as_str()) {
                    warn!("Frame from {} rejected: {}", client_id, e);
                    let _ = replies.send(ServerMessage::Error {
                        message: e.to_string(),
                        operation,
                    });
                }
            }
            WsMessage::Close(_) => break,
            _ => {}
        }
    }

    bus.lock().cleanup_client(&client_id);
    info!("{} disconnected", client_id);
}

/// Applies one client frame to the bus on behalf of `client_id`.
pub(crate) fn handle_client_message(bus: &Bus, client_id: &SubscriberId, text: &str) -> Result<()> {
    handle_frame(bus, client_id, text).map_err(|(_, e)| e)
}

/// Like `handle_client_message`, but a failure names the operation that
/// failed when the frame could be parsed.
fn handle_frame(
    bus: &Bus,
    client_id: &SubscriberId,
    text: &str,
) -> std::result::Result<(), (Option<Operation>, GmsecError)> {
    let msg = match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => msg,
        Err(e) => return Err((None, e.into())),
    };
    let operation = msg.operation();
    apply(bus, client_id, msg).map_err(|e| (Some(operation), e))
}

fn apply(bus: &Bus, client_id: &SubscriberId, msg: ClientMessage) -> Result<()> {
    let mut broker = bus.lock();

    match msg {
        ClientMessage::Subscribe { pattern, durable } => {
            subject::validate_pattern(&pattern, true)?;
            if durable {
                broker.subscribe_durable(&pattern, client_id.clone())?;
            } else {
                broker.subscribe(&pattern, client_id.clone());
            }
            debug!("{} subscribed to {}", client_id, pattern);
        }
        ClientMessage::Unsubscribe { pattern } => {
            broker.unsubscribe(&pattern, client_id);
            debug!("{} unsubscribed from {}", client_id, pattern);
        }
        ClientMessage::Publish { envelope, durable } => {
            subject::validate_subject(&envelope.subject, true)?;
            let subject = envelope.subject.clone();
            let delivered = if durable {
                broker.publish_durable(envelope)?
            } else {
                broker.publish(envelope)
            };
            debug!("{} published to {} ({} recipients)", client_id, subject, delivered);
        }
    }
    Ok(())
}

fn encode(frame: &ServerMessage) -> WsMessage {
    match serde_json::to_string(frame) {
        Ok(text) => WsMessage::text(text),
        Err(e) => WsMessage::text(format!(r#"{{"type":"error","message":"{e}"}}"#)),
    }
}
