//! `Transport` over a WebSocket connection to a `gmsec server` bus.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tracing::{debug, warn};
use tungstenite::protocol::Message as WsMessage;

use super::message::{ClientMessage, ServerMessage};
use super::{Inbound, Transport, TransportFault};
use crate::broker::Envelope;
use crate::config::{Config, options};
use crate::utils::{GmsecError, Result};

#[derive(Debug)]
pub struct WebSocketTransport {
    url: String,
    outbound: Mutex<Option<UnboundedSender<ClientMessage>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl WebSocketTransport {
    /// `url` must be a `ws://` or `wss://` URL.
    pub fn new(url: &str) -> Result<Self> {
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(GmsecError::illegal_argument(format!(
                "'{url}' is not a WebSocket URL"
            )));
        }
        Ok(Self {
            url: url.to_string(),
            outbound: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn send(&self, frame: ClientMessage) -> Result<()> {
        let outbound = self.outbound.lock();
        let sender = outbound
            .as_ref()
            .ok_or_else(|| GmsecError::connection("WebSocket transport is not connected"))?;
        sender
            .send(frame)
            .map_err(|_| GmsecError::connection("WebSocket connection is closed"))
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    fn mw_info(&self) -> String {
        format!("websocket {}", self.url)
    }

    async fn connect(&self) -> Result<Inbound> {
        let (ws_stream, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| GmsecError::connection(format!("Cannot reach {}: {}", self.url, e)))?;
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ClientMessage>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<Envelope>();
        let (inbound, faults) = Inbound::new(in_rx);

        let writer = tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                let text = match serde_json::to_string(&frame) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Failed to encode frame: {}", e);
                        continue;
                    }
                };
                if let Err(e) = ws_sender.send(WsMessage::text(text)).await {
                    warn!("WebSocket send failed: {}", e);
                    break;
                }
            }
            let _ = ws_sender.close().await;
        });

        let url = self.url.clone();
        let reader = tokio::spawn(async move {
            while let Some(frame) = ws_receiver.next().await {
                let text = match frame {
                    Ok(WsMessage::Text(text)) => text,
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("WebSocket receive failed: {}", e);
                        break;
                    }
                };
                match serde_json::from_str::<ServerMessage>(text.as_str()) {
                    Ok(ServerMessage::Deliver { envelope }) => {
                        if in_tx.send(envelope).is_err() {
                            break;
                        }
                    }
                    Ok(ServerMessage::Error { message, operation }) => {
                        debug!("Bus at {} reported: {}", url, message);
                        let _ = faults.send(TransportFault { operation, message });
                    }
                    Err(e) => warn!("Invalid server frame: {}", e),
                }
            }
            debug!("Read loop closed for {}", url);
        });

        *self.outbound.lock() = Some(out_tx);
        *self.tasks.lock() = vec![writer, reader];
        debug!("Connected to {}", self.url);
        Ok(inbound)
    }

    async fn disconnect(&self) -> Result<()> {
        // Dropping the sender lets the writer flush and send a close frame.
        self.outbound.lock().take();
        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        let mut tasks = tasks.into_iter();
        if let Some(writer) = tasks.next() {
            let _ = writer.await;
        }
        for reader in tasks {
            reader.abort();
        }
        Ok(())
    }

    fn subscribe(&self, pattern: &str, config: &Config) -> Result<()> {
        self.send(ClientMessage::Subscribe {
            pattern: pattern.to_string(),
            durable: config.get_boolean_value_or(options::DURABLE_SUBSCRIBE, false),
        })
    }

    fn unsubscribe(&self, pattern: &str) -> Result<()> {
        self.send(ClientMessage::Unsubscribe {
            pattern: pattern.to_string(),
        })
    }

    fn publish(&self, envelope: Envelope, config: &Config) -> Result<()> {
        self.send(ClientMessage::Publish {
            envelope,
            durable: config.get_boolean_value_or(options::DURABLE_PUBLISH, false),
        })
    }
}
