//! In-process transport over a shared `Bus`.
//!
//! Failures can be simulated through the `MW-SIM-*` options, which makes
//! the error paths of a `Connection` testable without a real middleware.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, warn};

use super::{Inbound, Operation, Transport, TransportFault};
use crate::broker::topic::SubscriberId;
use crate::broker::{Bus, Envelope};
use crate::client::Client;
use crate::config::{Config, options};
use crate::message::MessageKind;
use crate::utils::{GmsecError, Result};

#[derive(Debug)]
pub struct LoopbackTransport {
    bus: Bus,
    config: Config,
    client_id: Mutex<Option<SubscriberId>>,
    faults: Mutex<Option<UnboundedSender<TransportFault>>>,
}

impl LoopbackTransport {
    pub fn new(bus: Bus, config: &Config) -> Self {
        Self {
            bus,
            config: config.clone(),
            client_id: Mutex::new(None),
            faults: Mutex::new(None),
        }
    }

    fn registered_id(&self) -> Result<SubscriberId> {
        self.client_id
            .lock()
            .clone()
            .ok_or_else(|| GmsecError::connection("Loopback transport is not connected"))
    }
}

impl Drop for LoopbackTransport {
    fn drop(&mut self) {
        if let Some(id) = self.client_id.get_mut().take() {
            self.bus.lock().cleanup_client(&id);
        }
    }
}

fn simulated(config: &Config, key: &str, what: &str) -> Result<()> {
    if config.get_boolean_value_or(key, false) {
        return Err(GmsecError::connection(format!("Simulated {what} failure")));
    }
    Ok(())
}

#[async_trait]
impl Transport for LoopbackTransport {
    fn mw_info(&self) -> String {
        "loopback".to_string()
    }

    async fn connect(&self) -> Result<Inbound> {
        simulated(&self.config, options::SIM_CONNECT_FAILURE, "connect")?;

        let (tx, rx) = mpsc::unbounded_channel();
        let client = Client::new(tx);
        let id = client.id.clone();
        self.bus.lock().register_client(client)?;
        debug!("Loopback client {} connected", id);
        *self.client_id.lock() = Some(id);

        let (inbound, faults) = Inbound::new(rx);
        *self.faults.lock() = Some(faults);
        Ok(inbound)
    }

    async fn disconnect(&self) -> Result<()> {
        self.faults.lock().take();
        if let Some(id) = self.client_id.lock().take() {
            self.bus.lock().cleanup_client(&id);
            debug!("Loopback client {} disconnected", id);
        }
        Ok(())
    }

    fn subscribe(&self, pattern: &str, config: &Config) -> Result<()> {
        simulated(config, options::SIM_SUBSCRIBE_FAILURE, "subscribe")?;
        let id = self.registered_id()?;
        let mut broker = self.bus.lock();
        if config.get_boolean_value_or(options::DURABLE_SUBSCRIBE, false) {
            broker.subscribe_durable(pattern, id)?;
        } else {
            broker.subscribe(pattern, id);
        }
        Ok(())
    }

    fn unsubscribe(&self, pattern: &str) -> Result<()> {
        simulated(&self.config, options::SIM_UNSUBSCRIBE_FAILURE, "unsubscribe")?;
        let id = self.registered_id()?;
        self.bus.lock().unsubscribe(pattern, &id);
        Ok(())
    }

    fn publish(&self, envelope: Envelope, config: &Config) -> Result<()> {
        match envelope.kind {
            MessageKind::Publish => simulated(config, options::SIM_PUBLISH_FAILURE, "publish")?,
            MessageKind::Request => simulated(config, options::SIM_REQUEST_FAILURE, "request")?,
            MessageKind::Reply => simulated(config, options::SIM_REPLY_FAILURE, "reply")?,
        }
        self.registered_id()?;

        let durable = config.get_boolean_value_or(options::DURABLE_PUBLISH, false);
        let delay_ms = config.get_integer_value_or(options::SIM_PUBLISH_DELAY_MS, 0);

        if delay_ms > 0 {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                let bus = self.bus.clone();
                let faults = self.faults.lock().clone();
                handle.spawn(async move {
                    tokio::time::sleep(Duration::from_millis(delay_ms as u64)).await;
                    if let Err(e) = deliver(&bus, envelope, durable) {
                        warn!("Delayed loopback publish failed: {}", e);
                        if let Some(faults) = faults {
                            let _ = faults.send(TransportFault {
                                operation: Some(Operation::Publish),
                                message: e.to_string(),
                            });
                        }
                    }
                });
                return Ok(());
            }
        }
        deliver(&self.bus, envelope, durable)
    }
}

fn deliver(bus: &Bus, envelope: Envelope, durable: bool) -> Result<()> {
    let broker = bus.lock();
    if durable {
        broker.publish_durable(envelope)?;
    } else {
        broker.publish(envelope);
    }
    Ok(())
}
