//! The `resource` module publishes `MSG.RSRC` messages on a timer.
//!
//! A `ResourceGenerator` samples CPU and memory usage every
//! `sample_interval` seconds and publishes every `PUB-RATE` seconds a
//! resource message carrying moving averages over `average_interval`
//! seconds, plus a disk and network snapshot and an incrementing
//! `COUNTER`.

pub mod collector;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{Notify, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::{Config, options};
use crate::connection::{Connection, ConnectionState, Event};
use crate::heartbeat::{COUNTER_FIELD, PUB_RATE_FIELD, next_counter};
use crate::message::Message;
use crate::message::field::Field;
use crate::specification::MessageFactory;
use crate::utils::{GmsecError, Result, Status, StatusClass, StatusCode};

pub use collector::{OPER_SYS_FIELD, ResourceCollector, moving_samples, os_version};

pub const RESOURCE_SCHEMA: &str = "MSG.RSRC";

struct Template {
    message: Message,
    rate: u16,
    counter: u16,
}

struct Running {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

pub struct ResourceGenerator {
    connection: Connection,
    template: Arc<Mutex<Template>>,
    sample_interval: u16,
    window: usize,
    rate_changed: Arc<Notify>,
    running: Mutex<Option<Running>>,
}

impl ResourceGenerator {
    /// A generator with its own connection built from `config`.
    pub fn new(
        config: &Config,
        pub_rate_secs: u16,
        sample_interval_secs: u16,
        average_interval_secs: u16,
    ) -> Result<Self> {
        moving_samples(sample_interval_secs, average_interval_secs)?;
        Self::with_connection(
            Connection::new(config)?,
            pub_rate_secs,
            sample_interval_secs,
            average_interval_secs,
        )
    }

    pub fn with_connection(
        connection: Connection,
        pub_rate_secs: u16,
        sample_interval_secs: u16,
        average_interval_secs: u16,
    ) -> Result<Self> {
        let window = moving_samples(sample_interval_secs, average_interval_secs)?;

        let mut message = connection.message_factory().create_message(RESOURCE_SCHEMA)?;
        message.add_field(PUB_RATE_FIELD, pub_rate_secs)?;
        message.add_field(OPER_SYS_FIELD, os_version())?;

        Ok(Self {
            connection,
            template: Arc::new(Mutex::new(Template {
                message,
                rate: pub_rate_secs,
                counter: 1,
            })),
            sample_interval: sample_interval_secs,
            window,
            rate_changed: Arc::new(Notify::new()),
            running: Mutex::new(None),
        })
    }

    /// A one-off resource message from `factory`, averaged over the
    /// samples that fit `average_interval_secs`.
    pub fn create_resource_message(
        factory: &MessageFactory,
        sample_interval_secs: u16,
        average_interval_secs: u16,
    ) -> Result<Message> {
        let window = moving_samples(sample_interval_secs, average_interval_secs)?;
        let mut message = factory.create_message(RESOURCE_SCHEMA)?;
        ResourceCollector::new(window).add_to(&mut message)?;
        message.add_field(OPER_SYS_FIELD, os_version())?;
        Ok(message)
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn publish_rate(&self) -> u16 {
        self.template.lock().rate
    }

    /// Connects if needed and starts publishing. Returns false if the
    /// generator is already running.
    ///
    /// With content validation enabled on the connection, a template that
    /// is not compliant fails here instead of on every publish.
    pub async fn start(&self) -> Result<bool> {
        if self.is_running() {
            warn!("The resource generator is already running");
            return Ok(false);
        }
        if self.connection.validates(options::MSG_CONTENT_VALIDATE_SEND) {
            let status = {
                let template = self.template.lock();
                self.connection.message_factory().validate(&template.message)
            };
            if status.is_error() {
                return Err(GmsecError::Validation(status.reason().to_string()));
            }
        }
        if self.connection.state() == ConnectionState::Created {
            self.connection.connect().await?;
        }

        let (stop, stop_rx) = oneshot::channel();
        let task = tokio::spawn(run(
            self.connection.clone(),
            self.template.clone(),
            ResourceCollector::new(self.window),
            Duration::from_secs(u64::from(self.sample_interval)),
            self.rate_changed.clone(),
            stop_rx,
        ));
        *self.running.lock() = Some(Running { stop, task });
        info!(
            "Resource generator started every {}s, sampling every {}s",
            self.publish_rate(),
            self.sample_interval
        );
        Ok(true)
    }

    /// Stops publishing. The connection stays up. Returns false if the
    /// generator was not running.
    pub async fn stop(&self) -> Result<bool> {
        let running = self.running.lock().take();
        let Some(Running { stop, task }) = running else {
            return Ok(false);
        };
        let _ = stop.send(());
        if let Err(e) = task.await {
            warn!("Resource generator task failed: {}", e);
        }
        info!("Resource generator stopped");
        Ok(true)
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }

    /// Sets a field of the resource message, returning true when it
    /// replaced one. Setting `PUB-RATE` changes the publish rate; a
    /// running generator publishes at once and keeps the new rate.
    pub fn set_field(&self, field: Field) -> Result<bool> {
        if field.name() == COUNTER_FIELD {
            return Err(GmsecError::illegal_argument(format!(
                "{COUNTER_FIELD} is maintained by the generator"
            )));
        }
        if field.name() != PUB_RATE_FIELD {
            return Ok(self.template.lock().message.put_field(field));
        }

        let rate = field
            .get_i64_value()
            .ok()
            .and_then(|rate| u16::try_from(rate).ok())
            .ok_or_else(|| {
                GmsecError::illegal_argument(format!(
                    "{PUB_RATE_FIELD} must be an integer from 0 to {}",
                    u16::MAX
                ))
            })?;
        {
            let mut template = self.template.lock();
            template.rate = rate;
            template.message.add_field(PUB_RATE_FIELD, rate)?;
        }
        self.rate_changed.notify_one();
        Ok(true)
    }
}

impl Drop for ResourceGenerator {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            running.task.abort();
        }
    }
}

async fn run(
    conn: Connection,
    template: Arc<Mutex<Template>>,
    mut collector: ResourceCollector,
    sample_every: Duration,
    rate_changed: Arc<Notify>,
    mut stop: oneshot::Receiver<()>,
) {
    let mut sampling = tokio::time::interval_at(Instant::now() + sample_every, sample_every);
    sampling.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let (mut msg, rate, counter) = {
            let mut template = template.lock();
            let counter = template.counter;
            template.counter = next_counter(counter);
            (template.message.clone(), template.rate, counter)
        };
        let published = collector
            .add_to(&mut msg)
            .and_then(|_| msg.add_field(COUNTER_FIELD, counter))
            .and_then(|_| conn.publish(&msg));
        if let Err(e) = published {
            conn.emit(
                Event::MsgPublishFailure,
                &Status::new(
                    StatusClass::Connection,
                    StatusCode::PublishFailed,
                    format!("Resource message publish failed: {e}"),
                ),
            );
        }

        if rate == 0 {
            debug!("Resource generator rate is 0; published once");
            break;
        }
        let next_publish = Instant::now() + Duration::from_secs(u64::from(rate));
        loop {
            tokio::select! {
                biased;
                _ = &mut stop => return,
                _ = rate_changed.notified() => break,
                _ = tokio::time::sleep_until(next_publish) => break,
                _ = sampling.tick() => collector.sample(),
            }
        }
    }
}

#[cfg(test)]
mod tests;
