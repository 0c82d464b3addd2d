//! The `heartbeat` module publishes `MSG.HB` messages on a timer.
//!
//! A `HeartbeatGenerator` owns a tokio task that publishes its heartbeat
//! message every `PUB-RATE` seconds, stamping an incrementing `COUNTER`.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{Notify, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::connection::{Connection, ConnectionState, Event};
use crate::message::Message;
use crate::message::field::Field;
use crate::utils::{GmsecError, Result, Status, StatusClass, StatusCode};

pub const HEARTBEAT_SCHEMA: &str = "MSG.HB";
pub const PUB_RATE_FIELD: &str = "PUB-RATE";
pub const COUNTER_FIELD: &str = "COUNTER";

struct Beat {
    message: Message,
    rate: u16,
    counter: u16,
}

impl Beat {
    /// The message to publish next; advances the counter.
    fn next(&mut self) -> Result<Message> {
        let mut msg = self.message.clone();
        msg.add_field(COUNTER_FIELD, self.counter)?;
        self.counter = next_counter(self.counter);
        Ok(msg)
    }
}

/// COUNTER wraps back to 1, never 0.
pub(crate) fn next_counter(counter: u16) -> u16 {
    if counter == u16::MAX { 1 } else { counter + 1 }
}

struct Running {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

pub struct HeartbeatGenerator {
    connection: Connection,
    beat: Arc<Mutex<Beat>>,
    rate_changed: Arc<Notify>,
    running: Mutex<Option<Running>>,
}

impl HeartbeatGenerator {
    /// A generator with its own connection built from `config`.
    pub fn new(config: &Config, subject: &str, pub_rate_secs: u16) -> Result<Self> {
        Self::with_connection(Connection::new(config)?, subject, pub_rate_secs)
    }

    /// A generator publishing over an existing connection. An empty
    /// `subject` uses the one built from the heartbeat schema.
    pub fn with_connection(connection: Connection, subject: &str, pub_rate_secs: u16) -> Result<Self> {
        let mut message = connection.message_factory().create_message(HEARTBEAT_SCHEMA)?;
        if !subject.is_empty() {
            message.set_subject(subject)?;
        }
        message.add_field(PUB_RATE_FIELD, pub_rate_secs)?;

        Ok(Self {
            connection,
            beat: Arc::new(Mutex::new(Beat {
                message,
                rate: pub_rate_secs,
                counter: 1,
            })),
            rate_changed: Arc::new(Notify::new()),
            running: Mutex::new(None),
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn publish_rate(&self) -> u16 {
        self.beat.lock().rate
    }

    /// Connects if needed and starts publishing. Returns false if the
    /// generator is already running.
    pub async fn start(&self) -> Result<bool> {
        if self.is_running() {
            return Ok(false);
        }
        if self.connection.state() == ConnectionState::Created {
            self.connection.connect().await?;
        }

        let (stop, stop_rx) = oneshot::channel();
        let task = tokio::spawn(run(
            self.connection.clone(),
            self.beat.clone(),
            self.rate_changed.clone(),
            stop_rx,
        ));
        *self.running.lock() = Some(Running { stop, task });
        info!("Heartbeat started every {}s", self.publish_rate());
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
            warn!("Heartbeat task failed: {}", e);
        }
        info!("Heartbeat stopped");
        Ok(true)
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }

    /// Changes the publish rate; a running generator publishes at once and
    /// then keeps the new rate. A rate of 0 stops after that publish.
    pub fn change_publish_rate(&self, pub_rate_secs: u16) -> Result<()> {
        {
            let mut beat = self.beat.lock();
            beat.rate = pub_rate_secs;
            beat.message.add_field(PUB_RATE_FIELD, pub_rate_secs)?;
        }
        self.rate_changed.notify_one();
        Ok(())
    }

    /// Sets a field of the heartbeat message. Setting `PUB-RATE` changes
    /// the publish rate.
    pub fn set_field(&self, field: Field) -> Result<()> {
        if field.name() == PUB_RATE_FIELD {
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
            return self.change_publish_rate(rate);
        }
        if field.name() == COUNTER_FIELD {
            return Err(GmsecError::illegal_argument(format!(
                "{COUNTER_FIELD} is maintained by the generator"
            )));
        }
        self.beat.lock().message.put_field(field);
        Ok(())
    }
}

impl Drop for HeartbeatGenerator {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            running.task.abort();
        }
    }
}

async fn run(
    conn: Connection,
    beat: Arc<Mutex<Beat>>,
    rate_changed: Arc<Notify>,
    mut stop: oneshot::Receiver<()>,
) {
    loop {
        let (next, rate) = {
            let mut beat = beat.lock();
            (beat.next(), beat.rate)
        };
        if let Err(e) = next.and_then(|msg| conn.publish(&msg)) {
            conn.emit(
                Event::MsgPublishFailure,
                &Status::new(
                    StatusClass::Connection,
                    StatusCode::PublishFailed,
                    format!("Heartbeat publish failed: {e}"),
                ),
            );
        }

        if rate == 0 {
            debug!("Heartbeat rate is 0; published once");
            break;
        }
        tokio::select! {
            biased;
            _ = &mut stop => break,
            _ = rate_changed.notified() => {}
            _ = tokio::time::sleep(Duration::from_secs(u64::from(rate))) => {}
        }
    }
}
