//! Broker engine
//!
//! This module contains the bus implementation responsible for:
//! - tracking registered clients and their subscription patterns
//! - fanning published envelopes out to matching clients, once per client
//! - storing durable envelopes and replaying them to durable subscribers
//!
//! The API is synchronous and meant to be held behind a lock (see `Bus`).
//! Callers must not hold the lock across network I/O.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace, warn};

use crate::broker::message::Envelope;
use crate::broker::topic::{SubscriberId, Topic};
use crate::client::Client;
use crate::config::BusSettings;
use crate::persistence::Persistence;
use crate::utils::{GmsecError, Result};

#[derive(Debug, Default)]
pub struct Broker {
    pub(crate) topics: HashMap<String, Topic>,
    pub(crate) clients: HashMap<SubscriberId, Client>,
    persistence: Option<Persistence>,
    max_clients: Option<usize>,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_with_persistence(persistence: Persistence) -> Self {
        Self {
            persistence: Some(persistence),
            ..Self::default()
        }
    }

    /// Builds a broker from the bus section of the server settings, opening
    /// the durable store when a path is configured.
    pub fn from_settings(settings: &BusSettings) -> Result<Self> {
        let mut broker = match &settings.persistence_path {
            Some(path) => Self::new_with_persistence(Persistence::open(
                path,
                Some(settings.message_ttl_secs),
                Some(settings.max_messages_per_subject),
            )?),
            None => Self::new(),
        };
        broker.max_clients = Some(settings.max_connections);
        Ok(broker)
    }

    pub fn set_max_clients(&mut self, max: Option<usize>) {
        self.max_clients = max;
    }

    pub fn has_persistence(&self) -> bool {
        self.persistence.is_some()
    }

    /// Registers a client. Fails when the broker already holds its maximum
    /// number of clients.
    pub fn register_client(&mut self, client: Client) -> Result<()> {
        if let Some(max) = self.max_clients {
            if self.clients.len() >= max {
                return Err(GmsecError::connection(format!(
                    "Bus is full ({max} clients)"
                )));
            }
        }
        debug!("Registered bus client {}", client.id);
        self.clients.insert(client.id.clone(), client);
        Ok(())
    }

    pub fn remove_client(&mut self, client_id: &SubscriberId) {
        self.clients.remove(client_id);
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn is_registered(&self, client_id: &SubscriberId) -> bool {
        self.clients.contains_key(client_id)
    }

    /// Subscribes a client to a pattern, creating the topic on first use.
    pub fn subscribe(&mut self, pattern: &str, subscriber: SubscriberId) {
        let topic = self
            .topics
            .entry(pattern.to_string())
            .or_insert_with(|| Topic::new(pattern));
        topic.subscribe(subscriber);
    }

    /// Subscribes a client and replays the stored envelopes whose subject
    /// matches the pattern. Returns how many were replayed.
    pub fn subscribe_durable(&mut self, pattern: &str, subscriber: SubscriberId) -> Result<usize> {
        self.subscribe(pattern, subscriber.clone());

        let (Some(persistence), Some(client)) = (&self.persistence, self.clients.get(&subscriber))
        else {
            return Ok(0);
        };

        let stored = persistence.load_matching(pattern)?;
        let mut replayed = 0;
        for envelope in stored {
            if client.sender.send(envelope).is_ok() {
                replayed += 1;
            }
        }
        debug!("Replayed {} stored messages to {}", replayed, subscriber);
        Ok(replayed)
    }

    /// Removes the client from the pattern; the topic goes away with its
    /// last subscriber.
    pub fn unsubscribe(&mut self, pattern: &str, subscriber: &SubscriberId) {
        if let Some(topic) = self.topics.get_mut(pattern) {
            topic.unsubscribe(subscriber);
            if topic.is_empty() {
                self.topics.remove(pattern);
            }
        }
    }

    /// Delivers the envelope to every client holding a matching pattern.
    /// A client receives one copy however many of its patterns match.
    /// Returns the number of clients reached.
    pub fn publish(&self, envelope: Envelope) -> usize {
        let recipients: HashSet<&SubscriberId> = self
            .topics
            .values()
            .filter(|topic| topic.matches(&envelope.subject))
            .flat_map(|topic| topic.subscribers.iter())
            .collect();

        if recipients.is_empty() {
            trace!("No subscribers for '{}'", envelope.subject);
            return 0;
        }

        let mut delivered = 0;
        for sub_id in recipients {
            match self.clients.get(sub_id) {
                Some(client) => {
                    if let Err(e) = client.sender.send(envelope.clone()) {
                        warn!("Failed to send to {}: {}", sub_id, e);
                    } else {
                        delivered += 1;
                    }
                }
                None => warn!("No client registered with id: {}", sub_id),
            }
        }
        delivered
    }

    /// Stores the envelope for later durable subscribers, then publishes it.
    pub fn publish_durable(&self, envelope: Envelope) -> Result<usize> {
        match &self.persistence {
            Some(persistence) => persistence.store(&envelope)?,
            None => debug!("Durable publish without a store on '{}'", envelope.subject),
        }
        Ok(self.publish(envelope))
    }

    /// Removes a client and all of its subscriptions.
    pub fn cleanup_client(&mut self, client_id: &SubscriberId) {
        self.remove_client(client_id);

        for topic in self.topics.values_mut() {
            topic.unsubscribe(client_id);
        }
        self.topics.retain(|_, topic| !topic.is_empty());

        debug!("Cleaned up client {}", client_id);
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.topics.keys().map(String::as_str)
    }
}
