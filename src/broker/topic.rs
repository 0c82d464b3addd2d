use std::collections::HashSet;

use crate::subject;

pub type SubscriberId = String;

/// A subscription pattern and the bus clients subscribed to it.
///
/// Patterns use the subject wildcard grammar, so one published subject may
/// match several topics.
#[derive(Debug, Default)]
pub struct Topic {
    pub pattern: String,
    pub subscribers: HashSet<SubscriberId>,
}

impl Topic {
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            subscribers: HashSet::new(),
        }
    }

    /// Adding a subscriber twice has no effect.
    pub fn subscribe(&mut self, id: SubscriberId) {
        self.subscribers.insert(id);
    }

    pub fn unsubscribe(&mut self, id: &SubscriberId) {
        self.subscribers.remove(id);
    }

    pub fn matches(&self, subject: &str) -> bool {
        subject::matches(subject, &self.pattern)
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
