use crate::config::Config;

use super::callback::MessageCallback;

/// Handle returned by `Connection::subscribe*`; pass it back to
/// `Connection::unsubscribe` to cancel the subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionInfo {
    pub(crate) id: u64,
    pub(crate) connection_id: String,
    pattern: String,
    config: Config,
}

impl SubscriptionInfo {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

pub(crate) struct Subscription {
    pub(crate) id: u64,
    pub(crate) pattern: String,
    pub(crate) config: Config,
    pub(crate) callback: Option<MessageCallback>,
}

impl Subscription {
    pub(crate) fn info(&self, connection_id: &str) -> SubscriptionInfo {
        SubscriptionInfo {
            id: self.id,
            connection_id: connection_id.to_string(),
            pattern: self.pattern.clone(),
            config: self.config.clone(),
        }
    }
}
