//! Durable store backed by `sled`
//!
//! Each subject gets its own tree. Keys are prefixed with the zero-padded
//! envelope timestamp so iteration yields envelopes in chronological order.
//!
//! Policy:
//! - `ttl_secs`: envelopes older than this are removed when their subject is loaded
//! - `max_per_subject`: when exceeded, the oldest envelopes of the subject are removed

use std::path::Path;

use chrono::Utc;
use sled::{Db, Tree};
use tracing::{trace, warn};
use uuid::Uuid;

use crate::broker::Envelope;
use crate::subject;
use crate::utils::Result;

const DEFAULT_TREE: &[u8] = b"__sled__default";

#[derive(Clone)]
pub struct Persistence {
    db: Db,
    ttl_secs: Option<u64>,
    max_per_subject: Option<usize>,
}

impl Persistence {
    /// Opens or creates a sled database at `path` with the given policy.
    pub fn open(
        path: impl AsRef<Path>,
        ttl_secs: Option<u64>,
        max_per_subject: Option<usize>,
    ) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self {
            db,
            ttl_secs,
            max_per_subject,
        })
    }

    /// A store that lives only as long as the process.
    pub fn temporary(ttl_secs: Option<u64>, max_per_subject: Option<usize>) -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self {
            db,
            ttl_secs,
            max_per_subject,
        })
    }

    pub fn store(&self, envelope: &Envelope) -> Result<()> {
        let tree = self.db.open_tree(&envelope.subject)?;
        let key = format!("{:020}_{}", envelope.timestamp.max(0), Uuid::new_v4());
        tree.insert(key.as_bytes(), serde_json::to_vec(envelope)?)?;
        trace!("Stored envelope for '{}'", envelope.subject);

        if let Some(max) = self.max_per_subject {
            let excess = tree.len().saturating_sub(max);
            if excess > 0 {
                let oldest: Vec<_> = tree
                    .iter()
                    .take(excess)
                    .filter_map(|entry| entry.ok().map(|(k, _)| k))
                    .collect();
                for key in oldest {
                    tree.remove(key)?;
                }
            }
        }
        Ok(())
    }

    /// Stored envelopes of one subject, oldest first, after expiring old ones.
    pub fn load_subject(&self, subject: &str) -> Result<Vec<Envelope>> {
        let tree = self.db.open_tree(subject)?;
        self.expire(&tree)?;

        let mut envelopes = Vec::with_capacity(tree.len());
        for entry in tree.iter() {
            let (_, value) = entry?;
            match serde_json::from_slice::<Envelope>(&value) {
                Ok(envelope) => envelopes.push(envelope),
                Err(e) => warn!("Skipping unreadable stored envelope on '{}': {}", subject, e),
            }
        }
        Ok(envelopes)
    }

    /// Stored envelopes of every subject matching `pattern`, oldest first.
    pub fn load_matching(&self, pattern: &str) -> Result<Vec<Envelope>> {
        let mut envelopes = Vec::new();
        for name in self.db.tree_names() {
            if name.as_ref() == DEFAULT_TREE {
                continue;
            }
            let Ok(subject) = std::str::from_utf8(&name) else {
                continue;
            };
            if subject::matches(subject, pattern) {
                envelopes.extend(self.load_subject(subject)?);
            }
        }
        envelopes.sort_by_key(|e| e.timestamp);
        Ok(envelopes)
    }

    fn expire(&self, tree: &Tree) -> Result<()> {
        let Some(ttl) = self.ttl_secs else {
            return Ok(());
        };
        let ttl_ms = i64::try_from(ttl.saturating_mul(1000)).unwrap_or(i64::MAX);
        let expiry = Utc::now().timestamp_millis().saturating_sub(ttl_ms);

        let old_keys: Vec<_> = tree
            .iter()
            .filter_map(|entry| entry.ok())
            .filter_map(|(key, _)| {
                let ts = std::str::from_utf8(&key)
                    .ok()?
                    .split_once('_')?
                    .0
                    .parse::<i64>()
                    .ok()?;
                (ts < expiry).then_some(key)
            })
            .collect();

        for key in old_keys {
            tree.remove(key)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Persistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence")
            .field("db", &"sled::Db")
            .field("ttl_secs", &self.ttl_secs)
            .field("max_per_subject", &self.max_per_subject)
            .finish()
    }
}
