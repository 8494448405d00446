use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::common::{ExpiringMap, Id, MessageId};
use crate::config::DEFAULT_HAVE_TTL;

#[derive(Debug)]
/// Remembers which peers announced having which broadcast message, so they are not
/// sent `have` announcements for it again.
///
/// Records are indexed by message, each peer keeps its own expiry.
pub struct HaveTracker {
    ttl: Duration,
    messages: ExpiringMap<MessageId, HashMap<Id, Instant>>,
}

impl HaveTracker {
    pub fn new(ttl: Duration) -> Self {
        HaveTracker {
            ttl,
            messages: ExpiringMap::new(ttl),
        }
    }

    pub fn add(&mut self, message_id: MessageId, peer: Id) {
        let now = Instant::now();

        let mut peers = self.messages.remove(&message_id).unwrap_or_default();
        peers.retain(|_, expiry| *expiry > now);
        peers.insert(peer, now + self.ttl);

        self.messages.insert(message_id, peers);
    }

    pub fn contains(&self, message_id: &MessageId, peer: &Id) -> bool {
        self.messages
            .get(message_id)
            .and_then(|peers| peers.get(peer))
            .map(|expiry| *expiry > Instant::now())
            .unwrap_or(false)
    }

    /// Peers that have `message_id`.
    pub fn peers(&self, message_id: &MessageId) -> Vec<Id> {
        let now = Instant::now();

        self.messages
            .get(message_id)
            .map(|peers| {
                peers
                    .iter()
                    .filter(|(_, expiry)| **expiry > now)
                    .map(|(peer, _)| *peer)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn check_timeouts(&mut self) {
        self.messages.clean()
    }

    /// Number of messages with at least one record not evicted yet.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for HaveTracker {
    fn default() -> Self {
        Self::new(DEFAULT_HAVE_TTL)
    }
}
