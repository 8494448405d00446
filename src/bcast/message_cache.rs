use std::time::Duration;

use crate::common::{ExpiringMap, MessageId};
use crate::config::DEFAULT_MESSAGE_TTL;

use super::Message;

#[derive(Debug)]
/// Recently seen broadcast messages, each kept for a constant TTL after it was added.
pub struct MessageCache {
    messages: ExpiringMap<MessageId, Message>,
}

impl MessageCache {
    pub fn new(ttl: Duration) -> Self {
        MessageCache {
            messages: ExpiringMap::new(ttl),
        }
    }

    /// Add a message, evicting expired ones first.
    pub fn add(&mut self, message: Message) {
        self.messages.insert(message.id, message);
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.get(id)
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.messages.contains(id)
    }

    pub fn clean(&mut self) {
        self.messages.clean()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for MessageCache {
    fn default() -> Self {
        Self::new(DEFAULT_MESSAGE_TTL)
    }
}

#[cfg(test)]
mod test {
    use std::thread::sleep;

    use bytes::Bytes;

    use super::*;
    use crate::common::{Id, Peer};

    fn message() -> Message {
        Message::new(Id::random(), Peer::random(), Bytes::from_static(b"payload"))
    }

    #[test]
    fn messages_expire() {
        let mut cache = MessageCache::new(Duration::from_millis(30));

        let first = message();
        cache.add(first.clone());

        assert!(cache.contains(&first.id));
        assert_eq!(cache.get(&first.id), Some(&first));

        sleep(Duration::from_millis(50));
        assert!(!cache.contains(&first.id));

        // Adding evicts the expired message.
        let second = message();
        cache.add(second.clone());

        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&second.id));
    }
}
