//! Manage members of swarms and pools

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use rand::{seq::IteratorRandom, thread_rng};

use crate::common::{ExpiringMap, Id, Peer};

#[derive(Debug)]
/// Members per swarm (or pool) id, each forgotten a constant TTL after it last joined.
pub struct SwarmTracker {
    ttl: Duration,
    swarms: HashMap<Id, ExpiringMap<Id, SocketAddr>>,
}

impl SwarmTracker {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            swarms: HashMap::new(),
        }
    }

    /// Add or refresh a member of `swarm`.
    pub fn add(&mut self, swarm: Id, member: Peer) {
        let ttl = self.ttl;

        self.swarms
            .entry(swarm)
            .or_insert_with(|| ExpiringMap::new(ttl))
            .insert(member.id, member.address);
    }

    pub fn contains(&self, swarm: &Id, member: &Id) -> bool {
        self.swarms
            .get(swarm)
            .map(|members| members.contains(member))
            .unwrap_or(false)
    }

    /// Up to `n` random live members of `swarm`.
    pub fn sample(&self, swarm: &Id, n: usize) -> Vec<Peer> {
        let Some(members) = self.swarms.get(swarm) else {
            return Vec::new();
        };

        members
            .iter()
            .map(|(id, address)| Peer::new(*id, *address))
            .choose_multiple(&mut thread_rng(), n)
    }

    /// Evict expired members and forget swarms left empty.
    pub fn clean(&mut self) {
        self.swarms.retain(|_, members| {
            members.clean();
            !members.is_empty()
        });
    }

    /// Number of swarms with members not evicted yet.
    pub fn len(&self) -> usize {
        self.swarms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.swarms.is_empty()
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;
    use std::thread::sleep;

    use super::*;

    #[test]
    fn sample_is_bounded_and_distinct() {
        let mut tracker = SwarmTracker::new(Duration::from_secs(60));
        let swarm = Id::random();

        let members: Vec<Peer> = (0..30).map(|i| Peer::with_id(Id::random(), i)).collect();
        for member in &members {
            tracker.add(swarm, *member);
        }
        // Rejoining does not duplicate.
        tracker.add(swarm, members[0]);

        let sample = tracker.sample(&swarm, 20);
        let distinct: HashSet<Id> = sample.iter().map(|p| p.id).collect();

        assert_eq!(sample.len(), 20);
        assert_eq!(distinct.len(), 20);
        assert!(sample.iter().all(|p| members.contains(p)));

        assert_eq!(tracker.sample(&swarm, 100).len(), 30);
        assert!(tracker.sample(&Id::random(), 20).is_empty());
    }

    #[test]
    fn members_expire() {
        let mut tracker = SwarmTracker::new(Duration::from_millis(20));
        let swarm = Id::random();
        let member = Peer::with_id(Id::random(), 1);

        tracker.add(swarm, member);
        assert!(tracker.contains(&swarm, &member.id));

        sleep(Duration::from_millis(40));

        assert!(!tracker.contains(&swarm, &member.id));
        assert!(tracker.sample(&swarm, 20).is_empty());

        tracker.clean();
        assert!(tracker.is_empty());
    }
}
