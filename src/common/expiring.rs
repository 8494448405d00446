//! Map with a constant time-to-live per entry and lazy eviction.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
/// A map whose entries expire a constant `ttl` after insertion.
///
/// Expiries are kept in a FIFO queue alongside the map. Since the ttl is constant the queue
/// is ordered by expiry, so [ExpiringMap::clean] only ever pops from the front. Cleaning
/// happens on every insert; reads never return an expired entry even if it was not evicted yet.
pub struct ExpiringMap<K, V> {
    ttl: Duration,
    queue: VecDeque<(K, Instant)>,
    entries: HashMap<K, (V, Instant)>,
}

impl<K, V> ExpiringMap<K, V>
where
    K: Hash + Eq + Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            queue: VecDeque::new(),
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Insert or refresh an entry, returning the previous live value if any.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.clean();

        let expiry = Instant::now() + self.ttl;

        self.queue.push_back((key.clone(), expiry));
        self.entries
            .insert(key, (value, expiry))
            .map(|(previous, _)| previous)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let now = Instant::now();

        self.entries
            .get(key)
            .filter(|(_, expiry)| *expiry > now)
            .map(|(value, _)| value)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        // The stale queue entry is dropped by `clean` once it expires.
        self.entries.remove(key).map(|(value, _)| value)
    }

    /// Evict every entry whose expiry has passed.
    pub fn clean(&mut self) {
        let now = Instant::now();

        while let Some((_, expiry)) = self.queue.front() {
            if *expiry > now {
                break;
            }

            if let Some((key, expiry)) = self.queue.pop_front() {
                // A refreshed key has a newer expiry and must survive its old queue entry.
                if self.entries.get(&key).map(|(_, e)| *e) == Some(expiry) {
                    self.entries.remove(&key);
                }
            }
        }
    }

    /// Iterate over entries that have not expired.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        let now = Instant::now();

        self.entries
            .iter()
            .filter(move |(_, (_, expiry))| *expiry > now)
            .map(|(key, (value, _))| (key, value))
    }

    /// Number of entries not evicted yet, which may include some expired ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
