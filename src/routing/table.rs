//! Kademlia routing table with a dynamically unfolding last bucket

use rand::{seq::SliceRandom, thread_rng};
use tracing::trace;

use crate::common::{Id, Peer, ID_BITS};

use super::Bucket;

/// Number of peers taken from the bucket of the sender in a broadcast sample.
const BROADCAST_LEFT_SAMPLE: usize = 2;

#[derive(Debug, Clone)]
/// Kademlia routing table.
///
/// Bucket `i` holds the peers whose common prefix length with the local Id is exactly `i`,
/// except the last bucket that holds every peer with a common prefix length of at least its
/// index. The table starts with a single bucket and grows by unfolding the last bucket when
/// it overflows, buckets are never removed.
pub struct RoutingTable {
    id: Id,
    k: usize,
    buckets: Vec<Bucket>,
}

impl RoutingTable {
    /// Create a new [RoutingTable] with a given id and bucket capacity `k`.
    pub fn new(id: Id, k: usize) -> Self {
        RoutingTable {
            id,
            k,
            buckets: vec![Bucket::new(k)],
        }
    }

    /// Returns the [Id] of this node, where the distance is measured from.
    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn bucket(&self, index: usize) -> Option<&Bucket> {
        self.buckets.get(index)
    }

    // === Public Methods ===

    /// Attempts to add a peer to this routing table, and return `true` if it did.
    pub fn add(&mut self, peer: Peer) -> bool {
        if peer.id == self.id {
            // Do not add self to the routing_table
            return false;
        }

        let cpl = self.id.cpl(&peer.id);
        let mut index = self.bucket_index(cpl);

        while index == self.last_index()
            && self.buckets[index].is_full()
            && self.buckets.len() < ID_BITS
        {
            self.unfold_last_bucket();
            index = self.bucket_index(cpl);
        }

        self.buckets[index].add(peer)
    }

    /// Remove a peer from this routing table, returns `true` if it was present.
    pub fn remove(&mut self, id: &Id) -> bool {
        let index = self.bucket_index(self.id.cpl(id));

        self.buckets[index].remove_by_id(id)
    }

    pub fn contains(&self, id: &Id) -> bool {
        let index = self.bucket_index(self.id.cpl(id));

        self.buckets[index].contains(id)
    }

    pub fn get(&self, id: &Id) -> Option<&Peer> {
        let bucket = &self.buckets[self.bucket_index(self.id.cpl(id))];

        bucket.position(id).and_then(|index| bucket.get(index).ok())
    }

    /// Return up to `k` peers closest to the target, sorted by distance.
    ///
    /// Scanning starts at the bucket matching the common prefix length of the target and
    /// walks outwards in both directions until `k` peers are collected, so the result is
    /// not guaranteed to be the exact `k` closest peers of the table.
    pub fn closest(&self, target: &Id, ignore: Option<&Id>) -> Vec<Peer> {
        let mut peers = Vec::with_capacity(self.k);
        let start = self.bucket_index(self.id.cpl(target));

        let collect = |peers: &mut Vec<Peer>, bucket: &Bucket| {
            peers.extend(bucket.iter().filter(|peer| Some(&peer.id) != ignore));
        };

        collect(&mut peers, &self.buckets[start]);

        for offset in 1..self.buckets.len() {
            if peers.len() >= self.k {
                break;
            }

            if let Some(left) = start.checked_sub(offset) {
                collect(&mut peers, &self.buckets[left]);
            }

            if let Some(right) = self.buckets.get(start + offset) {
                collect(&mut peers, right);
            }
        }

        peers.sort_by_key(|peer| peer.id.distance(target));
        peers.truncate(self.k);

        peers
    }

    /// The first `n` peers of the table in bucket order.
    pub fn sample(&self, n: usize) -> Vec<Peer> {
        self.peers().take(n).copied().collect()
    }

    /// Random sample used to forward a broadcast.
    ///
    /// Two peers are taken from the bucket at `left_bucket` (clamped to the last bucket) and
    /// the rest from the buckets after it, each side sampled uniformly without replacement.
    pub fn broadcast_sample(&self, left_bucket: usize, n: usize) -> Vec<Peer> {
        let mut rng = thread_rng();
        let left_bucket = left_bucket.min(self.last_index());

        let left_size = BROADCAST_LEFT_SAMPLE.min(n);
        let right_size = n - left_size;

        let left: Vec<&Peer> = self.buckets[left_bucket].iter().collect();
        let right: Vec<&Peer> = self.buckets[left_bucket + 1..]
            .iter()
            .flat_map(|bucket| bucket.iter())
            .collect();

        left.choose_multiple(&mut rng, left_size)
            .chain(right.choose_multiple(&mut rng, right_size))
            .map(|peer| **peer)
            .collect()
    }

    /// Returns `true` if this routing table is empty.
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|bucket| bucket.is_empty())
    }

    /// Return the number of peers in this routing table.
    pub fn size(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.len()).sum()
    }

    /// Returns an iterator over the peers in this routing table.
    pub fn peers(&self) -> RoutingTableIterator {
        RoutingTableIterator {
            bucket_index: 0,
            peer_index: 0,
            table: self,
        }
    }

    // === Private Methods ===

    fn last_index(&self) -> usize {
        self.buckets.len() - 1
    }

    fn bucket_index(&self, cpl: usize) -> usize {
        cpl.min(self.last_index())
    }

    /// Split the last bucket, moving every peer sharing more than its index in prefix
    /// length with the local Id to a new last bucket.
    fn unfold_last_bucket(&mut self) {
        let last_cpl = self.last_index();
        let mut new_last = Bucket::new(self.k);

        let last = &mut self.buckets[last_cpl];
        let mut index = 0;

        while index < last.len() {
            let cpl = match last.get(index) {
                Ok(peer) => self.id.cpl(&peer.id),
                Err(_) => break,
            };

            if cpl == last_cpl {
                index += 1;
            } else if let Ok(peer) = last.remove(index) {
                new_last.add(peer);
            }
        }

        trace!(
            bucket = last_cpl,
            kept = last.len(),
            moved = new_last.len(),
            "Unfolded last bucket"
        );

        self.buckets.push(new_last);
    }
}

pub struct RoutingTableIterator<'a> {
    bucket_index: usize,
    peer_index: usize,
    table: &'a RoutingTable,
}

impl<'a> Iterator for RoutingTableIterator<'a> {
    type Item = &'a Peer;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_bucket) = self.table.buckets.get(self.bucket_index) {
            if let Ok(current_peer) = current_bucket.get(self.peer_index) {
                self.peer_index += 1;
                return Some(current_peer);
            }

            self.peer_index = 0;
            self.bucket_index += 1;
        }

        None
    }
}
