//! Fixed capacity list of peers.

use std::slice::Iter;

use crate::common::{Id, Peer};
use crate::{Error, Result};

/// A k-bucket, an unordered list of at most `capacity` peers with distinct Ids.
///
/// Removal swaps the last peer into the freed slot, so indices are not stable across removals.
#[derive(Debug, Clone)]
pub struct Bucket {
    capacity: usize,
    peers: Vec<Peer>,
}

impl Bucket {
    pub fn new(capacity: usize) -> Self {
        Bucket {
            capacity,
            peers: Vec::with_capacity(capacity),
        }
    }

    // === Getters ===

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.peers.len() >= self.capacity
    }

    pub fn get(&self, index: usize) -> Result<&Peer> {
        self.peers.get(index).ok_or(Error::IndexOutOfBounds {
            index,
            len: self.peers.len(),
        })
    }

    pub fn position(&self, id: &Id) -> Option<usize> {
        self.peers.iter().position(|peer| peer.id == *id)
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.position(id).is_some()
    }

    pub fn iter(&self) -> Iter<'_, Peer> {
        self.peers.iter()
    }

    // === Public Methods ===

    /// Add a peer, returns `false` if the bucket is full or already has a peer with the same Id.
    pub fn add(&mut self, peer: Peer) -> bool {
        if self.is_full() || self.contains(&peer.id) {
            return false;
        }

        self.peers.push(peer);
        true
    }

    /// Swap-remove the peer at `index`.
    pub fn remove(&mut self, index: usize) -> Result<Peer> {
        if index >= self.peers.len() {
            return Err(Error::IndexOutOfBounds {
                index,
                len: self.peers.len(),
            });
        }

        Ok(self.peers.swap_remove(index))
    }

    /// Swap-remove the peer with the given Id, returns `false` if absent.
    pub fn remove_by_id(&mut self, id: &Id) -> bool {
        match self.position(id) {
            Some(index) => {
                self.peers.swap_remove(index);
                true
            }
            None => false,
        }
    }
}

impl<'a> IntoIterator for &'a Bucket {
    type Item = &'a Peer;
    type IntoIter = Iter<'a, Peer>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
