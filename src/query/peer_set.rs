//! Candidate peers of a single lookup, ordered by distance to its target.

use std::collections::BTreeMap;

use crate::common::{Distance, Id};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    /// Known, not contacted yet.
    Pending,
    /// A request is in flight.
    InProgress,
    /// Responded.
    Finished,
    /// Timed out or errored.
    Failed,
}

impl PeerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeerState::Pending => "pending",
            PeerState::InProgress => "in-progress",
            PeerState::Finished => "finished",
            PeerState::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone)]
/// Peers known to a lookup and their state, ordered by distance to the target.
///
/// Only the `k` closest peers that did not fail are ever proposed as candidates,
/// so a lookup never spends requests on peers far from the target.
pub struct QPeerSet {
    k: usize,
    target: Id,
    /// Distance to a fixed target is unique per Id.
    peers: BTreeMap<Distance, (Id, PeerState)>,
    in_progress: usize,
}

impl QPeerSet {
    pub fn new(k: usize, target: Id) -> Self {
        QPeerSet {
            k,
            target,
            peers: BTreeMap::new(),
            in_progress: 0,
        }
    }

    pub fn target(&self) -> &Id {
        &self.target
    }

    /// Add a peer as pending, returns `false` if it was already known.
    pub fn add(&mut self, id: Id) -> bool {
        let distance = id.distance(&self.target);

        if self.peers.contains_key(&distance) {
            return false;
        }

        self.peers.insert(distance, (id, PeerState::Pending));
        true
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.peers.contains_key(&id.distance(&self.target))
    }

    pub fn state(&self, id: &Id) -> Option<PeerState> {
        self.peers
            .get(&id.distance(&self.target))
            .map(|(_, state)| *state)
    }

    pub fn mark_in_progress(&mut self, id: &Id) -> bool {
        self.set_state(id, PeerState::InProgress)
    }

    pub fn mark_finished(&mut self, id: &Id) -> bool {
        self.set_state(id, PeerState::Finished)
    }

    pub fn mark_failed(&mut self, id: &Id) -> bool {
        self.set_state(id, PeerState::Failed)
    }

    pub fn num_in_progress(&self) -> usize {
        self.in_progress
    }

    /// Closest pending peer within the candidate window.
    pub fn candidate(&self) -> Option<Id> {
        self.candidates().next()
    }

    pub fn num_candidates(&self) -> usize {
        self.candidates().count()
    }

    /// Up to `k` closest peers that responded.
    pub fn finished_k_closest(&self) -> Vec<Id> {
        self.iter()
            .filter(|(_, state)| *state == PeerState::Finished)
            .take(self.k)
            .map(|(id, _)| id)
            .collect()
    }

    /// Iterate over every peer and its state, closest first.
    pub fn iter(&self) -> impl Iterator<Item = (Id, PeerState)> + '_ {
        self.peers.values().copied()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    // === Private Methods ===

    fn candidates(&self) -> impl Iterator<Item = Id> + '_ {
        self.iter()
            .filter(|(_, state)| *state != PeerState::Failed)
            .take(self.k)
            .filter(|(_, state)| *state == PeerState::Pending)
            .map(|(id, _)| id)
    }

    fn set_state(&mut self, id: &Id, state: PeerState) -> bool {
        let Some((_, current)) = self.peers.get_mut(&id.distance(&self.target)) else {
            return false;
        };

        let previous = std::mem::replace(current, state);

        if previous == PeerState::InProgress {
            self.in_progress -= 1;
        }
        if state == PeerState::InProgress {
            self.in_progress += 1;
        }

        true
    }
}
