//! Lookup requests and their results.

use bytes::Bytes;

use crate::common::{Id, Peer, DEFAULT_RTID};

use super::Responder;

#[derive(Debug)]
/// A lookup to start on a [crate::query::QueryManager].
pub enum QueryDescriptor {
    /// Find the closest peers to `target` in the routing table `rtid`.
    FindClosest {
        rtid: Id,
        target: Id,
        responder: Responder<FindClosestResult>,
    },
    /// Find a value stored under `key`, stops at the first peer that has it.
    FindValue {
        key: Id,
        responder: Responder<FindValueResult>,
    },
    /// Sample members of a swarm, stops once `sample_size` (default `k`) distinct
    /// members are known.
    FindSwarm {
        swarm: Id,
        sample_size: Option<usize>,
        responder: Responder<FindMembersResult>,
    },
    /// Sample members of a pool, stops once `sample_size` (default `k`) distinct
    /// members are known.
    FindPool {
        pool: Id,
        sample_size: Option<usize>,
        responder: Responder<FindMembersResult>,
    },
}

impl QueryDescriptor {
    /// Routing table the lookup is seeded from.
    pub fn rtid(&self) -> Id {
        match self {
            QueryDescriptor::FindClosest { rtid, .. } => *rtid,
            _ => DEFAULT_RTID,
        }
    }

    pub fn target(&self) -> Id {
        match self {
            QueryDescriptor::FindClosest { target, .. } => *target,
            QueryDescriptor::FindValue { key, .. } => *key,
            QueryDescriptor::FindSwarm { swarm, .. } => *swarm,
            QueryDescriptor::FindPool { pool, .. } => *pool,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FindClosestResult {
    pub rtid: Id,
    pub target: Id,
    /// Up to `k` closest peers that responded, closest first.
    pub closest: Vec<Peer>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FindValueResult {
    pub key: Id,
    /// The value, if any peer had it.
    pub value: Option<Bytes>,
    /// The peer that responded with the value.
    pub provider: Option<Peer>,
    /// Closest responding peer that is not the provider, where the value may be cached.
    pub cache_target: Option<Peer>,
    pub closest: Vec<Peer>,
}

#[derive(Debug, Clone, PartialEq)]
/// Result of a swarm or pool lookup.
pub struct FindMembersResult {
    /// Swarm or pool id.
    pub id: Id,
    pub closest: Vec<Peer>,
    /// Distinct members, in the order they were discovered.
    pub members: Vec<Peer>,
}
