//! Answering inbound lookups and storing what peers ask us to store.

pub mod swarms;

use std::num::NonZeroUsize;

use bytes::Bytes;
use lru::LruCache;
use tracing::debug;

use crate::common::{
    FindMembersRequestArguments, FindMembersResponseArguments, FindNodeRequestArguments,
    FindNodeResponseArguments, FindValueRequestArguments, FindValueResponseArguments, Id,
    JoinRequestArguments, Peer, RequestSpecific, ResponseSpecific, StoreRequestArguments,
    DEFAULT_RTID,
};
use crate::routing::RoutingTables;
use crate::Config;

use swarms::SwarmTracker;

/// Overlay server that handles incoming requests.
pub trait Server: std::fmt::Debug {
    /// Handle an incoming request from `from`.
    ///
    /// Returns the response to send back, or `None` for requests that are not answered
    /// (`store` and `join_*`).
    ///
    /// This is called on the thread driving the overlay, so it needs to be fast.
    fn handle_request(
        &mut self,
        tables: &RoutingTables,
        from: &Peer,
        request: RequestSpecific,
    ) -> Option<ResponseSpecific>;
}

#[derive(Debug)]
/// Default implementation of the [Server] trait.
///
/// Values are kept in an LRU cache of [Config::max_values] entries, swarm and pool
/// members for [Config::swarm_ttl] after they joined.
pub struct DefaultServer {
    /// Number of members returned per swarm or pool lookup.
    sample_size: usize,
    /// Stored values
    pub values: LruCache<Id, Bytes>,
    /// Swarm members
    pub swarms: SwarmTracker,
    /// Pool members
    pub pools: SwarmTracker,
}

impl Default for DefaultServer {
    fn default() -> Self {
        DefaultServer::new(&Config::default())
    }
}

impl DefaultServer {
    pub fn new(config: &Config) -> Self {
        Self {
            sample_size: config.k,
            values: LruCache::new(NonZeroUsize::new(config.max_values).unwrap_or(NonZeroUsize::MIN)),
            swarms: SwarmTracker::new(config.swarm_ttl),
            pools: SwarmTracker::new(config.swarm_ttl),
        }
    }

    /// Evict expired swarm and pool members.
    pub fn clean(&mut self) {
        self.swarms.clean();
        self.pools.clean();
    }
}

impl Server for DefaultServer {
    fn handle_request(
        &mut self,
        tables: &RoutingTables,
        from: &Peer,
        request: RequestSpecific,
    ) -> Option<ResponseSpecific> {
        let closest = |rtid: &Id, target: &Id| tables.closest(rtid, target, Some(&from.id));

        match request {
            RequestSpecific::FindNode(FindNodeRequestArguments {
                context,
                target,
                rtid,
            }) => Some(ResponseSpecific::FindNode(FindNodeResponseArguments {
                context,
                peers: closest(&rtid.unwrap_or(DEFAULT_RTID), &target),
            })),
            RequestSpecific::FindValue(FindValueRequestArguments { context, key }) => {
                Some(ResponseSpecific::FindValue(FindValueResponseArguments {
                    context,
                    peers: closest(&DEFAULT_RTID, &key),
                    value: self.values.get(&key).cloned(),
                }))
            }
            RequestSpecific::FindSwarm(FindMembersRequestArguments { context, id }) => {
                Some(ResponseSpecific::FindSwarm(FindMembersResponseArguments {
                    context,
                    peers: closest(&DEFAULT_RTID, &id),
                    members: self.swarms.sample(&id, self.sample_size),
                }))
            }
            RequestSpecific::FindPool(FindMembersRequestArguments { context, id }) => {
                Some(ResponseSpecific::FindPool(FindMembersResponseArguments {
                    context,
                    peers: closest(&DEFAULT_RTID, &id),
                    members: self.pools.sample(&id, self.sample_size),
                }))
            }
            RequestSpecific::Store(StoreRequestArguments { key, value }) => {
                debug!(?key, from = ?from.id, size = value.len(), "Storing value");
                self.values.put(key, value);
                None
            }
            RequestSpecific::JoinSwarm(JoinRequestArguments { id }) => {
                debug!(swarm = ?id, from = ?from.id, "Peer joined swarm");
                self.swarms.add(id, *from);
                None
            }
            RequestSpecific::JoinPool(JoinRequestArguments { id }) => {
                debug!(pool = ?id, from = ?from.id, "Peer joined pool");
                self.pools.add(id, *from);
                None
            }
        }
    }
}
