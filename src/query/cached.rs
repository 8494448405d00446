//! Coalescing and short lived caching of lookups.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::rc::Rc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::trace;

use crate::common::{Id, Peer};
use crate::routing::RoutingTables;
use crate::{Config, Result};

use super::{
    BasicQueryManager, FindClosestResult, FindMembersResult, FindValueResult, QueryDescriptor,
    QueryManager, QueryRequest, Responder,
};

#[derive(Debug)]
struct CacheEntry<T> {
    in_progress: bool,
    result: Option<T>,
    completed_at: Option<Instant>,
    pending: VecDeque<Responder<T>>,
}

impl<T> Default for CacheEntry<T> {
    fn default() -> Self {
        CacheEntry {
            in_progress: false,
            result: None,
            completed_at: None,
            pending: VecDeque::new(),
        }
    }
}

impl<T> CacheEntry<T> {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.completed_at
            .map(|completed_at| completed_at.elapsed() > ttl)
            .unwrap_or(false)
    }
}

type Entries<K, T> = HashMap<K, Rc<RefCell<CacheEntry<T>>>>;

/// A [QueryManager] wrapper that starts at most one lookup for identical descriptors.
///
/// While a lookup is running, identical lookups wait for its result. Once it completes,
/// its result is replayed to identical lookups until the cache TTL elapses.
///
/// Results are delivered on the thread driving the manager, callbacks must not call
/// back into it.
#[derive(Debug)]
pub struct CachingQueryManager<Q = BasicQueryManager> {
    inner: Q,
    ttl: Duration,
    /// Sample size of member lookups that do not ask for one.
    default_sample_size: usize,
    closest: Entries<(Id, Id), FindClosestResult>,
    values: Entries<Id, FindValueResult>,
    swarms: Entries<(Id, usize), FindMembersResult>,
    pools: Entries<(Id, usize), FindMembersResult>,
}

impl CachingQueryManager<BasicQueryManager> {
    pub fn new(config: Config) -> Self {
        let (ttl, k) = (config.query_cache_ttl, config.k);
        Self::with_inner(BasicQueryManager::new(config), ttl, k)
    }
}

impl Default for CachingQueryManager<BasicQueryManager> {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl<Q: QueryManager> CachingQueryManager<Q> {
    /// Wrap `inner`, whose member lookups sample `k` members when no sample size is given.
    pub fn with_inner(inner: Q, ttl: Duration, k: usize) -> Self {
        CachingQueryManager {
            inner,
            ttl,
            default_sample_size: k,
            closest: HashMap::new(),
            values: HashMap::new(),
            swarms: HashMap::new(),
            pools: HashMap::new(),
        }
    }

    pub fn inner(&self) -> &Q {
        &self.inner
    }

    /// Number of cached lookups, running or completed.
    pub fn cached(&self) -> usize {
        self.closest.len() + self.values.len() + self.swarms.len() + self.pools.len()
    }

    fn purge_expired(&mut self) {
        let ttl = self.ttl;

        purge(&mut self.closest, ttl);
        purge(&mut self.values, ttl);
        purge(&mut self.swarms, ttl);
        purge(&mut self.pools, ttl);
    }
}

/// Either answer `responder` from the cache, queue it behind a running lookup, or
/// return the responder of a new lookup that fills the cache.
fn lookup<K, T>(
    entries: &mut Entries<K, T>,
    key: K,
    ttl: Duration,
    responder: Responder<T>,
) -> Option<Responder<T>>
where
    K: Hash + Eq,
    T: Clone + 'static,
{
    let entry = entries.entry(key).or_default().clone();

    let mut state = entry.borrow_mut();

    if !state.in_progress && state.is_expired(ttl) {
        state.result = None;
        state.completed_at = None;
    }

    if let Some(result) = state.result.clone() {
        drop(state);

        trace!("Replaying cached query result");
        responder.respond(result);
        return None;
    }

    state.pending.push_back(responder);

    if state.in_progress {
        trace!(waiting = state.pending.len(), "Coalesced query");
        return None;
    }

    state.in_progress = true;
    drop(state);

    let entry = entry.clone();

    Some(Responder::callback(move |result: T| {
        let pending = {
            let mut state = entry.borrow_mut();

            state.in_progress = false;
            state.result = Some(result.clone());
            state.completed_at = Some(Instant::now());

            std::mem::take(&mut state.pending)
        };

        for responder in pending {
            responder.respond(result.clone());
        }
    }))
}

fn purge<K, T>(entries: &mut Entries<K, T>, ttl: Duration)
where
    K: Hash + Eq,
{
    entries.retain(|_, entry| {
        let entry = entry.borrow();
        entry.in_progress || !entry.is_expired(ttl)
    });
}

impl<Q: QueryManager> QueryManager for CachingQueryManager<Q> {
    fn start_query(&mut self, tables: &RoutingTables, descriptor: QueryDescriptor) {
        let ttl = self.ttl;
        let default_sample_size = self.default_sample_size;

        let descriptor = match descriptor {
            QueryDescriptor::FindClosest {
                rtid,
                target,
                responder,
            } => lookup(&mut self.closest, (rtid, target), ttl, responder).map(|responder| {
                QueryDescriptor::FindClosest {
                    rtid,
                    target,
                    responder,
                }
            }),
            QueryDescriptor::FindValue { key, responder } => {
                lookup(&mut self.values, key, ttl, responder)
                    .map(|responder| QueryDescriptor::FindValue { key, responder })
            }
            QueryDescriptor::FindSwarm {
                swarm,
                sample_size,
                responder,
            } => lookup(
                &mut self.swarms,
                (swarm, sample_size.unwrap_or(default_sample_size)),
                ttl,
                responder,
            ).map(
                |responder| QueryDescriptor::FindSwarm {
                    swarm,
                    sample_size,
                    responder,
                },
            ),
            QueryDescriptor::FindPool {
                pool,
                sample_size,
                responder,
            } => lookup(
                &mut self.pools,
                (pool, sample_size.unwrap_or(default_sample_size)),
                ttl,
                responder,
            ).map(
                |responder| QueryDescriptor::FindPool {
                    pool,
                    sample_size,
                    responder,
                },
            ),
        };

        if let Some(descriptor) = descriptor {
            self.inner.start_query(tables, descriptor);
        }
    }

    fn on_find_node_response(&mut self, context: u64, from: &Id, peers: &[Peer]) -> Result<()> {
        self.inner.on_find_node_response(context, from, peers)
    }

    fn on_find_value_response(
        &mut self,
        context: u64,
        from: &Id,
        peers: &[Peer],
        value: Option<Bytes>,
    ) -> Result<()> {
        self.inner
            .on_find_value_response(context, from, peers, value)
    }

    fn on_find_swarm_response(
        &mut self,
        context: u64,
        from: &Id,
        peers: &[Peer],
        members: Vec<Peer>,
    ) -> Result<()> {
        self.inner
            .on_find_swarm_response(context, from, peers, members)
    }

    fn on_find_pool_response(
        &mut self,
        context: u64,
        from: &Id,
        peers: &[Peer],
        members: Vec<Peer>,
    ) -> Result<()> {
        self.inner
            .on_find_pool_response(context, from, peers, members)
    }

    fn on_peer_error(&mut self, context: u64, peer: &Id) {
        self.inner.on_peer_error(context, peer)
    }

    fn check_timeouts(&mut self) {
        self.inner.check_timeouts();
        self.purge_expired();
    }

    fn pop_request(&mut self) -> Option<QueryRequest> {
        self.inner.pop_request()
    }

    fn active_queries(&self) -> usize {
        self.inner.active_queries()
    }
}

#[cfg(test)]
mod test {
    use std::cell::Cell;

    use super::*;
    use crate::DEFAULT_K;

    fn tables_with(peers: &[Peer]) -> RoutingTables {
        let mut tables = RoutingTables::new(Id::random(), 20, 20);
        for peer in peers {
            tables.main_mut().add(*peer);
        }
        tables
    }

    fn counter<T: 'static>(count: &Rc<Cell<usize>>) -> Responder<T> {
        let count = count.clone();
        Responder::callback(move |_| count.set(count.get() + 1))
    }

    #[test]
    fn coalesces_identical_lookups() {
        let peer = Peer::with_id(Id::random(), 1);
        let tables = tables_with(&[peer]);
        let mut manager = CachingQueryManager::new(Config::default());
        let delivered = Rc::new(Cell::new(0));

        let target = Id::random();
        for _ in 0..3 {
            manager.find_node(&tables, target, counter(&delivered));
        }

        assert_eq!(manager.active_queries(), 1);
        assert_eq!(manager.cached(), 1);

        let request = manager.pop_request().unwrap();
        assert!(manager.pop_request().is_none());

        manager
            .on_find_node_response(request.context, &peer.id, &[])
            .unwrap();

        assert_eq!(delivered.get(), 3);

        // Replayed without a new lookup.
        manager.find_node(&tables, target, counter(&delivered));
        assert_eq!(delivered.get(), 4);
        assert!(manager.pop_request().is_none());
    }

    #[test]
    fn distinct_descriptors_are_not_coalesced() {
        let tables = tables_with(&[Peer::with_id(Id::random(), 1)]);
        let mut manager = CachingQueryManager::new(Config::default());
        let swarm = Id::random();

        manager.find_swarm(&tables, swarm, Some(5), Responder::noop());
        manager.find_swarm(&tables, swarm, Some(10), Responder::noop());
        manager.find_pool(&tables, swarm, Some(5), Responder::noop());

        assert_eq!(manager.active_queries(), 3);
    }

    #[test]
    fn default_sample_size_shares_the_cache() {
        let peer = Peer::with_id(Id::random(), 1);
        let tables = tables_with(&[peer]);
        let mut manager = CachingQueryManager::new(Config::default());
        let delivered = Rc::new(Cell::new(0));
        let swarm = Id::random();

        manager.find_swarm(&tables, swarm, None, counter(&delivered));
        manager.find_swarm(&tables, swarm, Some(DEFAULT_K), counter(&delivered));

        assert_eq!(manager.active_queries(), 1);
        assert_eq!(manager.cached(), 1);

        let request = manager.pop_request().unwrap();
        assert!(manager.pop_request().is_none());
        manager
            .on_find_swarm_response(request.context, &peer.id, &[], vec![])
            .unwrap();

        assert_eq!(delivered.get(), 2);

        // Replayed for an explicit default size as well.
        manager.find_pool(&tables, swarm, Some(DEFAULT_K), Responder::noop());
        manager.find_pool(&tables, swarm, None, counter(&delivered));
        assert_eq!(manager.active_queries(), 1);
    }

    #[test]
    fn expired_results_are_refreshed() {
        let peer = Peer::with_id(Id::random(), 1);
        let tables = tables_with(&[peer]);
        let mut manager =
            CachingQueryManager::with_inner(
            BasicQueryManager::default(),
            Duration::from_millis(20),
            DEFAULT_K,
        );

        let key = Id::random();
        manager.find_value(&tables, key, Responder::noop());
        let request = manager.pop_request().unwrap();
        manager
            .on_find_value_response(request.context, &peer.id, &[], None)
            .unwrap();

        manager.find_value(&tables, key, Responder::noop());
        assert!(manager.pop_request().is_none());

        std::thread::sleep(Duration::from_millis(40));

        manager.find_value(&tables, key, Responder::noop());
        assert!(manager.pop_request().is_some());
    }

    #[test]
    fn check_timeouts_purges_expired_entries() {
        let tables = RoutingTables::new(Id::random(), 20, 20);
        let mut manager =
            CachingQueryManager::with_inner(
            BasicQueryManager::default(),
            Duration::from_millis(10),
            DEFAULT_K,
        );

        // Completes immediately, nothing to ask.
        manager.find_node(&tables, Id::random(), Responder::noop());
        assert_eq!(manager.cached(), 1);

        std::thread::sleep(Duration::from_millis(30));
        manager.check_timeouts();

        assert_eq!(manager.cached(), 0);
    }
}
