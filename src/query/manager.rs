use std::collections::{HashMap, VecDeque};

use bytes::Bytes;
use tracing::{debug, warn};

use crate::common::{Id, Peer, ResponseSpecific, DEFAULT_RTID};
use crate::routing::RoutingTables;
use crate::{Config, Result};

use super::{
    FindClosestResult, FindMembersResult, FindValueResult, Query, QueryDescriptor, QueryRequest,
    Responder,
};

/// Runs concurrent lookups.
///
/// Responses are routed to their lookup by the `context` the lookup put in its requests.
/// Responses for unknown contexts are dropped.
pub trait QueryManager {
    /// Start a lookup seeded from `tables`.
    fn start_query(&mut self, tables: &RoutingTables, descriptor: QueryDescriptor);

    fn on_find_node_response(&mut self, context: u64, from: &Id, peers: &[Peer]) -> Result<()>;

    fn on_find_value_response(
        &mut self,
        context: u64,
        from: &Id,
        peers: &[Peer],
        value: Option<Bytes>,
    ) -> Result<()>;

    fn on_find_swarm_response(
        &mut self,
        context: u64,
        from: &Id,
        peers: &[Peer],
        members: Vec<Peer>,
    ) -> Result<()>;

    fn on_find_pool_response(
        &mut self,
        context: u64,
        from: &Id,
        peers: &[Peer],
        members: Vec<Peer>,
    ) -> Result<()>;

    /// A request of the lookup `context` to `peer` failed.
    fn on_peer_error(&mut self, context: u64, peer: &Id);

    /// Fail timed out requests and drop finished lookups.
    fn check_timeouts(&mut self);

    /// Next request to send.
    fn pop_request(&mut self) -> Option<QueryRequest>;

    /// Number of lookups still running.
    fn active_queries(&self) -> usize;

    /// Dispatch any response to the matching `on_*_response` method.
    fn on_response(&mut self, from: &Id, response: ResponseSpecific) -> Result<()> {
        match response {
            ResponseSpecific::FindNode(arguments) => {
                self.on_find_node_response(arguments.context, from, &arguments.peers)
            }
            ResponseSpecific::FindValue(arguments) => self.on_find_value_response(
                arguments.context,
                from,
                &arguments.peers,
                arguments.value,
            ),
            ResponseSpecific::FindSwarm(arguments) => self.on_find_swarm_response(
                arguments.context,
                from,
                &arguments.peers,
                arguments.members,
            ),
            ResponseSpecific::FindPool(arguments) => self.on_find_pool_response(
                arguments.context,
                from,
                &arguments.peers,
                arguments.members,
            ),
        }
    }

    fn find_closest(
        &mut self,
        tables: &RoutingTables,
        rtid: Id,
        target: Id,
        responder: Responder<FindClosestResult>,
    ) {
        self.start_query(
            tables,
            QueryDescriptor::FindClosest {
                rtid,
                target,
                responder,
            },
        )
    }

    /// Find the closest peers to `target` in the main routing table.
    fn find_node(
        &mut self,
        tables: &RoutingTables,
        target: Id,
        responder: Responder<FindClosestResult>,
    ) {
        self.find_closest(tables, DEFAULT_RTID, target, responder)
    }

    fn find_value(
        &mut self,
        tables: &RoutingTables,
        key: Id,
        responder: Responder<FindValueResult>,
    ) {
        self.start_query(tables, QueryDescriptor::FindValue { key, responder })
    }

    fn find_swarm(
        &mut self,
        tables: &RoutingTables,
        swarm: Id,
        sample_size: Option<usize>,
        responder: Responder<FindMembersResult>,
    ) {
        self.start_query(
            tables,
            QueryDescriptor::FindSwarm {
                swarm,
                sample_size,
                responder,
            },
        )
    }

    fn find_pool(
        &mut self,
        tables: &RoutingTables,
        pool: Id,
        sample_size: Option<usize>,
        responder: Responder<FindMembersResult>,
    ) {
        self.start_query(
            tables,
            QueryDescriptor::FindPool {
                pool,
                sample_size,
                responder,
            },
        )
    }
}

#[derive(Debug)]
/// A [QueryManager] that runs every lookup it is asked to.
pub struct BasicQueryManager {
    config: Config,
    queries: HashMap<u64, Query>,
    next_context: u64,
    outbound: VecDeque<QueryRequest>,
}

impl BasicQueryManager {
    pub fn new(config: Config) -> Self {
        BasicQueryManager {
            config,
            queries: HashMap::new(),
            next_context: 0,
            outbound: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Requests waiting to be sent.
    pub fn pending_requests(&self) -> usize {
        self.outbound.len()
    }

    fn with_query<F>(&mut self, context: u64, from: &Id, f: F) -> Result<()>
    where
        F: FnOnce(&mut Query, &mut VecDeque<QueryRequest>) -> Result<()>,
    {
        let Some(query) = self.queries.get_mut(&context) else {
            warn!(context, ?from, "Response for unknown query");
            return Ok(());
        };

        let result = f(query, &mut self.outbound);

        if query.is_finished() {
            self.queries.remove(&context);
        }

        result
    }
}

impl Default for BasicQueryManager {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl QueryManager for BasicQueryManager {
    fn start_query(&mut self, tables: &RoutingTables, descriptor: QueryDescriptor) {
        let context = self.next_context;
        self.next_context = self.next_context.wrapping_add(1);

        let mut query = Query::new(context, &self.config, tables, descriptor);
        query.start(&mut self.outbound);

        if query.is_finished() {
            debug!(context, "Query finished without contacting any peer");
        } else {
            self.queries.insert(context, query);
        }
    }

    fn on_find_node_response(&mut self, context: u64, from: &Id, peers: &[Peer]) -> Result<()> {
        self.with_query(context, from, |query, outbound| {
            query.on_find_node_response(from, peers, outbound)
        })
    }

    fn on_find_value_response(
        &mut self,
        context: u64,
        from: &Id,
        peers: &[Peer],
        value: Option<Bytes>,
    ) -> Result<()> {
        self.with_query(context, from, |query, outbound| {
            query.on_find_value_response(from, peers, value, outbound)
        })
    }

    fn on_find_swarm_response(
        &mut self,
        context: u64,
        from: &Id,
        peers: &[Peer],
        members: Vec<Peer>,
    ) -> Result<()> {
        self.with_query(context, from, |query, outbound| {
            query.on_find_members_response(from, peers, members, outbound)
        })
    }

    fn on_find_pool_response(
        &mut self,
        context: u64,
        from: &Id,
        peers: &[Peer],
        members: Vec<Peer>,
    ) -> Result<()> {
        self.with_query(context, from, |query, outbound| {
            query.on_find_members_response(from, peers, members, outbound)
        })
    }

    fn on_peer_error(&mut self, context: u64, peer: &Id) {
        let _ = self.with_query(context, peer, |query, outbound| {
            query.on_peer_error(peer, outbound);
            Ok(())
        });
    }

    fn check_timeouts(&mut self) {
        for query in self.queries.values_mut() {
            query.check_timeouts(&mut self.outbound);
        }

        self.queries.retain(|_, query| !query.is_finished());
    }

    fn pop_request(&mut self) -> Option<QueryRequest> {
        self.outbound.pop_front()
    }

    fn active_queries(&self) -> usize {
        self.queries.len()
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;
    use crate::common::{FindNodeResponseArguments, RequestSpecific};

    fn tables(local: Id, peers: &[Peer]) -> RoutingTables {
        let mut tables = RoutingTables::new(local, 20, 20);
        for peer in peers {
            tables.main_mut().add(*peer);
        }
        tables
    }

    #[test]
    fn contexts_are_distinct() {
        let seeds: Vec<Peer> = (0..3).map(|i| Peer::with_id(Id::random(), i)).collect();
        let tables = tables(Id::random(), &seeds);
        let mut manager = BasicQueryManager::default();

        manager.find_node(&tables, Id::random(), Responder::noop());
        manager.find_value(&tables, Id::random(), Responder::noop());

        assert_eq!(manager.active_queries(), 2);

        let mut contexts = Vec::new();
        while let Some(request) = manager.pop_request() {
            contexts.push(request.context);
        }
        contexts.dedup();

        assert_eq!(contexts, vec![0, 1]);
    }

    #[test]
    fn unknown_context_is_ignored() {
        let mut manager = BasicQueryManager::default();

        assert!(manager
            .on_find_node_response(42, &Id::random(), &[])
            .is_ok());
        manager.on_peer_error(42, &Id::random());
    }

    #[test]
    fn dispatches_responses() {
        let peer = Peer::with_id(Id::random(), 1);
        let tables = tables(Id::random(), &[peer]);
        let mut manager = BasicQueryManager::default();
        let (tx, rx) = flume::unbounded();

        manager.find_node(&tables, Id::random(), tx.into());

        let request = manager.pop_request().unwrap();
        assert!(matches!(request.request, RequestSpecific::FindNode(_)));
        assert_eq!(request.to, peer);

        manager
            .on_response(
                &peer.id,
                ResponseSpecific::FindNode(FindNodeResponseArguments {
                    context: request.context,
                    peers: vec![],
                }),
            )
            .unwrap();

        assert_eq!(manager.active_queries(), 0);
        assert_eq!(rx.try_recv().ok().map(|r| r.closest), Some(vec![peer]));
    }

    #[test]
    fn timeouts_drop_finished_queries() {
        let tables = tables(Id::random(), &[Peer::with_id(Id::random(), 1)]);
        let mut manager = BasicQueryManager::new(Config {
            query_request_timeout: Duration::from_millis(10),
            ..Default::default()
        });
        let (tx, rx) = flume::unbounded();

        manager.find_node(&tables, Id::random(), tx.into());
        assert_eq!(manager.active_queries(), 1);

        std::thread::sleep(Duration::from_millis(30));
        manager.check_timeouts();

        assert_eq!(manager.active_queries(), 0);
        assert_eq!(rx.try_recv().ok().map(|r| r.closest.len()), Some(0));
    }
}
