//! State machine of a single iterative lookup.

use std::collections::{HashMap, HashSet, VecDeque};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{debug, trace};

use crate::common::{
    FindMembersRequestArguments, FindNodeRequestArguments, FindValueRequestArguments, Id, Peer,
    RequestSpecific, DEFAULT_RTID,
};
use crate::routing::RoutingTables;
use crate::{Config, Error, Result};

use super::{
    FindClosestResult, FindMembersResult, FindValueResult, PeerState, QPeerSet, QueryDescriptor,
    Responder,
};

#[derive(Debug, Clone, PartialEq)]
/// A request a lookup wants sent.
pub struct QueryRequest {
    pub context: u64,
    pub to: Peer,
    pub request: RequestSpecific,
}

#[derive(Debug)]
struct ActiveRequest {
    peer: Id,
    start: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MembersOf {
    Swarm,
    Pool,
}

#[derive(Debug)]
enum QueryKind {
    FindClosest {
        rtid: Id,
        responder: Option<Responder<FindClosestResult>>,
    },
    FindValue {
        /// The value and the peer that provided it.
        found: Option<(Bytes, Id)>,
        responder: Option<Responder<FindValueResult>>,
    },
    FindMembers {
        of: MembersOf,
        sample_size: usize,
        members: Vec<Peer>,
        seen: HashSet<Id>,
        responder: Option<Responder<FindMembersResult>>,
    },
}

/// What a response carries besides closer peers.
enum Extra {
    None,
    Value(Option<Bytes>),
    Members(Vec<Peer>),
}

#[derive(Debug)]
/// An iterative lookup.
///
/// Keeps at most `alpha` requests in flight, always to the closest pending peers among
/// the `k` closest known peers, until no candidates remain or the lookup finishes early
/// (value found, enough swarm or pool members sampled).
pub struct Query {
    context: u64,
    local_id: Id,
    target: Id,
    alpha: usize,
    request_timeout: Duration,
    peers: QPeerSet,
    addresses: HashMap<Id, SocketAddr>,
    active_requests: Vec<ActiveRequest>,
    kind: QueryKind,
    finished: bool,
}

impl Query {
    /// Create a lookup seeded from the closest peers of the relevant routing table.
    pub fn new(
        context: u64,
        config: &Config,
        tables: &RoutingTables,
        descriptor: QueryDescriptor,
    ) -> Self {
        let rtid = descriptor.rtid();
        let target = descriptor.target();
        let seeds = tables.closest(&rtid, &target, None);

        let kind = match descriptor {
            QueryDescriptor::FindClosest {
                rtid, responder, ..
            } => QueryKind::FindClosest {
                rtid,
                responder: Some(responder),
            },
            QueryDescriptor::FindValue { responder, .. } => QueryKind::FindValue {
                found: None,
                responder: Some(responder),
            },
            QueryDescriptor::FindSwarm {
                sample_size,
                responder,
                ..
            } => QueryKind::FindMembers {
                of: MembersOf::Swarm,
                sample_size: sample_size.unwrap_or(config.k),
                members: Vec::new(),
                seen: HashSet::new(),
                responder: Some(responder),
            },
            QueryDescriptor::FindPool {
                sample_size,
                responder,
                ..
            } => QueryKind::FindMembers {
                of: MembersOf::Pool,
                sample_size: sample_size.unwrap_or(config.k),
                members: Vec::new(),
                seen: HashSet::new(),
                responder: Some(responder),
            },
        };

        trace!(context, ?target, ?rtid, seeds = seeds.len(), "New Query");

        let mut query = Query {
            context,
            local_id: *tables.id(),
            target,
            alpha: config.alpha,
            request_timeout: config.query_request_timeout,
            peers: QPeerSet::new(config.k, target),
            addresses: HashMap::new(),
            active_requests: Vec::new(),
            kind,
            finished: false,
        };

        query.add_peers(&seeds);
        query
    }

    // === Getters ===

    pub fn context(&self) -> u64 {
        self.context
    }

    pub fn target(&self) -> &Id {
        &self.target
    }

    pub fn peers(&self) -> &QPeerSet {
        &self.peers
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    // === Public Methods ===

    /// Send the first requests, finishes immediately if there are no seeds.
    pub fn start(&mut self, outbound: &mut VecDeque<QueryRequest>) {
        self.make_requests(outbound);
    }

    pub fn on_find_node_response(
        &mut self,
        from: &Id,
        peers: &[Peer],
        outbound: &mut VecDeque<QueryRequest>,
    ) -> Result<()> {
        self.on_response(from, peers, Extra::None, outbound)
    }

    pub fn on_find_value_response(
        &mut self,
        from: &Id,
        peers: &[Peer],
        value: Option<Bytes>,
        outbound: &mut VecDeque<QueryRequest>,
    ) -> Result<()> {
        self.on_response(from, peers, Extra::Value(value), outbound)
    }

    /// Response to a swarm or pool lookup.
    pub fn on_find_members_response(
        &mut self,
        from: &Id,
        peers: &[Peer],
        members: Vec<Peer>,
        outbound: &mut VecDeque<QueryRequest>,
    ) -> Result<()> {
        self.on_response(from, peers, Extra::Members(members), outbound)
    }

    /// A peer failed to respond, it will not be a candidate again.
    pub fn on_peer_error(&mut self, peer: &Id, outbound: &mut VecDeque<QueryRequest>) {
        if self.finished {
            return;
        }

        match self.peers.state(peer) {
            None | Some(PeerState::Finished) => return,
            Some(_) => {}
        }

        debug!(context = self.context, ?peer, "Query peer failed");

        self.remove_active_request(peer);
        self.peers.mark_failed(peer);
        self.make_requests(outbound);
    }

    /// Fail every request that has been in flight longer than the request timeout.
    pub fn check_timeouts(&mut self, outbound: &mut VecDeque<QueryRequest>) {
        if self.finished {
            return;
        }

        let timed_out: Vec<Id> = self
            .active_requests
            .iter()
            .filter(|request| request.start.elapsed() > self.request_timeout)
            .map(|request| request.peer)
            .collect();

        for peer in timed_out {
            self.on_peer_error(&peer, outbound);
        }
    }

    // === Private Methods ===

    fn on_response(
        &mut self,
        from: &Id,
        peers: &[Peer],
        extra: Extra,
        outbound: &mut VecDeque<QueryRequest>,
    ) -> Result<()> {
        if self.finished {
            trace!(context = self.context, ?from, "Response after query finished");
            return Ok(());
        }

        match self.peers.state(from) {
            Some(PeerState::InProgress) | Some(PeerState::Failed) => {}
            state => {
                return Err(Error::UnexpectedResponse {
                    context: self.context,
                    from: *from,
                    state: state.map(|s| s.as_str()).unwrap_or("unknown"),
                })
            }
        }

        trace!(context = self.context, ?from, peers = peers.len(), "Query got response");

        self.peers.mark_finished(from);
        self.remove_active_request(from);
        self.add_peers(peers);

        let done = match (&mut self.kind, extra) {
            (QueryKind::FindValue { found, .. }, Extra::Value(Some(value))) => {
                *found = Some((value, *from));
                true
            }
            (
                QueryKind::FindMembers {
                    sample_size,
                    members,
                    seen,
                    ..
                },
                Extra::Members(incoming),
            ) => {
                for member in incoming {
                    if seen.insert(member.id) {
                        members.push(member);
                    }
                }

                if members.len() >= *sample_size {
                    members.truncate(*sample_size);
                    true
                } else {
                    false
                }
            }
            _ => false,
        };

        if done {
            self.finish();
        } else {
            self.make_requests(outbound);
        }

        Ok(())
    }

    fn make_requests(&mut self, outbound: &mut VecDeque<QueryRequest>) {
        debug_assert!(!self.finished);

        while self.peers.num_in_progress() < self.alpha {
            let Some(candidate) = self.peers.candidate() else {
                break;
            };

            self.peers.mark_in_progress(&candidate);
            self.active_requests.push(ActiveRequest {
                peer: candidate,
                start: Instant::now(),
            });

            if let Some(address) = self.addresses.get(&candidate) {
                trace!(context = self.context, ?candidate, "Query request");

                outbound.push_back(QueryRequest {
                    context: self.context,
                    to: Peer::new(candidate, *address),
                    request: self.request(),
                });
            }
        }

        if self.peers.num_in_progress() == 0 && self.peers.num_candidates() == 0 {
            self.finish();
        }
    }

    fn request(&self) -> RequestSpecific {
        let context = self.context;
        let target = self.target;

        match &self.kind {
            QueryKind::FindClosest { rtid, .. } => {
                RequestSpecific::FindNode(FindNodeRequestArguments {
                    context,
                    target,
                    rtid: (*rtid != DEFAULT_RTID).then_some(*rtid),
                })
            }
            QueryKind::FindValue { .. } => {
                RequestSpecific::FindValue(FindValueRequestArguments {
                    context,
                    key: target,
                })
            }
            QueryKind::FindMembers { of, .. } => {
                let arguments = FindMembersRequestArguments {
                    context,
                    id: target,
                };

                match of {
                    MembersOf::Swarm => RequestSpecific::FindSwarm(arguments),
                    MembersOf::Pool => RequestSpecific::FindPool(arguments),
                }
            }
        }
    }

    fn add_peers(&mut self, peers: &[Peer]) {
        for peer in peers {
            if peer.id != self.local_id {
                self.addresses.entry(peer.id).or_insert(peer.address);
                self.peers.add(peer.id);
            }
        }
    }

    fn remove_active_request(&mut self, peer: &Id) {
        self.active_requests.retain(|request| request.peer != *peer);
    }

    fn to_peer(&self, id: &Id) -> Option<Peer> {
        self.addresses
            .get(id)
            .map(|address| Peer::new(*id, *address))
    }

    fn finish(&mut self) {
        assert!(!self.finished, "Query {} finished twice", self.context);
        self.finished = true;

        let closest: Vec<Peer> = self
            .peers
            .finished_k_closest()
            .iter()
            .filter_map(|id| self.to_peer(id))
            .collect();

        debug!(
            context = self.context,
            target = ?self.target,
            closest = closest.len(),
            visited = self.peers.len(),
            "Query finished"
        );

        let target = self.target;

        match &mut self.kind {
            QueryKind::FindClosest { rtid, responder } => {
                if let Some(responder) = responder.take() {
                    responder.respond(FindClosestResult {
                        rtid: *rtid,
                        target,
                        closest,
                    });
                }
            }
            QueryKind::FindValue { found, responder } => {
                let (value, provider) = match found.take() {
                    Some((value, provider)) => (Some(value), Some(provider)),
                    None => (None, None),
                };

                let cache_target = self
                    .peers
                    .iter()
                    .filter(|(id, state)| *state == PeerState::Finished && Some(*id) != provider)
                    .find_map(|(id, _)| {
                        self.addresses
                            .get(&id)
                            .map(|address| Peer::new(id, *address))
                    });

                if let Some(responder) = responder.take() {
                    responder.respond(FindValueResult {
                        key: target,
                        value,
                        provider: provider.and_then(|id| {
                            self.addresses
                                .get(&id)
                                .map(|address| Peer::new(id, *address))
                        }),
                        cache_target,
                        closest,
                    });
                }
            }
            QueryKind::FindMembers {
                members, responder, ..
            } => {
                if let Some(responder) = responder.take() {
                    responder.respond(FindMembersResult {
                        id: target,
                        closest,
                        members: std::mem::take(members),
                    });
                }
            }
        }
    }
}
