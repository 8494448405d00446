//! The main routing table and the per swarm, pool and topic tables.

use std::collections::HashMap;

use tracing::info;

use crate::common::{Id, Peer, DEFAULT_RTID};
use crate::Config;

use super::RoutingTable;

#[derive(Debug, Clone)]
/// Routing tables of a node, keyed by routing table id.
///
/// The main table lives under [DEFAULT_RTID] and is never removed.
pub struct RoutingTables {
    id: Id,
    k: usize,
    topic_k: usize,
    tables: HashMap<Id, RoutingTable>,
}

impl RoutingTables {
    /// Create the tables of node `id`, the main table with bucket capacity `k` and
    /// every other table with bucket capacity `topic_k`.
    pub fn new(id: Id, k: usize, topic_k: usize) -> Self {
        let mut tables = HashMap::new();
        tables.insert(DEFAULT_RTID, RoutingTable::new(id, k));

        RoutingTables {
            id,
            k,
            topic_k,
            tables,
        }
    }

    pub fn with_config(id: Id, config: &Config) -> Self {
        Self::new(id, config.k, config.topic_k)
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    /// Get or create the table `rtid`.
    pub fn create(&mut self, rtid: Id) -> &mut RoutingTable {
        let (id, topic_k) = (self.id, self.topic_k);

        self.tables.entry(rtid).or_insert_with(|| {
            info!(?rtid, "Created routing table");
            RoutingTable::new(id, topic_k)
        })
    }

    pub fn contains(&self, rtid: &Id) -> bool {
        self.tables.contains_key(rtid)
    }

    pub fn get(&self, rtid: &Id) -> Option<&RoutingTable> {
        self.tables.get(rtid)
    }

    pub fn get_mut(&mut self, rtid: &Id) -> Option<&mut RoutingTable> {
        self.tables.get_mut(rtid)
    }

    /// Remove the table `rtid`, does nothing for the main table.
    pub fn remove(&mut self, rtid: &Id) -> Option<RoutingTable> {
        if *rtid == DEFAULT_RTID {
            return None;
        }

        self.tables.remove(rtid)
    }

    /// Remove a peer from every table, for example after it disconnected.
    pub fn remove_peer(&mut self, id: &Id) {
        for table in self.tables.values_mut() {
            table.remove(id);
        }
    }

    pub fn main(&self) -> &RoutingTable {
        // The main table is inserted on creation and never removed.
        &self.tables[&DEFAULT_RTID]
    }

    pub fn main_mut(&mut self) -> &mut RoutingTable {
        self.create(DEFAULT_RTID)
    }

    /// Add a peer to the table `rtid`, creating the table if needed.
    pub fn add_peer(&mut self, rtid: Id, peer: Peer) -> bool {
        self.create(rtid).add(peer)
    }

    /// Closest peers to `target` in the table `rtid`, empty if there is no such table.
    pub fn closest(&self, rtid: &Id, target: &Id, ignore: Option<&Id>) -> Vec<Peer> {
        self.tables
            .get(rtid)
            .map(|table| table.closest(target, ignore))
            .unwrap_or_default()
    }

    /// The first `k` peers of the table `rtid`, empty if there is no such table.
    pub fn sample(&self, rtid: &Id) -> Vec<Peer> {
        self.tables
            .get(rtid)
            .map(|table| table.sample(self.k))
            .unwrap_or_default()
    }

    /// Number of tables, including the main table.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Number of peers across every table, a peer in two tables counts twice.
    pub fn size(&self) -> usize {
        self.tables.values().map(|table| table.size()).sum()
    }

    pub fn rtids(&self) -> impl Iterator<Item = &Id> {
        self.tables.keys()
    }
}
