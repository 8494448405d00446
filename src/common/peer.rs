//! Struct and implementation of the Peer entry in the Kademlia routing table
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use crate::common::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Peer entry in a Kademlia routing table, an [Id] and the address it is reachable at.
pub struct Peer {
    pub id: Id,
    pub address: SocketAddr,
}

impl Peer {
    /// Creates a new Peer from an id and socket address.
    pub fn new(id: Id, address: SocketAddr) -> Peer {
        Peer { id, address }
    }

    /// Creates a peer with random Id and an unspecified IPv4 address.
    pub fn random() -> Peer {
        Peer {
            id: Id::random(),
            address: SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0).into(),
        }
    }

    /// Creates a peer with a given Id and a loopback address derived from `port`.
    pub fn with_id(id: Id, port: u16) -> Peer {
        Peer {
            id,
            address: SocketAddrV4::new(Ipv4Addr::LOCALHOST, port).into(),
        }
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }
}
