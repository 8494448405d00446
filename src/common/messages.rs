//! Serialize and deserialize overlay wire messages.

mod internal;

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use bytes::Bytes;
use serde_bytes::ByteBuf;

use crate::common::{Id, MessageId, Peer, ID_SIZE};
use crate::{Error, Result};

#[derive(Debug, PartialEq, Clone)]
pub enum Message {
    Request(RequestSpecific),

    Response(ResponseSpecific),

    Broadcast(BroadcastSpecific),
}

#[derive(Debug, PartialEq, Clone)]
pub enum RequestSpecific {
    FindNode(FindNodeRequestArguments),
    FindValue(FindValueRequestArguments),
    FindSwarm(FindMembersRequestArguments),
    FindPool(FindMembersRequestArguments),

    Store(StoreRequestArguments),
    JoinSwarm(JoinRequestArguments),
    JoinPool(JoinRequestArguments),
}

#[derive(Debug, PartialEq, Clone)]
pub enum ResponseSpecific {
    FindNode(FindNodeResponseArguments),
    FindValue(FindValueResponseArguments),
    FindSwarm(FindMembersResponseArguments),
    FindPool(FindMembersResponseArguments),
}

#[derive(Debug, PartialEq, Clone)]
pub enum BroadcastSpecific {
    /// Announce that we hold a message.
    Have(AnnounceArguments),
    /// Ask a peer that announced a message to send it.
    Want(AnnounceArguments),
    Message(BroadcastMessageArguments),
}

// === FIND_NODE ===

#[derive(Debug, PartialEq, Clone)]
pub struct FindNodeRequestArguments {
    pub context: u64,
    pub target: Id,
    /// Routing table to search, the main table if `None`.
    pub rtid: Option<Id>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct FindNodeResponseArguments {
    pub context: u64,
    pub peers: Vec<Peer>,
}

// === FIND_VALUE ===

#[derive(Debug, PartialEq, Clone)]
pub struct FindValueRequestArguments {
    pub context: u64,
    pub key: Id,
}

#[derive(Debug, PartialEq, Clone)]
pub struct FindValueResponseArguments {
    pub context: u64,
    pub peers: Vec<Peer>,
    pub value: Option<Bytes>,
}

// === FIND_SWARM / FIND_POOL ===

#[derive(Debug, PartialEq, Clone)]
pub struct FindMembersRequestArguments {
    pub context: u64,
    /// Swarm or pool id.
    pub id: Id,
}

#[derive(Debug, PartialEq, Clone)]
pub struct FindMembersResponseArguments {
    pub context: u64,
    /// Peers closest to the swarm or pool id.
    pub peers: Vec<Peer>,
    /// Known members of the swarm or pool.
    pub members: Vec<Peer>,
}

// === STORE / JOIN ===

#[derive(Debug, PartialEq, Clone)]
pub struct StoreRequestArguments {
    pub key: Id,
    pub value: Bytes,
}

#[derive(Debug, PartialEq, Clone)]
pub struct JoinRequestArguments {
    pub id: Id,
}

// === BROADCAST ===

#[derive(Debug, PartialEq, Clone)]
pub struct AnnounceArguments {
    pub rtid: Id,
    pub message_id: MessageId,
}

#[derive(Debug, PartialEq, Clone)]
pub struct BroadcastMessageArguments {
    pub rtid: Id,
    pub message_id: MessageId,
    pub origin: Peer,
    pub hop_count: u8,
    pub payload: Bytes,
}

impl ResponseSpecific {
    /// The lookup context this response belongs to.
    pub fn context(&self) -> u64 {
        match self {
            ResponseSpecific::FindNode(arguments) => arguments.context,
            ResponseSpecific::FindValue(arguments) => arguments.context,
            ResponseSpecific::FindSwarm(arguments) => arguments.context,
            ResponseSpecific::FindPool(arguments) => arguments.context,
        }
    }

    /// Peers closer to the lookup target.
    pub fn closer_peers(&self) -> &[Peer] {
        match self {
            ResponseSpecific::FindNode(arguments) => &arguments.peers,
            ResponseSpecific::FindValue(arguments) => &arguments.peers,
            ResponseSpecific::FindSwarm(arguments) => &arguments.peers,
            ResponseSpecific::FindPool(arguments) => &arguments.peers,
        }
    }
}

impl Message {
    fn into_serde_message(self) -> internal::KadMessage {
        match self {
            Message::Request(request) => internal::KadMessage::Request(match request {
                RequestSpecific::FindNode(args) => internal::KadRequestSpecific::FindNode {
                    arguments: internal::KadFindNodeRequestArguments {
                        context: args.context,
                        target: *args.target.as_bytes(),
                        rtid: args.rtid.map(|rtid| ByteBuf::from(rtid.to_vec())),
                    },
                },
                RequestSpecific::FindValue(args) => internal::KadRequestSpecific::FindValue {
                    arguments: internal::KadFindValueRequestArguments {
                        context: args.context,
                        key: *args.key.as_bytes(),
                    },
                },
                RequestSpecific::FindSwarm(args) => internal::KadRequestSpecific::FindSwarm {
                    arguments: internal::KadFindMembersRequestArguments {
                        context: args.context,
                        id: *args.id.as_bytes(),
                    },
                },
                RequestSpecific::FindPool(args) => internal::KadRequestSpecific::FindPool {
                    arguments: internal::KadFindMembersRequestArguments {
                        context: args.context,
                        id: *args.id.as_bytes(),
                    },
                },
                RequestSpecific::Store(args) => internal::KadRequestSpecific::Store {
                    arguments: internal::KadStoreRequestArguments {
                        key: *args.key.as_bytes(),
                        value: ByteBuf::from(args.value.to_vec()),
                    },
                },
                RequestSpecific::JoinSwarm(args) => internal::KadRequestSpecific::JoinSwarm {
                    arguments: internal::KadJoinRequestArguments {
                        id: *args.id.as_bytes(),
                    },
                },
                RequestSpecific::JoinPool(args) => internal::KadRequestSpecific::JoinPool {
                    arguments: internal::KadJoinRequestArguments {
                        id: *args.id.as_bytes(),
                    },
                },
            }),

            Message::Response(response) => internal::KadMessage::Response(match response {
                ResponseSpecific::FindNode(args) => internal::KadResponseSpecific::FindNode {
                    arguments: internal::KadFindNodeResponseArguments {
                        context: args.context,
                        peers: peers_to_bytes(&args.peers),
                    },
                },
                ResponseSpecific::FindValue(args) => internal::KadResponseSpecific::FindValue {
                    arguments: internal::KadFindValueResponseArguments {
                        context: args.context,
                        peers: peers_to_bytes(&args.peers),
                        value: args.value.map(|v| ByteBuf::from(v.to_vec())),
                    },
                },
                ResponseSpecific::FindSwarm(args) => internal::KadResponseSpecific::FindSwarm {
                    arguments: members_to_serde(args),
                },
                ResponseSpecific::FindPool(args) => internal::KadResponseSpecific::FindPool {
                    arguments: members_to_serde(args),
                },
            }),

            Message::Broadcast(broadcast) => internal::KadMessage::Broadcast(match broadcast {
                BroadcastSpecific::Have(args) => internal::KadBroadcastSpecific::Have {
                    arguments: internal::KadAnnounceArguments {
                        rtid: *args.rtid.as_bytes(),
                        mid: args.message_id.0,
                    },
                },
                BroadcastSpecific::Want(args) => internal::KadBroadcastSpecific::Want {
                    arguments: internal::KadAnnounceArguments {
                        rtid: *args.rtid.as_bytes(),
                        mid: args.message_id.0,
                    },
                },
                BroadcastSpecific::Message(args) => internal::KadBroadcastSpecific::Message {
                    arguments: internal::KadBroadcastMessageArguments {
                        rtid: *args.rtid.as_bytes(),
                        mid: args.message_id.0,
                        origin: ByteBuf::from(peer_to_bytes(&args.origin)),
                        hops: args.hop_count,
                        payload: ByteBuf::from(args.payload.to_vec()),
                    },
                },
            }),
        }
    }

    fn from_serde_message(msg: internal::KadMessage) -> Result<Message> {
        Ok(match msg {
            internal::KadMessage::Request(request) => Message::Request(match request {
                internal::KadRequestSpecific::FindNode { arguments } => {
                    RequestSpecific::FindNode(FindNodeRequestArguments {
                        context: arguments.context,
                        target: Id::from(arguments.target),
                        rtid: match arguments.rtid {
                            Some(rtid) => Some(Id::from_bytes(rtid)?),
                            None => None,
                        },
                    })
                }
                internal::KadRequestSpecific::FindValue { arguments } => {
                    RequestSpecific::FindValue(FindValueRequestArguments {
                        context: arguments.context,
                        key: Id::from(arguments.key),
                    })
                }
                internal::KadRequestSpecific::FindSwarm { arguments } => {
                    RequestSpecific::FindSwarm(FindMembersRequestArguments {
                        context: arguments.context,
                        id: Id::from(arguments.id),
                    })
                }
                internal::KadRequestSpecific::FindPool { arguments } => {
                    RequestSpecific::FindPool(FindMembersRequestArguments {
                        context: arguments.context,
                        id: Id::from(arguments.id),
                    })
                }
                internal::KadRequestSpecific::Store { arguments } => {
                    RequestSpecific::Store(StoreRequestArguments {
                        key: Id::from(arguments.key),
                        value: Bytes::from(arguments.value.into_vec()),
                    })
                }
                internal::KadRequestSpecific::JoinSwarm { arguments } => {
                    RequestSpecific::JoinSwarm(JoinRequestArguments {
                        id: Id::from(arguments.id),
                    })
                }
                internal::KadRequestSpecific::JoinPool { arguments } => {
                    RequestSpecific::JoinPool(JoinRequestArguments {
                        id: Id::from(arguments.id),
                    })
                }
            }),

            internal::KadMessage::Response(response) => Message::Response(match response {
                internal::KadResponseSpecific::FindNode { arguments } => {
                    ResponseSpecific::FindNode(FindNodeResponseArguments {
                        context: arguments.context,
                        peers: bytes_to_peers(&arguments.peers)?,
                    })
                }
                internal::KadResponseSpecific::FindValue { arguments } => {
                    ResponseSpecific::FindValue(FindValueResponseArguments {
                        context: arguments.context,
                        peers: bytes_to_peers(&arguments.peers)?,
                        value: arguments.value.map(|v| Bytes::from(v.into_vec())),
                    })
                }
                internal::KadResponseSpecific::FindSwarm { arguments } => {
                    ResponseSpecific::FindSwarm(members_from_serde(arguments)?)
                }
                internal::KadResponseSpecific::FindPool { arguments } => {
                    ResponseSpecific::FindPool(members_from_serde(arguments)?)
                }
            }),

            internal::KadMessage::Broadcast(broadcast) => Message::Broadcast(match broadcast {
                internal::KadBroadcastSpecific::Have { arguments } => {
                    BroadcastSpecific::Have(AnnounceArguments {
                        rtid: Id::from(arguments.rtid),
                        message_id: MessageId(arguments.mid),
                    })
                }
                internal::KadBroadcastSpecific::Want { arguments } => {
                    BroadcastSpecific::Want(AnnounceArguments {
                        rtid: Id::from(arguments.rtid),
                        message_id: MessageId(arguments.mid),
                    })
                }
                internal::KadBroadcastSpecific::Message { arguments } => {
                    BroadcastSpecific::Message(BroadcastMessageArguments {
                        rtid: Id::from(arguments.rtid),
                        message_id: MessageId(arguments.mid),
                        origin: bytes_to_peer(&arguments.origin)?,
                        hop_count: arguments.hops,
                        payload: Bytes::from(arguments.payload.into_vec()),
                    })
                }
            }),
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.clone().into_serde_message().to_bytes()?)
    }

    pub fn from_bytes<T: AsRef<[u8]>>(bytes: T) -> Result<Message> {
        Message::from_serde_message(internal::KadMessage::from_bytes(bytes.as_ref())?)
    }
}

fn members_to_serde(args: FindMembersResponseArguments) -> internal::KadFindMembersResponseArguments {
    internal::KadFindMembersResponseArguments {
        context: args.context,
        peers: peers_to_bytes(&args.peers),
        members: peers_to_bytes(&args.members),
    }
}

fn members_from_serde(
    arguments: internal::KadFindMembersResponseArguments,
) -> Result<FindMembersResponseArguments> {
    Ok(FindMembersResponseArguments {
        context: arguments.context,
        peers: bytes_to_peers(&arguments.peers)?,
        members: bytes_to_peers(&arguments.members)?,
    })
}

fn bytes_to_sockaddr<T: AsRef<[u8]>>(bytes: T) -> Result<SocketAddr> {
    let bytes = bytes.as_ref();
    match bytes.len() {
        6 => {
            let ip = Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]);
            let port = u16::from_be_bytes([bytes[4], bytes[5]]);

            Ok(SocketAddr::new(IpAddr::V4(ip), port))
        }

        18 => {
            let octets: [u8; 16] = bytes[0..16]
                .try_into()
                .map_err(|_| Error::InvalidPeerEncoding(ID_SIZE + bytes.len()))?;
            let port = u16::from_be_bytes([bytes[16], bytes[17]]);

            Ok(SocketAddr::new(IpAddr::V6(Ipv6Addr::from(octets)), port))
        }

        _ => Err(Error::InvalidPeerEncoding(ID_SIZE + bytes.len())),
    }
}

pub fn sockaddr_to_bytes(sockaddr: &SocketAddr) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(18);

    match sockaddr {
        SocketAddr::V4(v4) => bytes.extend(v4.ip().octets()),
        SocketAddr::V6(v6) => bytes.extend(v6.ip().octets()),
    }

    bytes.extend(sockaddr.port().to_be_bytes());

    bytes
}

/// Compact peer entry, the Id followed by the compact address (26 bytes for IPv4, 38 for IPv6).
pub fn peer_to_bytes(peer: &Peer) -> Vec<u8> {
    let mut bytes = peer.id.to_vec();
    bytes.append(&mut sockaddr_to_bytes(&peer.address));
    bytes
}

pub fn bytes_to_peer<T: AsRef<[u8]>>(bytes: T) -> Result<Peer> {
    let bytes = bytes.as_ref();

    if bytes.len() < ID_SIZE {
        return Err(Error::InvalidPeerEncoding(bytes.len()));
    }

    let id = Id::from_bytes(&bytes[..ID_SIZE])?;
    let address = bytes_to_sockaddr(&bytes[ID_SIZE..])?;

    Ok(Peer::new(id, address))
}

fn peers_to_bytes(peers: &[Peer]) -> Vec<ByteBuf> {
    peers
        .iter()
        .map(|p| ByteBuf::from(peer_to_bytes(p)))
        .collect()
}

fn bytes_to_peers(bytes: &[ByteBuf]) -> Result<Vec<Peer>> {
    bytes.iter().map(bytes_to_peer).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_node_request() {
        let original_msg = Message::Request(RequestSpecific::FindNode(FindNodeRequestArguments {
            context: 42,
            target: Id::random(),
            rtid: Some(Id::random()),
        }));

        let bytes = original_msg.to_bytes().unwrap();
        let parsed_msg = Message::from_bytes(bytes).unwrap();
        assert_eq!(parsed_msg, original_msg);
    }

    #[test]
    fn test_find_node_request_main_table() {
        let original_msg = Message::Request(RequestSpecific::FindNode(FindNodeRequestArguments {
            context: 0,
            target: Id::random(),
            rtid: None,
        }));

        let bytes = original_msg.to_bytes().unwrap();
        let parsed_msg = Message::from_bytes(bytes).unwrap();
        assert_eq!(parsed_msg, original_msg);
    }

    #[test]
    fn test_find_value_response_mixed_address_families() {
        let original_msg =
            Message::Response(ResponseSpecific::FindValue(FindValueResponseArguments {
                context: 7,
                peers: vec![
                    Peer::new(Id::random(), "49.50.52.52:5354".parse().unwrap()),
                    Peer::new(Id::random(), "[2001:db8::1]:6881".parse().unwrap()),
                ],
                value: Some(Bytes::from_static(b"Hello World!")),
            }));

        let bytes = original_msg.to_bytes().unwrap();
        let parsed_msg = Message::from_bytes(bytes).unwrap();
        assert_eq!(parsed_msg, original_msg);
    }

    #[test]
    fn test_find_swarm_response() {
        let original_msg =
            Message::Response(ResponseSpecific::FindSwarm(FindMembersResponseArguments {
                context: 3,
                peers: vec![Peer::new(Id::random(), "1.2.3.4:5".parse().unwrap())],
                members: vec![Peer::new(Id::random(), "5.6.7.8:9".parse().unwrap())],
            }));

        let bytes = original_msg.to_bytes().unwrap();
        let parsed_msg = Message::from_bytes(bytes).unwrap();

        assert_eq!(parsed_msg, original_msg);

        if let Message::Response(response) = parsed_msg {
            assert_eq!(response.context(), 3);
            assert_eq!(response.closer_peers().len(), 1);
        }
    }

    #[test]
    fn test_broadcast_message() {
        let original_msg = Message::Broadcast(BroadcastSpecific::Message(BroadcastMessageArguments {
            rtid: Id::random(),
            message_id: MessageId::random(),
            origin: Peer::new(Id::random(), "10.0.0.1:4000".parse().unwrap()),
            hop_count: 3,
            payload: Bytes::from_static(b"payload"),
        }));

        let bytes = original_msg.to_bytes().unwrap();
        let parsed_msg = Message::from_bytes(bytes).unwrap();
        assert_eq!(parsed_msg, original_msg);
    }

    #[test]
    fn invalid_compact_peer() {
        assert!(matches!(
            bytes_to_peer([0_u8; 25]),
            Err(Error::InvalidPeerEncoding(25))
        ));
        assert!(matches!(
            bytes_to_peer([0_u8; 10]),
            Err(Error::InvalidPeerEncoding(10))
        ));
        assert_eq!(bytes_to_peer([0_u8; 26]).unwrap().address.port(), 0);
        assert!(bytes_to_peer([0_u8; 38]).unwrap().address.is_ipv6());
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(Message::from_bytes(b"not bencode").is_err());
    }
}
