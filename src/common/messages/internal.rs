use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "y")]
pub enum KadMessage {
    #[serde(rename = "q")]
    Request(KadRequestSpecific),

    #[serde(rename = "r")]
    Response(KadResponseSpecific),

    #[serde(rename = "b")]
    Broadcast(KadBroadcastSpecific),
}

impl KadMessage {
    pub fn from_bytes(bytes: &[u8]) -> Result<KadMessage, serde_bencode::Error> {
        let obj = serde_bencode::from_bytes(bytes)?;
        Ok(obj)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_bencode::Error> {
        serde_bencode::to_bytes(self)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "q")]
pub enum KadRequestSpecific {
    #[serde(rename = "find_node")]
    FindNode {
        #[serde(rename = "a")]
        arguments: KadFindNodeRequestArguments,
    },

    #[serde(rename = "find_value")]
    FindValue {
        #[serde(rename = "a")]
        arguments: KadFindValueRequestArguments,
    },

    #[serde(rename = "find_swarm")]
    FindSwarm {
        #[serde(rename = "a")]
        arguments: KadFindMembersRequestArguments,
    },

    #[serde(rename = "find_pool")]
    FindPool {
        #[serde(rename = "a")]
        arguments: KadFindMembersRequestArguments,
    },

    #[serde(rename = "store")]
    Store {
        #[serde(rename = "a")]
        arguments: KadStoreRequestArguments,
    },

    #[serde(rename = "join_swarm")]
    JoinSwarm {
        #[serde(rename = "a")]
        arguments: KadJoinRequestArguments,
    },

    #[serde(rename = "join_pool")]
    JoinPool {
        #[serde(rename = "a")]
        arguments: KadJoinRequestArguments,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "q")]
pub enum KadResponseSpecific {
    #[serde(rename = "find_node")]
    FindNode {
        #[serde(rename = "r")]
        arguments: KadFindNodeResponseArguments,
    },

    #[serde(rename = "find_value")]
    FindValue {
        #[serde(rename = "r")]
        arguments: KadFindValueResponseArguments,
    },

    #[serde(rename = "find_swarm")]
    FindSwarm {
        #[serde(rename = "r")]
        arguments: KadFindMembersResponseArguments,
    },

    #[serde(rename = "find_pool")]
    FindPool {
        #[serde(rename = "r")]
        arguments: KadFindMembersResponseArguments,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "q")]
pub enum KadBroadcastSpecific {
    #[serde(rename = "have")]
    Have {
        #[serde(rename = "a")]
        arguments: KadAnnounceArguments,
    },

    #[serde(rename = "want")]
    Want {
        #[serde(rename = "a")]
        arguments: KadAnnounceArguments,
    },

    #[serde(rename = "message")]
    Message {
        #[serde(rename = "a")]
        arguments: KadBroadcastMessageArguments,
    },
}

// === FIND_NODE ===

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KadFindNodeRequestArguments {
    #[serde(rename = "c")]
    pub context: u64,

    #[serde(with = "serde_bytes")]
    pub target: [u8; 20],

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtid: Option<ByteBuf>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KadFindNodeResponseArguments {
    #[serde(rename = "c")]
    pub context: u64,

    pub peers: Vec<ByteBuf>,
}

// === FIND_VALUE ===

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KadFindValueRequestArguments {
    #[serde(rename = "c")]
    pub context: u64,

    #[serde(with = "serde_bytes")]
    pub key: [u8; 20],
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KadFindValueResponseArguments {
    #[serde(rename = "c")]
    pub context: u64,

    pub peers: Vec<ByteBuf>,

    #[serde(default)]
    #[serde(rename = "v")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<ByteBuf>,
}

// === FIND_SWARM / FIND_POOL ===

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KadFindMembersRequestArguments {
    #[serde(rename = "c")]
    pub context: u64,

    #[serde(with = "serde_bytes")]
    pub id: [u8; 20],
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KadFindMembersResponseArguments {
    #[serde(rename = "c")]
    pub context: u64,

    pub peers: Vec<ByteBuf>,

    pub members: Vec<ByteBuf>,
}

// === STORE / JOIN ===

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KadStoreRequestArguments {
    #[serde(with = "serde_bytes")]
    pub key: [u8; 20],

    #[serde(rename = "v")]
    pub value: ByteBuf,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KadJoinRequestArguments {
    #[serde(with = "serde_bytes")]
    pub id: [u8; 20],
}

// === BROADCAST ===

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KadAnnounceArguments {
    #[serde(with = "serde_bytes")]
    pub rtid: [u8; 20],

    #[serde(with = "serde_bytes")]
    pub mid: [u8; 16],
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KadBroadcastMessageArguments {
    #[serde(with = "serde_bytes")]
    pub rtid: [u8; 20],

    #[serde(with = "serde_bytes")]
    pub mid: [u8; 16],

    pub origin: ByteBuf,

    pub hops: u8,

    pub payload: ByteBuf,
}
