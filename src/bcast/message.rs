use bytes::Bytes;

use crate::common::{BroadcastMessageArguments, Id, MessageId, Peer};

#[derive(Debug, Clone, PartialEq, Eq)]
/// A message broadcast over the routing table `rtid`.
pub struct Message {
    pub rtid: Id,
    pub id: MessageId,
    /// Peer that first broadcast the message.
    pub origin: Peer,
    /// Number of peers the message went through before reaching us.
    pub hop_count: u8,
    pub payload: Bytes,
}

impl Message {
    /// A new message originating from `origin`, with a random id.
    pub fn new(rtid: Id, origin: Peer, payload: Bytes) -> Self {
        Message {
            rtid,
            id: MessageId::random(),
            origin,
            hop_count: 0,
            payload,
        }
    }

    /// The message as it is forwarded to the next peer.
    pub fn forwarded(&self) -> Self {
        Message {
            hop_count: self.hop_count.saturating_add(1),
            ..self.clone()
        }
    }
}

impl From<BroadcastMessageArguments> for Message {
    fn from(arguments: BroadcastMessageArguments) -> Self {
        Message {
            rtid: arguments.rtid,
            id: arguments.message_id,
            origin: arguments.origin,
            hop_count: arguments.hop_count,
            payload: arguments.payload,
        }
    }
}

impl From<Message> for BroadcastMessageArguments {
    fn from(message: Message) -> Self {
        BroadcastMessageArguments {
            rtid: message.rtid,
            message_id: message.id,
            origin: message.origin,
            hop_count: message.hop_count,
            payload: message.payload,
        }
    }
}
