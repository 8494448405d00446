//! Main Crate Error

use crate::common::{Id, MessageId};

#[derive(thiserror::Error, Debug)]
/// Kadoverlay crate error enum.
pub enum Error {
    /// Id bytes of the wrong length.
    #[error("Invalid Id size, expected 20 bytes, got {0}")]
    InvalidIdSize(usize),

    /// Id string that is not 40 hex characters.
    #[error("Invalid Id encoding: {0}")]
    InvalidIdEncoding(String),

    #[error("Index {index} out of bounds for bucket of size {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Failed to parse packet bytes: {0}")]
    BencodeError(#[from] serde_bencode::Error),

    /// Compact peer entry that is neither an IPv4 nor an IPv6 entry.
    #[error("Wrong number of bytes for a compact peer: {0}")]
    InvalidPeerEncoding(usize),

    /// A lookup received a response from a peer that was never asked.
    #[error("Response for context {context} from {from} which is in state {state}")]
    UnexpectedResponse {
        context: u64,
        from: Id,
        state: &'static str,
    },

    #[error("Message {0} is already being tracked")]
    AlreadyTracking(MessageId),

    #[error("Message {0} is not being tracked")]
    NotTracking(MessageId),

    #[error("Message {0} already has a request in flight")]
    RequestInFlight(MessageId),

    #[error("Message {0} has no request in flight")]
    NoActiveRequest(MessageId),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
