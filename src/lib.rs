#![doc = include_str!("../README.md")]

// Public modules
mod common;
mod config;
mod error;

pub mod bcast;
pub mod query;
pub mod routing;
pub mod server;

pub use crate::common::{
    messages, Distance, ExpiringMap, Id, MessageId, Peer, TopicRegistry, DEFAULT_RTID, ID_BITS,
    ID_SIZE, MESSAGE_ID_SIZE,
};
pub use bytes::Bytes;
pub use config::*;
pub use error::{Error, Result};
