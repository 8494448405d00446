//! Iterative lookups over the overlay.
//!
//! A [QueryManager] runs many concurrent lookups. Lookups do not perform any I/O, they
//! emit [QueryRequest]s that the owner of the manager drains with
//! [QueryManager::pop_request], sends, and feeds the responses back through the
//! `on_*_response` methods. Timeouts are detected by calling
//! [QueryManager::check_timeouts] periodically.

mod cached;
mod descriptor;
mod manager;
mod peer_set;
#[allow(clippy::module_inception)]
mod query;
mod responder;

pub use cached::CachingQueryManager;
pub use descriptor::*;
pub use manager::{BasicQueryManager, QueryManager};
pub use peer_set::{PeerState, QPeerSet};
pub use query::{Query, QueryRequest};
pub use responder::Responder;
