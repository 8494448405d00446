//! Kademlia routing tables with dynamically splitting buckets.

mod bucket;
mod table;
mod tables;

pub use bucket::*;
pub use table::*;
pub use tables::*;
