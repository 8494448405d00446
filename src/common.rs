//! Miscellaneous common structs used throughout the library.

mod expiring;
mod id;
pub mod messages;
mod peer;
mod topics;

pub use expiring::*;
pub use id::*;
pub use messages::*;
pub use peer::*;
pub use topics::*;
