//! Trackers used to route content and propagate broadcast messages.
//!
//! None of them perform I/O. The owner feeds them events and calls their
//! `check_timeouts`/`clean` methods periodically.

mod have_tracker;
mod message;
mod message_cache;
mod request_tracker;

pub use have_tracker::HaveTracker;
pub use message::Message;
pub use message_cache::MessageCache;
pub use request_tracker::{ExpiredRequest, RequestTracker};
