use std::time::Duration;

/// Default bucket capacity and lookup result size.
pub const DEFAULT_K: usize = 20;
/// Default number of concurrent requests per lookup.
pub const DEFAULT_ALPHA: usize = 3;
/// Default bucket capacity of per-topic routing tables.
pub const DEFAULT_TOPIC_K: usize = 20;
/// Default time a lookup waits for a single peer to respond.
pub const DEFAULT_QUERY_REQUEST_TIMEOUT: Duration = Duration::from_secs(3);
/// Default time a completed lookup result is replayed to identical lookups.
pub const DEFAULT_QUERY_CACHE_TTL: Duration = Duration::from_secs(30);
/// Default time a content request waits for its provider.
pub const DEFAULT_CONTENT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Default time a broadcast message is kept.
pub const DEFAULT_MESSAGE_TTL: Duration = Duration::from_secs(10 * 60);
/// Default time a peer is remembered as having a broadcast message.
pub const DEFAULT_HAVE_TTL: Duration = Duration::from_secs(10 * 60);
/// Default time a swarm or pool member is remembered after joining.
pub const DEFAULT_SWARM_TTL: Duration = Duration::from_secs(10 * 60);
/// Default maximum number of stored values.
pub const DEFAULT_MAX_VALUES: usize = 1000;

#[derive(Debug, Clone)]
/// Overlay configurations
pub struct Config {
    /// Capacity of the buckets of the main routing table, and the number of
    /// closest peers a lookup converges on.
    ///
    /// Defaults to [DEFAULT_K]
    pub k: usize,
    /// Maximum number of requests a single lookup keeps in flight.
    ///
    /// Defaults to [DEFAULT_ALPHA]
    pub alpha: usize,
    /// Capacity of the buckets of swarm, pool and topic routing tables.
    ///
    /// Defaults to [DEFAULT_TOPIC_K]
    pub topic_k: usize,
    /// How long a lookup waits for a peer before considering it failed.
    ///
    /// The shorter this duration is, the more responses from busy peers we miss out on.
    ///
    /// Defaults to [DEFAULT_QUERY_REQUEST_TIMEOUT]
    pub query_request_timeout: Duration,
    /// How long the result of a lookup is replayed to identical lookups
    /// by the [crate::query::CachingQueryManager].
    ///
    /// Defaults to [DEFAULT_QUERY_CACHE_TTL]
    pub query_cache_ttl: Duration,
    /// How long a content request may stay in flight in the [crate::bcast::RequestTracker].
    ///
    /// Defaults to [DEFAULT_CONTENT_REQUEST_TIMEOUT]
    pub content_request_timeout: Duration,
    /// Defaults to [DEFAULT_MESSAGE_TTL]
    pub message_ttl: Duration,
    /// Defaults to [DEFAULT_HAVE_TTL]
    pub have_ttl: Duration,
    /// Defaults to [DEFAULT_SWARM_TTL]
    pub swarm_ttl: Duration,
    /// Maximum number of values the [crate::server::DefaultServer] stores.
    ///
    /// Defaults to [DEFAULT_MAX_VALUES]
    pub max_values: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            alpha: DEFAULT_ALPHA,
            topic_k: DEFAULT_TOPIC_K,
            query_request_timeout: DEFAULT_QUERY_REQUEST_TIMEOUT,
            query_cache_ttl: DEFAULT_QUERY_CACHE_TTL,
            content_request_timeout: DEFAULT_CONTENT_REQUEST_TIMEOUT,
            message_ttl: DEFAULT_MESSAGE_TTL,
            have_ttl: DEFAULT_HAVE_TTL,
            swarm_ttl: DEFAULT_SWARM_TTL,
            max_values: DEFAULT_MAX_VALUES,
        }
    }
}
