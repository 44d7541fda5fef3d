// Query cache module.
// Keeps fetched pages and records in memory, keyed by request descriptor.

pub mod query;
pub mod store;

pub use query::{CacheStats, DEFAULT_MAX_PAGES, Fetcher, QueryCache, ReferenceState, RetryPolicy};
pub use store::{
    CacheEntry, DEFAULT_ERROR_RETRY, DEFAULT_PAGE_TTL, Descriptor, FreshnessPolicy, QueryState,
    QueryStatus, Resource,
};
