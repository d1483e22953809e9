//! Response caching and cache-aware mutations.
//!
//! Every read is addressed by a [`QueryKey`]. The [`QueryCache`] de-duplicates
//! concurrent reads of a key, keeps values fresh for a configurable window and
//! publishes [`CacheEvent`]s that views use to refetch after invalidation.

mod cache;
mod key;
mod queries;

pub use cache::{CacheConfig, CacheEvent, QueryCache, QueryError, QueryResult, RetryPolicy};
pub use key::QueryKey;
pub use queries::{ErrorHook, Queries};
