pub mod fallback;
pub mod read_through;
pub mod store;

pub use read_through::{AggregateError, AggregateResponse, Provenance, ReadThroughCache, SubResource};
pub use store::{CacheBackend, CacheConfig, CacheEntry, CacheError, CacheStore};
