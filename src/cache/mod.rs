//! Cache Module
//!
//! Provides a size-aware cache with hybrid LRU / largest-first eviction.

mod entry;
mod lru_cache;
mod recency;
mod size_index;
mod stats;
mod store;


// Re-export public types
pub use entry::{current_timestamp_ms, format_timestamp_ms, CacheEntry, Cleanable, EntrySnapshot};
pub use lru_cache::{LruCache, SharedStore};
pub use recency::{RecencyHandle, RecencyList};
pub use size_index::{SizeHandle, SizeIndex};
pub use stats::CacheStats;
pub use store::{CacheStore, EvictionBatch};

pub(crate) use lru_cache::run_cleanup;
