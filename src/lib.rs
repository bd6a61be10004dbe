//! Size LRU - A bounded, size-aware cache
//!
//! Evicts by recency, switching to largest-first when the least recently used
//! entry has gone stale. Payloads are observed, never owned.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{Cleanable, LruCache};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use tasks::spawn_sweeper_task;
