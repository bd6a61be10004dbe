//! Cache Entry Module
//!
//! Defines the per-key bookkeeping record, the payload capability and timestamp helpers.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::cache::recency::RecencyHandle;
use crate::cache::size_index::SizeHandle;

// == Cleanable ==
/// Capability every cached payload must provide.
///
/// `cleanup` is invoked at most once per eviction of a still-alive payload,
/// always outside the cache lock. Implementations that mutate state need
/// interior mutability since payloads are shared through `Arc`.
pub trait Cleanable {
    fn cleanup(&self);
}

// == Cache Entry ==
/// Bookkeeping for a single key.
///
/// The payload is observed through a `Weak`, so the cache never extends its lifetime.
#[derive(Debug)]
pub struct CacheEntry<P> {
    /// Size in bytes as reported by the caller
    pub size: u64,
    /// Last access timestamp (Unix milliseconds)
    pub last_access_ms: u64,
    /// Non-owning reference to the payload
    pub payload: Weak<P>,
    /// Position in the recency index
    pub(crate) recency: RecencyHandle,
    /// Position in the size index
    pub(crate) size_slot: SizeHandle,
}

impl<P> CacheEntry<P> {
    // == Constructor ==
    /// Creates an entry stamped with the current time.
    pub(crate) fn new(
        payload: Weak<P>,
        size: u64,
        recency: RecencyHandle,
        size_slot: SizeHandle,
    ) -> Self {
        Self {
            size,
            last_access_ms: current_timestamp_ms(),
            payload,
            recency,
            size_slot,
        }
    }

    // == Touch ==
    /// Refreshes the last access timestamp.
    pub fn touch(&mut self) {
        self.last_access_ms = current_timestamp_ms();
    }

    // == Is Stale ==
    /// Checks whether the entry has been idle for strictly longer than `threshold_ms`.
    pub fn is_stale(&self, now_ms: u64, threshold_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_access_ms) > threshold_ms
    }

    /// Resolves the payload if its owner still holds it.
    pub fn upgrade(&self) -> Option<Arc<P>> {
        self.payload.upgrade()
    }
}

// == Entry Snapshot ==
/// One row of the diagnostic dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntrySnapshot<K> {
    pub key: K,
    pub size: u64,
    pub last_access_ms: u64,
}

impl<K: fmt::Debug> fmt::Display for EntrySnapshot<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Key: {:?}, Size: {}, Last Access Time: {}",
            self.key,
            self.size,
            format_timestamp_ms(self.last_access_ms)
        )
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Formats a Unix millisecond timestamp as local `YYYY-MM-DD HH:MM:SS`.
pub fn format_timestamp_ms(ms: u64) -> String {
    match DateTime::from_timestamp_millis(ms as i64) {
        Some(utc) => utc.with_timezone(&Local).format("%F %T").to_string(),
        None => ms.to_string(),
    }
}
