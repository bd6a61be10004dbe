//! Cache Store Module
//!
//! Single-threaded cache engine combining key, recency and size indices with
//! size accounting and the hybrid LRU / largest-first eviction policy.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tracing::debug;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::{CacheEntry, CacheStats, EntrySnapshot, RecencyList, SizeIndex};

// == Eviction Batch ==
/// Outcome of one eviction pass.
///
/// Payloads are handed back instead of being cleaned in place so the caller
/// can run their callbacks after releasing any lock around the store.
#[derive(Debug)]
pub struct EvictionBatch<P> {
    /// Number of entries removed from the indices
    pub evicted: usize,
    /// Bytes subtracted from the total size, saturating at `u64::MAX`
    pub reclaimed: u64,
    /// Still-alive payloads awaiting their cleanup callback
    pub pending: Vec<Arc<P>>,
}

impl<P> Default for EvictionBatch<P> {
    fn default() -> Self {
        Self {
            evicted: 0,
            reclaimed: 0,
            pending: Vec::new(),
        }
    }
}

// == Cache Store ==
/// Size-aware cache storage.
///
/// Every live key is present in `entries`, `recency` and `sizes`, and
/// `total_size` is the sum of the live entry sizes. It is tracked in `u128`
/// so that any number of `u64`-sized entries can be summed without wrapping.
#[derive(Debug)]
pub struct CacheStore<K, P> {
    /// Key index
    entries: HashMap<K, CacheEntry<P>>,
    /// Access order, least recently used first
    recency: RecencyList<K>,
    /// Entry sizes, largest last
    sizes: SizeIndex<K>,
    /// Sum of entry sizes in bytes
    total_size: u128,
    soft_limit: u64,
    hard_limit: u64,
    time_threshold: Duration,
    stats: CacheStats,
}

impl<K, P> CacheStore<K, P>
where
    K: Eq + Hash + Clone + Debug,
{
    // == Constructor ==
    /// Creates an empty store.
    ///
    /// # Arguments
    /// * `soft_limit` - Eviction target in bytes
    /// * `hard_limit` - Total size whose breach calls for immediate eviction
    /// * `time_threshold` - Idle time after which the LRU front is stale
    pub fn new(soft_limit: u64, hard_limit: u64, time_threshold: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            recency: RecencyList::new(),
            sizes: SizeIndex::new(),
            total_size: 0,
            soft_limit,
            hard_limit,
            time_threshold,
            stats: CacheStats::new(),
        }
    }

    // == Update ==
    /// Inserts or refreshes `key`.
    ///
    /// An existing entry keeps its identity but gets the new size, payload and
    /// timestamp, and moves to the most recently used position. Never rejects.
    pub fn update(&mut self, key: K, payload: Weak<P>, size: u64) {
        match self.entries.get_mut(&key) {
            Some(entry) => {
                self.total_size -= u128::from(entry.size);
                self.sizes.remove(entry.size_slot);
                self.recency.move_to_back(entry.recency);

                entry.size = size;
                entry.payload = payload;
                entry.size_slot = self.sizes.insert(size, key.clone());
                entry.touch();
            }
            None => {
                let recency = self.recency.push_back(key.clone());
                let size_slot = self.sizes.insert(size, key.clone());
                let entry = CacheEntry::new(payload, size, recency, size_slot);
                self.entries.insert(key.clone(), entry);
            }
        }
        self.total_size += u128::from(size);

        debug!(op = "update", key = ?key, size, total_size = self.total_size(), "updated entry");
    }

    // == Get ==
    /// Looks up `key`, marking it most recently used.
    ///
    /// Returns None when the key is absent or its payload was already released
    /// by its owner. In the latter case the entry stays in place.
    pub fn get(&mut self, key: &K) -> Option<Arc<P>> {
        let Some(entry) = self.entries.get_mut(key) else {
            self.stats.record_miss();
            return None;
        };

        entry.touch();
        self.recency.move_to_back(entry.recency);

        let payload = entry.upgrade();
        match payload {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        payload
    }

    // == Evict To Soft Limit ==
    /// Removes entries until the total size is at or below the soft limit.
    ///
    /// Each round looks at the least recently used entry. If it is stale the
    /// largest entry is evicted instead of it, otherwise the front itself goes.
    /// An evicted `protected` key is still removed and its size subtracted, but
    /// its payload is not returned for cleanup.
    pub fn evict_to_soft_limit(&mut self, protected: Option<&K>) -> EvictionBatch<P> {
        let mut batch = EvictionBatch::default();
        let now = current_timestamp_ms();
        let threshold_ms = u64::try_from(self.time_threshold.as_millis()).unwrap_or(u64::MAX);

        while self.total_size > u128::from(self.soft_limit) {
            let Some(front) = self.recency.front() else {
                break;
            };

            let stale = self
                .entries
                .get(front)
                .is_some_and(|entry| entry.is_stale(now, threshold_ms));

            let victim = if stale {
                match self.sizes.largest() {
                    Some((_, largest)) => largest.clone(),
                    None => front.clone(),
                }
            } else {
                front.clone()
            };

            let Some(entry) = self.remove_entry(&victim) else {
                // Indices disagree with the key index; stop rather than spin.
                break;
            };

            self.total_size -= u128::from(entry.size);
            batch.evicted += 1;
            batch.reclaimed = batch.reclaimed.saturating_add(entry.size);
            self.stats.record_eviction(stale);

            let is_protected = protected.is_some_and(|p| *p == victim);
            if !is_protected {
                if let Some(payload) = entry.upgrade() {
                    batch.pending.push(payload);
                }
            }

            debug!(
                op = "evict",
                key = ?victim,
                size = entry.size,
                stale,
                protected = is_protected,
                total_size = self.total_size(),
                "evicted entry"
            );
        }

        batch
    }

    /// Removes `key` from all three indices.
    fn remove_entry(&mut self, key: &K) -> Option<CacheEntry<P>> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(entry.recency);
        self.sizes.remove(entry.size_slot);
        Some(entry)
    }

    // == Snapshot ==
    /// Returns (key, size, last access) for every entry, least recently used first.
    pub fn snapshot(&self) -> Vec<EntrySnapshot<K>> {
        self.recency
            .iter()
            .filter_map(|key| {
                self.entries.get(key).map(|entry| EntrySnapshot {
                    key: key.clone(),
                    size: entry.size,
                    last_access_ms: entry.last_access_ms,
                })
            })
            .collect()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_occupancy(self.entries.len(), self.total_size());
        stats
    }

    /// Checks whether the total size is above the hard limit.
    pub fn exceeds_hard_limit(&self) -> bool {
        self.total_size > u128::from(self.hard_limit)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Sum of entry sizes, saturating at `u64::MAX`.
    pub fn total_size(&self) -> u64 {
        u64::try_from(self.total_size).unwrap_or(u64::MAX)
    }

    pub fn soft_limit(&self) -> u64 {
        self.soft_limit
    }

    pub fn hard_limit(&self) -> u64 {
        self.hard_limit
    }

    pub fn time_threshold(&self) -> Duration {
        self.time_threshold
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Panics if the three indices or the size total disagree.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        use std::collections::HashSet;

        let by_key: HashSet<&K> = self.entries.keys().collect();
        let by_recency: HashSet<&K> = self.recency.iter().collect();
        let by_size: HashSet<&K> = self.sizes.iter_desc().map(|(_, k)| k).collect();

        assert_eq!(self.recency.len(), self.entries.len(), "recency cardinality");
        assert_eq!(self.sizes.len(), self.entries.len(), "size cardinality");
        assert_eq!(by_key, by_recency, "recency keys");
        assert_eq!(by_key, by_size, "size keys");

        let sum: u128 = self.entries.values().map(|e| u128::from(e.size)).sum();
        assert_eq!(self.total_size, sum, "total size");
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    struct Blob;

    fn store(soft: u64, hard: u64, threshold: Duration) -> CacheStore<&'static str, Blob> {
        CacheStore::new(soft, hard, threshold)
    }

    fn keys(store: &CacheStore<&'static str, Blob>) -> Vec<&'static str> {
        store.snapshot().into_iter().map(|s| s.key).collect()
    }

    #[test]
    fn test_store_new() {
        let store = store(60, 100, Duration::from_secs(5));
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.total_size(), 0);
        assert_eq!(store.soft_limit(), 60);
        assert_eq!(store.hard_limit(), 100);
        assert_eq!(store.time_threshold(), Duration::from_secs(5));
    }

    #[test]
    fn test_store_update_and_get() {
        let mut store = store(60, 100, Duration::from_secs(5));
        let payload = Arc::new(Blob);

        store.update("a", Arc::downgrade(&payload), 20);
        let fetched = store.get(&"a").unwrap();

        assert!(Arc::ptr_eq(&fetched, &payload));
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_size(), 20);
        store.assert_consistent();
    }

    #[test]
    fn test_store_get_nonexistent() {
        let mut store = store(60, 100, Duration::from_secs(5));
        assert!(store.get(&"missing").is_none());
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_store_get_released_payload_keeps_entry() {
        let mut store = store(60, 100, Duration::from_secs(5));
        let payload = Arc::new(Blob);
        store.update("a", Arc::downgrade(&payload), 20);
        drop(payload);

        assert!(store.get(&"a").is_none());
        assert!(store.contains(&"a"));
        assert_eq!(store.total_size(), 20);
    }

    #[test]
    fn test_store_overwrite() {
        let mut store = store(60, 100, Duration::from_secs(5));
        let first = Arc::new(Blob);
        let second = Arc::new(Blob);

        store.update("a", Arc::downgrade(&first), 20);
        store.update("b", Arc::downgrade(&first), 5);
        store.update("a", Arc::downgrade(&second), 35);

        assert_eq!(store.len(), 2);
        assert_eq!(store.total_size(), 40);
        assert_eq!(keys(&store), vec!["b", "a"]);
        assert!(Arc::ptr_eq(&store.get(&"a").unwrap(), &second));
        store.assert_consistent();
    }

    #[test]
    fn test_store_get_moves_to_back() {
        let mut store = store(60, 100, Duration::from_secs(5));
        let payload = Arc::new(Blob);

        store.update("a", Arc::downgrade(&payload), 1);
        store.update("b", Arc::downgrade(&payload), 1);
        store.update("c", Arc::downgrade(&payload), 1);
        store.get(&"a");

        assert_eq!(keys(&store), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_evict_fresh_entries_in_lru_order() {
        let mut store = store(60, 100, Duration::from_secs(5));
        let a = Arc::new(Blob);
        let b = Arc::new(Blob);
        let c = Arc::new(Blob);

        store.update("a", Arc::downgrade(&a), 20);
        store.update("b", Arc::downgrade(&b), 20);
        store.update("c", Arc::downgrade(&c), 25);

        let batch = store.evict_to_soft_limit(None);

        assert_eq!(batch.evicted, 1);
        assert_eq!(batch.reclaimed, 20);
        assert_eq!(batch.pending.len(), 1);
        assert!(Arc::ptr_eq(&batch.pending[0], &a));
        assert_eq!(keys(&store), vec!["b", "c"]);
        assert_eq!(store.total_size(), 45);
        store.assert_consistent();
    }

    #[test]
    fn test_evict_stale_front_takes_largest() {
        let mut store = store(60, 100, Duration::ZERO);
        let payload = Arc::new(Blob);

        store.update("a", Arc::downgrade(&payload), 20);
        store.update("b", Arc::downgrade(&payload), 20);
        store.update("c", Arc::downgrade(&payload), 25);
        sleep(Duration::from_millis(20));

        let batch = store.evict_to_soft_limit(None);

        assert_eq!(batch.evicted, 1);
        assert_eq!(keys(&store), vec!["a", "b"]);
        assert_eq!(store.total_size(), 40);
        assert_eq!(store.stats().stale_evictions, 1);
    }

    #[test]
    fn test_evict_protected_key_skips_callback_but_not_accounting() {
        let mut store = store(10, 20, Duration::from_secs(5));
        let payload = Arc::new(Blob);

        store.update("big", Arc::downgrade(&payload), 30);
        assert!(store.exceeds_hard_limit());

        let batch = store.evict_to_soft_limit(Some(&"big"));

        assert_eq!(batch.evicted, 1);
        assert!(batch.pending.is_empty());
        assert!(store.is_empty());
        assert_eq!(store.total_size(), 0);
        store.assert_consistent();
    }

    #[test]
    fn test_evict_drains_everything_when_needed() {
        let mut store = store(0, 0, Duration::from_secs(5));
        let payload = Arc::new(Blob);

        for key in ["a", "b", "c"] {
            store.update(key, Arc::downgrade(&payload), 10);
        }
        let batch = store.evict_to_soft_limit(Some(&"b"));

        assert_eq!(batch.evicted, 3);
        assert_eq!(batch.pending.len(), 2);
        assert!(store.is_empty());
        assert_eq!(store.total_size(), 0);
    }

    #[test]
    fn test_evict_below_soft_limit_is_noop() {
        let mut store = store(60, 100, Duration::from_secs(5));
        let payload = Arc::new(Blob);
        store.update("a", Arc::downgrade(&payload), 60);

        let batch = store.evict_to_soft_limit(None);
        assert_eq!(batch.evicted, 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_evict_released_payload_is_not_collected() {
        let mut store = store(0, 100, Duration::from_secs(5));
        let payload = Arc::new(Blob);
        store.update("a", Arc::downgrade(&payload), 5);
        drop(payload);

        let batch = store.evict_to_soft_limit(None);
        assert_eq!(batch.evicted, 1);
        assert!(batch.pending.is_empty());
    }

    #[test]
    fn test_zero_size_entries_survive_cleanup() {
        let mut store = store(0, 0, Duration::from_secs(5));
        let payload = Arc::new(Blob);
        store.update("empty", Arc::downgrade(&payload), 0);

        let batch = store.evict_to_soft_limit(None);
        assert_eq!(batch.evicted, 0);
        assert!(store.contains(&"empty"));
    }

    #[test]
    fn test_total_size_sums_past_u64_max() {
        let mut store = store(u64::MAX, u64::MAX, Duration::from_secs(5));
        let payload = Arc::new(Blob);
        let half = u64::MAX / 2 + 1;

        store.update("a", Arc::downgrade(&payload), half);
        store.update("b", Arc::downgrade(&payload), half);

        assert_eq!(store.total_size(), u64::MAX);
        assert!(store.exceeds_hard_limit());
        store.assert_consistent();

        let batch = store.evict_to_soft_limit(None);
        assert_eq!(batch.evicted, 1);
        assert_eq!(batch.reclaimed, half);
        assert_eq!(keys(&store), vec!["b"]);
        assert_eq!(store.total_size(), half);
        store.assert_consistent();
    }

    #[test]
    fn test_max_size_entry_is_evicted_by_hard_limit() {
        let mut store = store(60, 100, Duration::from_secs(5));
        let payload = Arc::new(Blob);

        store.update("small", Arc::downgrade(&payload), 10);
        store.update("huge", Arc::downgrade(&payload), u64::MAX);
        assert!(store.exceeds_hard_limit());

        let batch = store.evict_to_soft_limit(Some(&"huge"));

        assert_eq!(batch.evicted, 2);
        assert_eq!(batch.reclaimed, u64::MAX);
        assert!(store.is_empty());
        assert_eq!(store.total_size(), 0);
        store.assert_consistent();
    }

    #[test]
    fn test_huge_time_threshold_never_marks_stale() {
        let mut store = store(10, 100, Duration::from_secs(u64::MAX / 1000 + 1));
        let payload = Arc::new(Blob);

        store.update("a", Arc::downgrade(&payload), 5);
        store.update("b", Arc::downgrade(&payload), 20);
        sleep(Duration::from_millis(20));

        let batch = store.evict_to_soft_limit(None);

        // Strict LRU: the front goes first, not the largest
        assert_eq!(batch.evicted, 2);
        assert!(store.is_empty());
        assert_eq!(store.stats().stale_evictions, 0);

        store.update("a", Arc::downgrade(&payload), 5);
        store.update("b", Arc::downgrade(&payload), 8);
        sleep(Duration::from_millis(20));

        let batch = store.evict_to_soft_limit(None);
        assert_eq!(batch.evicted, 1);
        assert_eq!(keys(&store), vec!["b"]);
        assert_eq!(store.stats().stale_evictions, 0);
    }

    #[test]
    fn test_store_stats() {
        let mut store = store(60, 100, Duration::from_secs(5));
        let payload = Arc::new(Blob);

        store.update("a", Arc::downgrade(&payload), 12);
        store.get(&"a"); // hit
        store.get(&"nonexistent"); // miss

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.total_size, 12);
    }
}
