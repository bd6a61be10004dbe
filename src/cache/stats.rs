//! Cache Statistics Module
//!
//! Tracks cache lookups, evictions and current occupancy.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of `get` calls that resolved a live payload
    pub hits: u64,
    /// Number of `get` calls for absent keys or released payloads
    pub misses: u64,
    /// Number of entries removed by cleanup
    pub evictions: u64,
    /// Subset of evictions chosen by size because the LRU front was stale
    pub stale_evictions: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
    /// Current sum of entry sizes in bytes
    pub total_size: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    // == Record Eviction ==
    /// Increments the eviction counters.
    pub fn record_eviction(&mut self, stale: bool) {
        self.evictions += 1;
        if stale {
            self.stale_evictions += 1;
        }
    }

    // == Update Occupancy ==
    pub fn set_occupancy(&mut self, entries: usize, size: u64) {
        self.total_entries = entries;
        self.total_size = size;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.stale_evictions, 0);
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.total_size, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_record_eviction() {
        let mut stats = CacheStats::new();
        stats.record_eviction(false);
        stats.record_eviction(true);
        assert_eq!(stats.evictions, 2);
        assert_eq!(stats.stale_evictions, 1);
    }

    #[test]
    fn test_serializes_to_json() {
        let mut stats = CacheStats::new();
        stats.set_occupancy(3, 65);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["total_entries"], 3);
        assert_eq!(json["total_size"], 65);
    }
}
