//! Size Index Module
//!
//! Orders keys by entry size so the largest entry can be reclaimed first.

use std::cmp::Reverse;
use std::collections::BTreeMap;

// == Size Handle ==
/// Position of a key inside a [`SizeIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeHandle {
    size: u64,
    seq: u64,
}

impl SizeHandle {
    pub fn size(&self) -> u64 {
        self.size
    }

    fn slot(&self) -> (u64, Reverse<u64>) {
        (self.size, Reverse(self.seq))
    }
}

// == Size Index ==
/// Multi-valued index of keys ordered by size.
///
/// Ties are ordered by insertion sequence, reversed so that the last slot of
/// the map is the earliest-inserted key among the largest ones.
#[derive(Debug)]
pub struct SizeIndex<K> {
    by_size: BTreeMap<(u64, Reverse<u64>), K>,
    next_seq: u64,
}

impl<K> Default for SizeIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> SizeIndex<K> {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            by_size: BTreeMap::new(),
            next_seq: 0,
        }
    }

    // == Insert ==
    /// Indexes `key` under `size`, O(log n).
    pub fn insert(&mut self, size: u64, key: K) -> SizeHandle {
        let handle = SizeHandle {
            size,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.by_size.insert(handle.slot(), key);
        handle
    }

    // == Remove ==
    /// Removes the key stored at `handle`, O(log n).
    pub fn remove(&mut self, handle: SizeHandle) -> Option<K> {
        self.by_size.remove(&handle.slot())
    }

    // == Largest ==
    /// Returns the key with the largest size.
    pub fn largest(&self) -> Option<(SizeHandle, &K)> {
        self.by_size.iter().next_back().map(|(&(size, Reverse(seq)), key)| {
            (SizeHandle { size, seq }, key)
        })
    }

    /// Iterates keys from largest to smallest.
    pub fn iter_desc(&self) -> impl Iterator<Item = (u64, &K)> {
        self.by_size.iter().rev().map(|(&(size, _), key)| (size, key))
    }

    pub fn len(&self) -> usize {
        self.by_size.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_size.is_empty()
    }
}
