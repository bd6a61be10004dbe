//! Recency Index Module
//!
//! Tracks access order for LRU eviction with O(1) relocation and removal.

// == Recency Handle ==
/// Stable position of a key inside a [`RecencyList`].
///
/// Valid until the key is removed; slots are recycled afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecencyHandle(usize);

#[derive(Debug)]
struct Node<K> {
    key: K,
    prev: Option<usize>,
    next: Option<usize>,
}

// == Recency List ==
/// Access order of keys, stored as an index-linked list over a slab.
///
/// - Front = Least recently used
/// - Back = Most recently used
#[derive(Debug)]
pub struct RecencyList<K> {
    slots: Vec<Option<Node<K>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<K> Default for RecencyList<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> RecencyList<K> {
    // == Constructor ==
    /// Creates a new empty recency list.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    // == Push Back ==
    /// Appends a key as the most recently used and returns its handle.
    pub fn push_back(&mut self, key: K) -> RecencyHandle {
        let node = Node {
            key,
            prev: None,
            next: None,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        self.link_back(idx);
        self.len += 1;
        RecencyHandle(idx)
    }

    // == Move To Back ==
    /// Marks the key at `handle` as most recently used.
    pub fn move_to_back(&mut self, handle: RecencyHandle) {
        if self.tail == Some(handle.0) || !self.is_occupied(handle.0) {
            return;
        }
        self.unlink(handle.0);
        self.link_back(handle.0);
    }

    // == Remove ==
    /// Removes the key at `handle` and returns it.
    ///
    /// Returns None if the handle points at a vacant slot.
    pub fn remove(&mut self, handle: RecencyHandle) -> Option<K> {
        if !self.is_occupied(handle.0) {
            return None;
        }
        self.unlink(handle.0);
        let node = self.slots[handle.0].take()?;
        self.free.push(handle.0);
        self.len -= 1;
        Some(node.key)
    }

    // == Front ==
    /// Returns the least recently used key without removing it.
    pub fn front(&self) -> Option<&K> {
        self.head.and_then(|idx| self.node(idx)).map(|n| &n.key)
    }

    /// Iterates keys from least to most recently used.
    pub fn iter(&self) -> Iter<'_, K> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.len
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn node(&self, idx: usize) -> Option<&Node<K>> {
        self.slots.get(idx).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, idx: usize) -> Option<&mut Node<K>> {
        self.slots.get_mut(idx).and_then(Option::as_mut)
    }

    fn is_occupied(&self, idx: usize) -> bool {
        self.node(idx).is_some()
    }

    /// Detaches a node from its neighbours, leaving the slot occupied.
    fn unlink(&mut self, idx: usize) {
        let Some((prev, next)) = self.node_mut(idx).map(|n| (n.prev.take(), n.next.take()))
        else {
            return;
        };

        match prev {
            Some(p) => {
                if let Some(node) = self.node_mut(p) {
                    node.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(node) = self.node_mut(n) {
                    node.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }

    /// Attaches a detached node at the tail.
    fn link_back(&mut self, idx: usize) {
        let old_tail = self.tail;
        if let Some(node) = self.node_mut(idx) {
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail {
            Some(t) => {
                if let Some(node) = self.node_mut(t) {
                    node.next = Some(idx);
                }
            }
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
    }
}

/// Front-to-back iterator over a [`RecencyList`].
pub struct Iter<'a, K> {
    list: &'a RecencyList<K>,
    cursor: Option<usize>,
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.list.node(self.cursor?)?;
        self.cursor = node.next;
        Some(&node.key)
    }
}
