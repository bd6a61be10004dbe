//! LRU Cache Module
//!
//! Thread-safe cache combining the store, the soft/hard limit policy and the
//! optional background sweeper.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::cache::{CacheStats, CacheStore, Cleanable, EntrySnapshot};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::tasks::{spawn_sweeper_task, SweeperHandle};

/// Store shared between callers and the sweeper task.
pub type SharedStore<K, P> = Arc<Mutex<CacheStore<K, P>>>;

// == Run Cleanup ==
/// Evicts down to the soft limit, then runs payload callbacks outside the lock.
///
/// Returns the number of evicted entries.
pub(crate) fn run_cleanup<K, P>(store: &Mutex<CacheStore<K, P>>, protected: Option<&K>) -> usize
where
    K: Eq + Hash + Clone + Debug,
    P: Cleanable,
{
    let batch = {
        let mut guard = store.lock();
        let before = guard.total_size();
        let batch = guard.evict_to_soft_limit(protected);
        if batch.evicted > 0 {
            info!(
                op = "cleanup",
                evicted = batch.evicted,
                reclaimed = batch.reclaimed,
                size_before = before,
                size_after = guard.total_size(),
                "cleanup pass finished"
            );
        }
        batch
    };

    // Callbacks may re-enter the cache, so the guard must be gone by now.
    for payload in &batch.pending {
        payload.cleanup();
    }
    batch.evicted
}

// == LRU Cache ==
/// Bounded, size-aware cache observing externally owned payloads.
///
/// All operations serialize on a single mutex; `get` takes it too since it
/// reorders recency. The cache holds only `Weak` references, so payload
/// lifetime stays with the caller.
///
/// Dropping the cache only signals the sweeper. A sweeper pass already in
/// flight at that moment still finishes, so payload callbacks may fire after
/// the cache is gone. Call [`LruCache::shutdown`] and await it to be sure no
/// callback runs afterwards.
pub struct LruCache<K, P> {
    store: SharedStore<K, P>,
    config: CacheConfig,
    sweeper: Option<SweeperHandle>,
}

impl<K, P> LruCache<K, P>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
    P: Cleanable + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache from `config`.
    ///
    /// A positive cleaning interval starts the sweeper on the current tokio
    /// runtime; constructing such a cache outside a runtime fails with
    /// [`CacheError::RuntimeUnavailable`].
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(Mutex::new(CacheStore::new(
            config.soft_limit,
            config.hard_limit,
            config.time_threshold(),
        )));

        let sweeper = match config.cleaning_interval() {
            Some(interval) => {
                tokio::runtime::Handle::try_current()
                    .map_err(|_| CacheError::RuntimeUnavailable)?;
                Some(spawn_sweeper_task(store.clone(), interval))
            }
            None => None,
        };

        info!(
            soft_limit = config.soft_limit,
            hard_limit = config.hard_limit,
            time_threshold_secs = config.time_threshold_secs,
            cleaning_interval_ms = config.cleaning_interval_ms,
            "cache created"
        );

        Ok(Self {
            store,
            config,
            sweeper,
        })
    }

    // == Update ==
    /// Records `payload` under `key` with the given size.
    ///
    /// Always succeeds. If the total size then exceeds the hard limit, a
    /// cleanup runs before returning, with `key` protected from its callback.
    pub fn update(&self, key: K, payload: &Arc<P>, size: u64) {
        let over_hard_limit = {
            let mut store = self.store.lock();
            store.update(key.clone(), Arc::downgrade(payload), size);
            store.exceeds_hard_limit()
        };

        if over_hard_limit {
            warn!(
                op = "update",
                key = ?key,
                size,
                hard_limit = self.config.hard_limit,
                "hard limit exceeded, cleaning up"
            );
            run_cleanup(&self.store, Some(&key));
        }
    }

    // == Get ==
    /// Returns the payload for `key` and marks it most recently used.
    ///
    /// None if the key is absent or the payload has already been released.
    pub fn get(&self, key: &K) -> Option<Arc<P>> {
        self.store.lock().get(key)
    }

    // == Cleanup ==
    /// Evicts entries until the total size is at or below the soft limit.
    ///
    /// Returns the number of evicted entries.
    pub fn cleanup(&self) -> usize {
        run_cleanup(&self.store, None)
    }

    /// Same as [`cleanup`](Self::cleanup), but an evicted `protected` key does
    /// not get its payload callback.
    pub fn cleanup_protecting(&self, protected: &K) -> usize {
        run_cleanup(&self.store, Some(protected))
    }

    // == Dump ==
    /// Lists (key, size, last access) for every entry, least recently used first.
    pub fn dump(&self) -> Vec<EntrySnapshot<K>> {
        self.store.lock().snapshot()
    }

    pub fn stats(&self) -> CacheStats {
        self.store.lock().stats()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.store.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.store.lock().total_size()
    }

    // == Accessors ==
    pub fn soft_limit(&self) -> u64 {
        self.config.soft_limit
    }

    pub fn hard_limit(&self) -> u64 {
        self.config.hard_limit
    }

    pub fn time_threshold(&self) -> Duration {
        self.config.time_threshold()
    }

    /// Sweeper interval, zero when no sweeper runs.
    pub fn cleaning_interval(&self) -> Duration {
        Duration::from_millis(self.config.cleaning_interval_ms)
    }

    pub fn has_sweeper(&self) -> bool {
        self.sweeper.is_some()
    }

    // == Shutdown ==
    /// Stops the sweeper and waits for it to exit.
    ///
    /// No sweeper cleanup starts after this is called, and a pass already in
    /// flight has finished its callbacks by the time it returns.
    pub async fn shutdown(mut self) -> Result<()> {
        match self.sweeper.take() {
            Some(sweeper) => sweeper.shutdown().await,
            None => Ok(()),
        }
    }
}

impl<K, P> Drop for LruCache<K, P> {
    fn drop(&mut self) {
        // Cannot join from a synchronous drop; the task exits on its own once signaled.
        if let Some(sweeper) = &self.sweeper {
            sweeper.signal_shutdown();
        }
    }
}
