//! Sweeper Task
//!
//! Background task that periodically drains the cache down to its soft limit.

use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{run_cleanup, Cleanable, SharedStore};
use crate::error::{CacheError, Result};

// == Sweeper Handle ==
/// Owner side of a running sweeper: the shutdown flag and the task handle.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Raises the shutdown flag and wakes the sweeper.
    pub fn signal_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Signals shutdown and waits for the task to exit.
    pub async fn shutdown(self) -> Result<()> {
        self.signal_shutdown();
        self.task
            .await
            .map_err(|e| CacheError::Internal(format!("sweeper task failed: {e}")))?;
        info!("Sweeper stopped");
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawns a background task that calls cleanup every `interval`.
///
/// Each pass only drains toward the soft limit, with no protected key. Passes
/// run on the blocking pool since they take the store mutex and invoke payload
/// callbacks, either of which may block. The task exits as soon as shutdown is
/// signaled, and it re-checks the flag right before every pass, so no cleanup
/// starts once shutdown has been observed. A pass already in flight is awaited
/// before the task exits.
///
/// # Arguments
/// * `store` - Shared cache store
/// * `interval` - Time between cleanup passes
///
/// # Example
/// ```ignore
/// let sweeper = spawn_sweeper_task(store.clone(), Duration::from_millis(500));
/// // Later, during teardown:
/// sweeper.shutdown().await?;
/// ```
pub fn spawn_sweeper_task<K, P>(store: SharedStore<K, P>, interval: Duration) -> SweeperHandle
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
    P: Cleanable + Send + Sync + 'static,
{
    let (shutdown, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        info!(
            "Starting sweeper task with interval of {} ms",
            interval.as_millis()
        );

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    // Err means the handle is gone, which also ends the task
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(interval) => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                    let pass_store = store.clone();
                    match tokio::task::spawn_blocking(move || run_cleanup(&pass_store, None)).await {
                        Ok(evicted) => debug!(evicted, "Sweeper pass finished"),
                        Err(e) => warn!("Sweeper pass failed: {}", e),
                    }
                }
            }
        }

        debug!("Sweeper observed shutdown");
    });

    SweeperHandle { shutdown, task }
}
