//! Configuration Module
//!
//! Handles loading and validating cache configuration, optionally from environment variables.

use std::env;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Cache configuration parameters.
///
/// All values are supplied at construction and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Eviction target in bytes; cleanup runs until the total size is at or below it
    pub soft_limit: u64,
    /// Total size in bytes whose breach triggers a synchronous cleanup after an update
    pub hard_limit: u64,
    /// Idle time in seconds after which the LRU front counts as stale
    pub time_threshold_secs: u64,
    /// Background sweeper interval in milliseconds, 0 = no sweeper
    pub cleaning_interval_ms: u64,
}

impl CacheConfig {
    // == Constructor ==
    /// Creates a new CacheConfig from explicit values.
    pub fn new(
        soft_limit: u64,
        hard_limit: u64,
        time_threshold_secs: u64,
        cleaning_interval_ms: u64,
    ) -> Self {
        Self {
            soft_limit,
            hard_limit,
            time_threshold_secs,
            cleaning_interval_ms,
        }
    }

    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_SOFT_LIMIT` - Soft size limit in bytes (default: 60)
    /// - `CACHE_HARD_LIMIT` - Hard size limit in bytes (default: 100)
    /// - `CACHE_TIME_THRESHOLD_SECS` - Staleness threshold in seconds (default: 5)
    /// - `CACHE_CLEANING_INTERVAL_MS` - Sweeper interval in milliseconds (default: 500)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            soft_limit: env_or("CACHE_SOFT_LIMIT", defaults.soft_limit),
            hard_limit: env_or("CACHE_HARD_LIMIT", defaults.hard_limit),
            time_threshold_secs: env_or("CACHE_TIME_THRESHOLD_SECS", defaults.time_threshold_secs),
            cleaning_interval_ms: env_or(
                "CACHE_CLEANING_INTERVAL_MS",
                defaults.cleaning_interval_ms,
            ),
        }
    }

    // == Validate ==
    /// Rejects a soft limit above the hard limit.
    pub fn validate(&self) -> Result<()> {
        if self.soft_limit > self.hard_limit {
            return Err(CacheError::InvalidConfig(format!(
                "soft limit {} exceeds hard limit {}",
                self.soft_limit, self.hard_limit
            )));
        }
        Ok(())
    }

    /// Staleness threshold as a Duration.
    pub fn time_threshold(&self) -> Duration {
        Duration::from_secs(self.time_threshold_secs)
    }

    /// Sweeper interval as a Duration, None when the sweeper is disabled.
    pub fn cleaning_interval(&self) -> Option<Duration> {
        (self.cleaning_interval_ms > 0).then(|| Duration::from_millis(self.cleaning_interval_ms))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            soft_limit: 60,
            hard_limit: 100,
            time_threshold_secs: 5,
            cleaning_interval_ms: 500,
        }
    }
}

fn env_or(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
