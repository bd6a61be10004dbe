//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a cache is alive.
//!
//! # Tasks
//! - Sweeper: drains the cache down to its soft limit at a configured interval

mod sweeper;

pub use sweeper::{spawn_sweeper_task, SweeperHandle};
