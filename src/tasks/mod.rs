//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the cache is in use.
//!
//! # Tasks
//! - Expiry sweep: Deletes entries past the freshness horizon at a fixed interval

mod cleanup;

pub use cleanup::{spawn_cleanup_task, sweep_once, CleanupHandle, SweepReport};
