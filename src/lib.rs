//! Offline Cache - A durable key/value cache for offline use
//!
//! Stores opaque payloads in a fixed set of named collections, treats entries
//! older than 24 hours as misses, and sweeps expired entries in the background.

pub mod cache;
pub mod config;
pub mod error;
pub mod quota;
pub mod tasks;

pub use cache::{Collection, CollectionView, OfflineCache, StoreHandle};
pub use config::Config;
pub use error::{CacheError, Result};
pub use quota::StorageInfo;
pub use tasks::{spawn_cleanup_task, sweep_once, CleanupHandle, SweepReport};
