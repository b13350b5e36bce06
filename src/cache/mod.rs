//! Cache Module
//!
//! Durable offline cache: collection registry, store handle, entry codec,
//! freshness policy and the public accessor.

mod accessor;
mod collection;
mod entry;
mod freshness;
mod handle;
mod stats;


// Re-export public types
pub use accessor::{CollectionView, OfflineCache};
pub use collection::Collection;
pub use entry::{DecodedEntry, EntryHeader, StoredEntry};
pub use freshness::{freshness_horizon, is_fresh};
pub use handle::{entry_id, RawEntry, StoreHandle};
pub use stats::CacheStats;

// == Public Constants ==
/// Maximum age of an entry before it is treated as expired (24 hours)
pub const FRESHNESS_HORIZON_HOURS: i64 = 24;

/// Default interval between background sweeps in seconds (1 hour)
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 60 * 60;
