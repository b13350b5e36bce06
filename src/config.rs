//! Configuration Module
//!
//! Handles loading the cache configuration from environment variables.

use std::env;
use std::path::PathBuf;

use crate::cache::DEFAULT_CLEANUP_INTERVAL_SECS;

/// Directory name used under the platform data directory.
const STORE_DIR_NAME: &str = "offline-cache";

/// Offline cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
/// The freshness horizon is fixed and deliberately absent here.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory of the durable store
    pub store_dir: PathBuf,
    /// Background sweep interval in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `OFFLINE_CACHE_DIR` - Store root (default: `<local data dir>/offline-cache`)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 3600)
    pub fn from_env() -> Self {
        Self {
            store_dir: env::var_os("OFFLINE_CACHE_DIR")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(default_store_dir),
            cleanup_interval: env::var("CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_CLEANUP_INTERVAL_SECS),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL_SECS,
        }
    }
}

fn default_store_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(STORE_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(STORE_DIR_NAME))
}
