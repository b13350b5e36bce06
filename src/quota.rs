//! Quota Reporter
//!
//! Best-effort storage accounting for the store root. Failures never
//! propagate; callers get zeros instead.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;
use tracing::debug;

// == Storage Info ==
/// Bytes used by the store and bytes still available to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StorageInfo {
    pub used: u64,
    pub quota: u64,
    pub available: u64,
}

/// Reports usage for the store rooted at `root`.
///
/// `available` is the free space on the filesystem holding the store and
/// `quota` is `used + available`. Any failure yields all zeros.
pub async fn storage_info(root: &Path) -> StorageInfo {
    match estimate(root).await {
        Ok(info) => info,
        Err(err) => {
            debug!(
                "Storage estimate unavailable for {}: {}",
                root.display(),
                err
            );
            StorageInfo::default()
        }
    }
}

async fn estimate(root: &Path) -> io::Result<StorageInfo> {
    let used = dir_size(root).await?;
    let free_root = root.to_path_buf();
    let available = tokio::task::spawn_blocking(move || fs2::available_space(&free_root))
        .await
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))??;

    Ok(StorageInfo {
        used,
        quota: used.saturating_add(available),
        available,
    })
}

/// Sums the size of every regular file below `root`.
async fn dir_size(root: &Path) -> io::Result<u64> {
    let mut total = 0u64;
    let mut pending: Vec<PathBuf> = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                // Removed while walking
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err),
            };
            if meta.is_dir() {
                pending.push(entry.path());
            } else if meta.is_file() {
                total += meta.len();
            }
        }
    }

    Ok(total)
}
