//! Persistent Store Handle
//!
//! Owns the durable store: a root directory holding one sub-directory per
//! collection and one JSON file per entry, named by the SHA-256 digest of its
//! key. Every write lands in a hidden temporary file first and is renamed
//! into place, so a single entry is replaced or removed atomically.
//!
//! Each collection has a lock: writers share it, the expiry sweep takes it
//! exclusively so no write can land between its staleness check and delete.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info};

use crate::cache::Collection;
use crate::error::{CacheError, Result};

const ENTRY_EXTENSION: &str = "json";

/// Length of a hex-encoded SHA-256 digest.
const ENTRY_ID_LEN: usize = 64;

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// File identifier of the record stored under `key`.
pub fn entry_id(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

// == Raw Entry ==
/// An undecoded record as found on disk.
#[derive(Debug, Clone)]
pub struct RawEntry {
    /// Digest of the record's key, see [`entry_id`]
    pub id: String,
    pub bytes: Vec<u8>,
}

// == Store Handle ==
/// Lazily opened connection to the durable store.
///
/// Share one handle per process behind an `Arc`. Initialization runs at most
/// once at a time; concurrent first callers await the same attempt.
#[derive(Debug)]
pub struct StoreHandle {
    root: PathBuf,
    ready: OnceCell<()>,
    locks: [RwLock<()>; Collection::ALL.len()],
}

impl StoreHandle {
    // == Constructor ==
    /// Creates a handle for the store rooted at `root` without touching disk.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ready: OnceCell::new(),
            locks: std::array::from_fn(|_| RwLock::new(())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_initialized(&self) -> bool {
        self.ready.initialized()
    }

    // == Initialize ==
    /// Opens the store, creating the root and any missing collection.
    ///
    /// Returns immediately once a previous call has succeeded. A failed
    /// attempt is not cached; the next caller tries again.
    pub async fn initialize(&self) -> Result<()> {
        self.ready.get_or_try_init(|| self.open()).await?;
        Ok(())
    }

    async fn open(&self) -> Result<()> {
        let unavailable = |path: &Path, source: io::Error| CacheError::StorageUnavailable {
            path: path.to_path_buf(),
            source,
        };

        fs::create_dir_all(&self.root)
            .await
            .map_err(|err| unavailable(&self.root, err))?;

        for collection in Collection::ALL {
            let dir = self.collection_dir(collection);
            fs::create_dir_all(&dir)
                .await
                .map_err(|err| unavailable(&dir, err))?;
        }

        info!("Offline store initialized at {}", self.root.display());
        Ok(())
    }

    fn lock(&self, collection: Collection) -> &RwLock<()> {
        &self.locks[collection as usize]
    }

    fn collection_dir(&self, collection: Collection) -> PathBuf {
        self.root.join(collection.name())
    }

    fn id_path(&self, collection: Collection, id: &str) -> PathBuf {
        self.collection_dir(collection)
            .join(format!("{}.{}", id, ENTRY_EXTENSION))
    }

    fn entry_path(&self, collection: Collection, key: &str) -> PathBuf {
        self.id_path(collection, &entry_id(key))
    }

    // == Put ==
    /// Writes `bytes` as the record for `key`, replacing any previous record.
    pub async fn put_raw(&self, collection: Collection, key: &str, bytes: &[u8]) -> Result<()> {
        self.initialize().await?;
        let _shared = self.lock(collection).read().await;

        let path = self.entry_path(collection, key);
        atomic_write(&path, bytes)
            .await
            .map_err(|source| CacheError::WriteFailed {
                collection,
                key: key.to_string(),
                source,
            })
    }

    // == Read ==
    /// Reads the record for `key`, or `None` if it does not exist.
    pub async fn read_raw(&self, collection: Collection, key: &str) -> Result<Option<Vec<u8>>> {
        self.initialize().await?;

        match fs::read(self.entry_path(collection, key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CacheError::ReadFailed { collection, source }),
        }
    }

    // == Scan ==
    /// Reads every record in the collection, fresh or not, in directory order.
    pub async fn scan_raw(&self, collection: Collection) -> Result<Vec<RawEntry>> {
        self.initialize().await?;

        let read_failed = |source| CacheError::ReadFailed { collection, source };
        let mut dir = fs::read_dir(self.collection_dir(collection))
            .await
            .map_err(read_failed)?;

        let mut entries = Vec::new();
        while let Some(item) = dir.next_entry().await.map_err(read_failed)? {
            let path = item.path();
            let Some(id) = id_from_path(&path) else {
                continue;
            };

            match fs::read(&path).await {
                Ok(bytes) => entries.push(RawEntry { id, bytes }),
                // Removed between listing and reading
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(read_failed(err)),
            }
        }

        Ok(entries)
    }

    // == Remove ==
    /// Deletes the record for `key`. Returns false if it was already gone.
    pub async fn remove_raw(&self, collection: Collection, key: &str) -> Result<bool> {
        self.initialize().await?;
        let _shared = self.lock(collection).read().await;

        remove_file(&self.entry_path(collection, key))
            .await
            .map_err(|source| CacheError::WriteFailed {
                collection,
                key: key.to_string(),
                source,
            })
    }

    // == Remove Where ==
    /// Deletes every record for which `remove` returns true and returns the
    /// number deleted.
    ///
    /// Holds the collection lock exclusively from the scan through the last
    /// delete, so records written meanwhile are never judged on stale bytes.
    pub async fn remove_where<F>(&self, collection: Collection, mut remove: F) -> Result<usize>
    where
        F: FnMut(&RawEntry) -> bool,
    {
        self.initialize().await?;
        let _exclusive = self.lock(collection).write().await;

        let mut removed = 0;
        for entry in self.scan_raw(collection).await? {
            if !remove(&entry) {
                continue;
            }
            let deleted = remove_file(&self.id_path(collection, &entry.id))
                .await
                .map_err(|source| CacheError::WriteFailed {
                    collection,
                    key: entry.id.clone(),
                    source,
                })?;
            if deleted {
                removed += 1;
            }
        }

        Ok(removed)
    }

    // == Clear ==
    /// Deletes every record in the collection. Returns the number removed.
    pub async fn clear_raw(&self, collection: Collection) -> Result<usize> {
        self.initialize().await?;
        let _shared = self.lock(collection).read().await;

        let write_failed = |source| CacheError::WriteFailed {
            collection,
            key: "*".to_string(),
            source,
        };
        let mut dir = fs::read_dir(self.collection_dir(collection))
            .await
            .map_err(write_failed)?;

        let mut removed = 0;
        while let Some(item) = dir.next_entry().await.map_err(write_failed)? {
            let path = item.path();
            if id_from_path(&path).is_none() {
                continue;
            }
            if remove_file(&path).await.map_err(write_failed)? {
                removed += 1;
            }
        }

        Ok(removed)
    }
}

/// Removes a record file. Returns false if it was already gone.
async fn remove_file(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Extracts the entry id from a record file name, skipping temporary and
/// foreign files.
fn id_from_path(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    if name.starts_with('.') {
        return None;
    }
    let stem = name.strip_suffix(ENTRY_EXTENSION)?.strip_suffix('.')?;
    if stem.len() == ENTRY_ID_LEN && stem.bytes().all(|b| b.is_ascii_hexdigit()) {
        Some(stem.to_string())
    } else {
        debug!("Ignoring foreign file in store: {}", path.display());
        None
    }
}

async fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "entry path has no parent"))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("entry");
    let tmp_path = parent.join(format!(
        ".{}.{}.{}.tmp",
        file_name,
        std::process::id(),
        TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let write_result = async {
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        Ok::<_, io::Error>(())
    }
    .await;

    let result = match write_result {
        Ok(()) => fs::rename(&tmp_path, path).await,
        Err(err) => Err(err),
    };

    if result.is_err() {
        if let Err(remove_err) = fs::remove_file(&tmp_path).await {
            if remove_err.kind() != io::ErrorKind::NotFound {
                debug!(
                    "Failed to remove temporary file {}: {}",
                    tmp_path.display(),
                    remove_err
                );
            }
        }
    }
    result
}
