//! Cache Accessor Module
//!
//! The public read/write surface of the offline cache. Reads never delete:
//! stale and malformed records are reported as misses and left on disk for
//! the background sweep.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::entry::{decode, decode_header, encode};
use crate::cache::stats::StatsRecorder;
use crate::cache::{CacheStats, Collection, StoreHandle, StoredEntry};
use crate::error::Result;
use crate::quota::{self, StorageInfo};

/// Record shape of values in the metadata collection.
#[derive(Debug, Serialize, Deserialize)]
struct MetadataRecord<V> {
    value: V,
    updated_at: DateTime<Utc>,
}

// == Offline Cache ==
/// Read/write access to the offline cache.
///
/// Cloning is cheap; all clones share the same store handle and counters.
#[derive(Debug, Clone)]
pub struct OfflineCache {
    handle: Arc<StoreHandle>,
    stats: Arc<StatsRecorder>,
}

impl OfflineCache {
    // == Constructor ==
    /// Creates an accessor over a shared store handle.
    pub fn new(handle: Arc<StoreHandle>) -> Self {
        Self {
            handle,
            stats: Arc::new(StatsRecorder::default()),
        }
    }

    pub fn handle(&self) -> &Arc<StoreHandle> {
        &self.handle
    }

    /// Opens the underlying store. Every operation does this on demand.
    pub async fn initialize(&self) -> Result<()> {
        self.handle.initialize().await
    }

    /// Returns a typed view bound to one collection.
    pub fn collection<P>(&self, collection: Collection) -> CollectionView<'_, P> {
        CollectionView {
            cache: self,
            collection,
            _payload: PhantomData,
        }
    }

    // == Set ==
    /// Stores `payload` under `key`, replacing any previous entry.
    ///
    /// The capture time is always reset to now, so overwriting refreshes
    /// the entry's freshness.
    pub async fn set<P>(&self, collection: Collection, key: &str, payload: &P) -> Result<()>
    where
        P: Serialize + ?Sized,
    {
        let bytes = encode(collection, key, payload)?;
        self.handle.put_raw(collection, key, &bytes).await?;
        self.stats.record_writes(1);
        debug!("Cached {}/{}", collection, key);
        Ok(())
    }

    // == Set Many ==
    /// Stores a batch of entries sharing one capture time.
    ///
    /// Each entry is durable on its own; if a write fails partway the batch
    /// fails and earlier entries stay written.
    pub async fn set_many<K, P>(&self, collection: Collection, items: &[(K, P)]) -> Result<()>
    where
        K: AsRef<str>,
        P: Serialize,
    {
        if items.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        for (key, payload) in items {
            let key = key.as_ref();
            let bytes = StoredEntry::captured_at(key, payload, now).to_bytes(collection)?;
            self.handle.put_raw(collection, key, &bytes).await?;
            self.stats.record_writes(1);
        }

        debug!("Cached {} items in {}", items.len(), collection);
        Ok(())
    }

    // == Get ==
    /// Retrieves the payload stored under `key`.
    ///
    /// Returns `None` when the entry is absent, expired or malformed.
    pub async fn get<P>(&self, collection: Collection, key: &str) -> Result<Option<P>>
    where
        P: DeserializeOwned,
    {
        let Some(bytes) = self.handle.read_raw(collection, key).await? else {
            self.stats.record_miss();
            return Ok(None);
        };

        let now = Utc::now();
        match decode::<P>(collection, key, &bytes, now) {
            Ok(entry) if entry.is_fresh_at(now) => {
                self.stats.record_hit();
                Ok(Some(entry.payload))
            }
            Ok(_) => {
                debug!("Cached entry expired: {}/{}", collection, key);
                self.stats.record_miss();
                Ok(None)
            }
            Err(err) if err.is_miss() => {
                debug!("Treating unreadable entry as a miss: {}", err);
                self.stats.record_miss();
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    // == Get All ==
    /// Returns every fresh payload in the collection, in storage order.
    pub async fn get_all<P>(&self, collection: Collection) -> Result<Vec<P>>
    where
        P: DeserializeOwned,
    {
        let raw = self.handle.scan_raw(collection).await?;
        let scanned = raw.len();
        let now = Utc::now();

        let mut fresh: Vec<P> = Vec::with_capacity(scanned);
        for entry in raw {
            match decode::<P>(collection, &entry.id, &entry.bytes, now) {
                Ok(decoded) if decoded.is_fresh_at(now) => fresh.push(decoded.payload),
                Ok(_) => {}
                Err(err) if err.is_miss() => debug!("Skipping unreadable entry: {}", err),
                Err(err) => return Err(err),
            }
        }

        debug!(
            "Retrieved {} of {} items from {}",
            fresh.len(),
            scanned,
            collection
        );
        Ok(fresh)
    }

    // == Clear ==
    /// Removes every entry in the collection, fresh or stale.
    pub async fn clear(&self, collection: Collection) -> Result<()> {
        let removed = self.handle.clear_raw(collection).await?;
        debug!("Cleared {} entries from {}", removed, collection);
        Ok(())
    }

    // == Metadata ==
    /// Stores a process-level bookkeeping value.
    pub async fn set_metadata<V>(&self, key: &str, value: &V) -> Result<()>
    where
        V: Serialize + ?Sized,
    {
        let record = MetadataRecord {
            value,
            updated_at: Utc::now(),
        };
        self.set(Collection::Metadata, key, &record).await
    }

    /// Retrieves a bookkeeping value, subject to the same expiry as any entry.
    pub async fn get_metadata<V>(&self, key: &str) -> Result<Option<V>>
    where
        V: DeserializeOwned,
    {
        let record: Option<MetadataRecord<V>> = self.get(Collection::Metadata, key).await?;
        Ok(record.map(|record| record.value))
    }

    // == Remove Expired ==
    /// Deletes every expired entry in the collection and returns the count.
    ///
    /// Records whose bookkeeping fields cannot be read are left in place.
    /// Writers to the collection wait until the sweep of it is done.
    pub async fn remove_expired(&self, collection: Collection) -> Result<usize> {
        let now = Utc::now();
        let removed = self
            .handle
            .remove_where(collection, |entry| {
                match decode_header(collection, &entry.id, &entry.bytes) {
                    Ok(header) => !header.is_fresh_at(now),
                    Err(err) => {
                        debug!("Sweep skipping unreadable entry: {}", err);
                        false
                    }
                }
            })
            .await?;

        self.stats.record_expired(removed);
        Ok(removed)
    }

    // == Storage Info ==
    /// Reports used and available bytes for the store. Never fails.
    pub async fn storage_info(&self) -> StorageInfo {
        quota::storage_info(self.handle.root()).await
    }

    // == Stats ==
    /// Returns a snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}

// == Collection View ==
/// Statically typed access to a single collection.
#[derive(Debug)]
pub struct CollectionView<'a, P> {
    cache: &'a OfflineCache,
    collection: Collection,
    _payload: PhantomData<fn() -> P>,
}

impl<P> CollectionView<'_, P>
where
    P: Serialize + DeserializeOwned,
{
    pub async fn set(&self, key: &str, payload: &P) -> Result<()> {
        self.cache.set(self.collection, key, payload).await
    }

    pub async fn set_many<K: AsRef<str>>(&self, items: &[(K, P)]) -> Result<()> {
        self.cache.set_many(self.collection, items).await
    }

    pub async fn get(&self, key: &str) -> Result<Option<P>> {
        self.cache.get(self.collection, key).await
    }

    pub async fn get_all(&self) -> Result<Vec<P>> {
        self.cache.get_all(self.collection).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.cache.clear(self.collection).await
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::{json, Value};

    use crate::cache::freshness_horizon;

    fn test_cache(dir: &tempfile::TempDir) -> OfflineCache {
        OfflineCache::new(Arc::new(StoreHandle::new(dir.path())))
    }

    async fn write_aged(cache: &OfflineCache, collection: Collection, key: &str, age: Duration) {
        let bytes = StoredEntry::captured_at(key, json!({ "id": key }), Utc::now() - age)
            .to_bytes(collection)
            .unwrap();
        cache.handle().put_raw(collection, key, &bytes).await.unwrap();
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = test_cache(&tmp);

        cache
            .set(Collection::Profiles, "p1", &json!({"name": "Ada"}))
            .await
            .unwrap();
        let value: Option<Value> = cache.get(Collection::Profiles, "p1").await.unwrap();

        assert_eq!(value, Some(json!({"name": "Ada"})));
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = test_cache(&tmp);

        let value: Option<Value> = cache.get(Collection::Events, "missing").await.unwrap();
        assert!(value.is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_set_refreshes_stale_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = test_cache(&tmp);

        write_aged(&cache, Collection::Events, "e1", freshness_horizon()).await;
        assert!(cache.get::<Value>(Collection::Events, "e1").await.unwrap().is_none());

        cache.set(Collection::Events, "e1", &json!({"id": "e1"})).await.unwrap();
        assert!(cache.get::<Value>(Collection::Events, "e1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_malformed_entry_is_a_miss_and_kept() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = test_cache(&tmp);

        cache
            .handle()
            .put_raw(Collection::ChatMessages, "m1", br#"{"payload": 1}"#)
            .await
            .unwrap();

        let value: Option<Value> = cache.get(Collection::ChatMessages, "m1").await.unwrap();
        assert!(value.is_none());
        let all: Vec<Value> = cache.get_all(Collection::ChatMessages).await.unwrap();
        assert!(all.is_empty());

        assert_eq!(cache.remove_expired(Collection::ChatMessages).await.unwrap(), 0);
        assert!(cache
            .handle()
            .read_raw(Collection::ChatMessages, "m1")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_remove_expired_only_removes_stale() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = test_cache(&tmp);

        let expired = freshness_horizon() + Duration::hours(1);
        write_aged(&cache, Collection::Leaderboard, "old", expired).await;
        write_aged(&cache, Collection::Leaderboard, "new", Duration::hours(1)).await;

        assert_eq!(cache.remove_expired(Collection::Leaderboard).await.unwrap(), 1);
        let all: Vec<Value> = cache.get_all(Collection::Leaderboard).await.unwrap();
        assert_eq!(all, vec![json!({"id": "new"})]);
        assert_eq!(cache.stats().expired_removed, 1);
    }

    #[tokio::test]
    async fn test_metadata_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = test_cache(&tmp);

        cache.set_metadata("last_sync", "2024-05-01T10:00:00Z").await.unwrap();
        let value: Option<String> = cache.get_metadata("last_sync").await.unwrap();
        assert_eq!(value.as_deref(), Some("2024-05-01T10:00:00Z"));

        let missing: Option<String> = cache.get_metadata("never_set").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_typed_collection_view() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Thread {
            title: String,
            replies: u32,
        }

        let tmp = tempfile::tempdir().unwrap();
        let cache = test_cache(&tmp);
        let threads = cache.collection::<Thread>(Collection::ForumThreads);

        threads
            .set_many(&[
                ("t1", Thread { title: "Speedruns".into(), replies: 4 }),
                ("t2", Thread { title: "Trades".into(), replies: 0 }),
            ])
            .await
            .unwrap();

        let t1 = threads.get("t1").await.unwrap().unwrap();
        assert_eq!(t1.replies, 4);
        assert_eq!(threads.get_all().await.unwrap().len(), 2);
        assert_eq!(cache.stats().writes, 2);

        threads.clear().await.unwrap();
        assert!(threads.get_all().await.unwrap().is_empty());
    }
}
