//! Entry Codec
//!
//! Wraps caller payloads with bookkeeping metadata before they are written and
//! validates that metadata when records are read back.

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::cache::{freshness_horizon, is_fresh, Collection};
use crate::error::{CacheError, Result};

// == Stored Entry ==
/// The physical record persisted for every cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry<P> {
    /// Caller-supplied key, unique within its collection
    pub key: String,
    /// Write time recorded by the codec
    pub captured_at: DateTime<Utc>,
    /// Opaque caller payload
    pub payload: P,
}

impl<P> StoredEntry<P> {
    // == Constructor ==
    /// Creates a record stamped with the current time.
    pub fn new(key: impl Into<String>, payload: P) -> Self {
        Self::captured_at(key, payload, Utc::now())
    }

    /// Creates a record with an explicit capture time.
    pub fn captured_at(key: impl Into<String>, payload: P, captured_at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            captured_at,
            payload,
        }
    }

    /// Age of the record at `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.captured_at)
    }
}

impl<P: Serialize> StoredEntry<P> {
    /// Serializes the record into the bytes written to the store.
    pub fn to_bytes(&self, collection: Collection) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|source| CacheError::Serialization {
            collection,
            key: self.key.clone(),
            source,
        })
    }
}

// == Entry Header ==
/// Bookkeeping fields of a record, readable without knowing the payload type.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntryHeader {
    pub key: String,
    pub captured_at: DateTime<Utc>,
}

impl EntryHeader {
    /// Checks the header against the process-wide horizon.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        is_fresh(self.captured_at, now, freshness_horizon())
    }
}

// == Decoded Entry ==
/// A payload recovered from the store together with its age.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEntry<P> {
    pub payload: P,
    pub captured_at: DateTime<Utc>,
    pub age: Duration,
}

impl<P> DecodedEntry<P> {
    /// Checks the entry against the process-wide horizon.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        is_fresh(self.captured_at, now, freshness_horizon())
    }
}

/// Encodes `payload` under `key`, stamping the current time.
pub(crate) fn encode<P>(collection: Collection, key: &str, payload: &P) -> Result<Vec<u8>>
where
    P: Serialize + ?Sized,
{
    StoredEntry::new(key, payload).to_bytes(collection)
}

/// Decodes a full record and computes its age at `now`.
pub(crate) fn decode<P: DeserializeOwned>(
    collection: Collection,
    key: &str,
    bytes: &[u8],
    now: DateTime<Utc>,
) -> Result<DecodedEntry<P>> {
    let entry: StoredEntry<P> =
        serde_json::from_slice(bytes).map_err(|err| malformed(collection, key, err))?;
    Ok(DecodedEntry {
        age: entry.age(now),
        captured_at: entry.captured_at,
        payload: entry.payload,
    })
}

/// Decodes only the bookkeeping fields of a record.
pub(crate) fn decode_header(
    collection: Collection,
    key: &str,
    bytes: &[u8],
) -> Result<EntryHeader> {
    serde_json::from_slice(bytes).map_err(|err| malformed(collection, key, err))
}

fn malformed(collection: Collection, key: &str, err: serde_json::Error) -> CacheError {
    CacheError::MalformedEntry {
        collection,
        key: key.to_string(),
        reason: err.to_string(),
    }
}
