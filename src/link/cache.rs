//! Persistent label → link-outcome memo.
//!
//! Every label the linker has ever resolved gets exactly one entry, keyed by
//! its trimmed lowercase form. Entries never expire. An entry without an
//! external id is a known miss: the label was searched and nothing fit, and
//! it must not be searched again.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use redb::TableDefinition;
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::store::{self, DurableStore, MemStore, StrTable};

const ENTITY_CACHE: StrTable = TableDefinition::new("entity_cache");

/// Database file name inside the cache directory.
pub const CACHE_FILE: &str = "entities.redb";

/// Stored outcome of resolving one label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub external_id: Option<String>,
    pub description: Option<String>,
    pub confidence: f64,
    /// Unix seconds of the resolution that produced this entry.
    pub last_queried: u64,
}

impl CacheEntry {
    pub fn is_known_miss(&self) -> bool {
        self.external_id.is_none()
    }
}

fn cache_key(label: &str) -> String {
    label.trim().to_lowercase()
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Two-tier entity cache: DashMap in front of a redb table.
#[derive(Debug)]
pub struct EntityCache {
    durable: DurableStore,
    hot: MemStore<CacheEntry>,
}

impl EntityCache {
    /// Open or create the cache under `dir`. A missing database is created.
    pub fn open(dir: &Path) -> StoreResult<Self> {
        let durable = DurableStore::open(&dir.join(CACHE_FILE), &[ENTITY_CACHE])?;
        Ok(Self {
            durable,
            hot: MemStore::new(),
        })
    }

    /// Open a read-only, point-in-time view of the cache under `dir`.
    ///
    /// Safe to call while another process holds the cache open for writing.
    pub fn open_snapshot(dir: &Path) -> StoreResult<Self> {
        let durable = DurableStore::open_snapshot(&dir.join(CACHE_FILE), &[ENTITY_CACHE])?;
        Ok(Self {
            durable,
            hot: MemStore::new(),
        })
    }

    /// Look up `label` (case and surrounding whitespace are ignored).
    pub fn get(&self, label: &str) -> StoreResult<Option<CacheEntry>> {
        let key = cache_key(label);
        if let Some(entry) = self.hot.get(&key) {
            return Ok(Some(entry));
        }
        match self.durable.get(ENTITY_CACHE, &key)? {
            Some(bytes) => {
                let entry: CacheEntry = store::decode(&bytes)?;
                self.hot.put(&key, entry.clone());
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Upsert the outcome for `label` in one transaction. Last writer wins.
    pub fn put(
        &self,
        label: &str,
        external_id: Option<&str>,
        description: Option<&str>,
        confidence: f64,
    ) -> StoreResult<CacheEntry> {
        let key = cache_key(label);
        let entry = CacheEntry {
            external_id: external_id.map(str::to_string),
            description: description.map(str::to_string),
            confidence,
            last_queried: unix_now(),
        };
        self.durable
            .put(ENTITY_CACHE, &key, &store::encode(&entry)?)?;
        self.hot.put(&key, entry.clone());
        Ok(entry)
    }

    /// Record a known miss for `label`.
    pub fn put_miss(&self, label: &str) -> StoreResult<CacheEntry> {
        self.put(label, None, None, 0.0)
    }

    pub fn len(&self) -> StoreResult<u64> {
        self.durable.len(ENTITY_CACHE)
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        self.len().map(|n| n == 0)
    }

    /// Every `(label, entry)` pair, ordered by label.
    pub fn entries(&self) -> StoreResult<Vec<(String, CacheEntry)>> {
        self.durable
            .entries(ENTITY_CACHE)?
            .into_iter()
            .map(|(key, bytes)| Ok((key, store::decode(&bytes)?)))
            .collect()
    }

    pub fn is_read_only(&self) -> bool {
        self.durable.is_read_only()
    }
}
