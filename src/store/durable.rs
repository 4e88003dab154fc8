//! ACID-durable key-value tables backed by redb.
//!
//! Each database file holds one or more named tables of string keys to
//! binary values. Every write is its own transaction, so a killed process
//! never leaves a partial record behind. Reads use MVCC snapshots.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition, TableHandle};

use crate::error::{StoreError, StoreResult};

/// A named table of string keys to binary values.
pub type StrTable = TableDefinition<'static, &'static str, &'static [u8]>;

static SNAPSHOT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Temporary copy of a database file, removed on drop.
struct SnapshotFile(PathBuf);

impl Drop for SnapshotFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

/// ACID-durable store using redb.
pub struct DurableStore {
    db: Database,
    path: PathBuf,
    read_only: bool,
    // Declared after `db` so the database closes before the copy is removed.
    _snapshot: Option<SnapshotFile>,
}

impl DurableStore {
    /// Open or create the database at `path`, creating any missing tables.
    pub fn open(path: &Path, tables: &[StrTable]) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io { source: e })?;
        }
        let db = create_db(path)?;
        ensure_tables(&db, tables)?;
        Ok(Self {
            db,
            path: path.to_path_buf(),
            read_only: false,
            _snapshot: None,
        })
    }

    /// Open a point-in-time, read-only copy of the database at `path`.
    ///
    /// redb holds an exclusive lock on an open file, so a second process
    /// cannot read a database another process is writing. The snapshot is
    /// a copy taken now; later writes to the original are not visible. A
    /// missing source yields an empty snapshot.
    pub fn open_snapshot(path: &Path, tables: &[StrTable]) -> StoreResult<Self> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "store.redb".into());
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0);
        let copy_path = std::env::temp_dir().join(format!(
            "devkg-snapshot-{}-{}-{}-{file_name}",
            std::process::id(),
            SNAPSHOT_SEQ.fetch_add(1, Ordering::Relaxed),
            nanos,
        ));

        if path.exists() {
            std::fs::copy(path, &copy_path).map_err(|e| StoreError::Io { source: e })?;
        }
        let guard = SnapshotFile(copy_path.clone());

        let db = create_db(&copy_path)?;
        ensure_tables(&db, tables)?;
        tracing::debug!(
            source = %path.display(),
            copy = %copy_path.display(),
            "opened read-only snapshot"
        );
        Ok(Self {
            db,
            path: path.to_path_buf(),
            read_only: true,
            _snapshot: Some(guard),
        })
    }

    /// Store a key-value pair with full ACID guarantees.
    pub fn put(&self, table: StrTable, key: &str, value: &[u8]) -> StoreResult<()> {
        if self.read_only {
            return Err(StoreError::ReadOnly {
                key: key.to_string(),
            });
        }
        let txn = self.db.begin_write().map_err(|e| StoreError::Redb {
            message: format!("begin_write failed: {e}"),
        })?;
        {
            let mut t = txn.open_table(table).map_err(|e| StoreError::Redb {
                message: format!("open_table failed: {e}"),
            })?;
            t.insert(key, value).map_err(|e| StoreError::Redb {
                message: format!("insert failed: {e}"),
            })?;
        }
        txn.commit().map_err(|e| StoreError::Redb {
            message: format!("commit failed: {e}"),
        })?;
        Ok(())
    }

    /// Read a value by key. Returns `Ok(None)` if the key doesn't exist.
    pub fn get(&self, table: StrTable, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let txn = self.db.begin_read().map_err(|e| StoreError::Redb {
            message: format!("begin_read failed: {e}"),
        })?;
        let t = txn.open_table(table).map_err(|e| StoreError::Redb {
            message: format!("open_table failed: {e}"),
        })?;
        let result = t.get(key).map_err(|e| StoreError::Redb {
            message: format!("get failed: {e}"),
        })?;
        Ok(result.map(|guard| guard.value().to_vec()))
    }

    /// Delete a key. Returns whether the key existed.
    pub fn remove(&self, table: StrTable, key: &str) -> StoreResult<bool> {
        if self.read_only {
            return Err(StoreError::ReadOnly {
                key: key.to_string(),
            });
        }
        let txn = self.db.begin_write().map_err(|e| StoreError::Redb {
            message: format!("begin_write failed: {e}"),
        })?;
        let existed = {
            let mut t = txn.open_table(table).map_err(|e| StoreError::Redb {
                message: format!("open_table failed: {e}"),
            })?;
            let result = t.remove(key).map_err(|e| StoreError::Redb {
                message: format!("remove failed: {e}"),
            })?;
            result.is_some()
        };
        txn.commit().map_err(|e| StoreError::Redb {
            message: format!("commit failed: {e}"),
        })?;
        Ok(existed)
    }

    /// Number of entries in `table`.
    pub fn len(&self, table: StrTable) -> StoreResult<u64> {
        let txn = self.db.begin_read().map_err(|e| StoreError::Redb {
            message: format!("begin_read failed: {e}"),
        })?;
        let t = txn.open_table(table).map_err(|e| StoreError::Redb {
            message: format!("open_table failed: {e}"),
        })?;
        t.len().map_err(|e| StoreError::Redb {
            message: format!("len failed: {e}"),
        })
    }

    /// All `(key, value)` pairs of `table`, in key order.
    pub fn entries(&self, table: StrTable) -> StoreResult<Vec<(String, Vec<u8>)>> {
        let txn = self.db.begin_read().map_err(|e| StoreError::Redb {
            message: format!("begin_read failed: {e}"),
        })?;
        let t = txn.open_table(table).map_err(|e| StoreError::Redb {
            message: format!("open_table failed: {e}"),
        })?;
        let iter = t.iter().map_err(|e| StoreError::Redb {
            message: format!("iter failed: {e}"),
        })?;

        let mut out = Vec::new();
        for item in iter {
            let (k, v) = item.map_err(|e| StoreError::Redb {
                message: format!("iteration failed: {e}"),
            })?;
            out.push((k.value().to_string(), v.value().to_vec()));
        }
        Ok(out)
    }

    /// Whether writes are rejected (snapshot mode).
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Path of the database this store was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn create_db(path: &Path) -> StoreResult<Database> {
    Database::create(path).map_err(|e| StoreError::Redb {
        message: format!("failed to open redb at {}: {e}", path.display()),
    })
}

fn ensure_tables(db: &Database, tables: &[StrTable]) -> StoreResult<()> {
    let txn = db.begin_write().map_err(|e| StoreError::Redb {
        message: format!("begin_write failed: {e}"),
    })?;
    for table in tables {
        txn.open_table(*table).map_err(|e| StoreError::Redb {
            message: format!("failed to create table {}: {e}", table.name()),
        })?;
    }
    txn.commit().map_err(|e| StoreError::Redb {
        message: format!("commit failed: {e}"),
    })
}

impl std::fmt::Debug for DurableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableStore")
            .field("path", &self.path)
            .field("read_only", &self.read_only)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const T: StrTable = TableDefinition::new("test");

    #[test]
    fn put_get_remove() {
        let dir = TempDir::new().unwrap();
        let store = DurableStore::open(&dir.path().join("t.redb"), &[T]).unwrap();

        store.put(T, "hello", b"world").unwrap();
        assert_eq!(store.get(T, "hello").unwrap(), Some(b"world".to_vec()));

        assert!(store.remove(T, "hello").unwrap());
        assert_eq!(store.get(T, "hello").unwrap(), None);
        assert!(!store.remove(T, "hello").unwrap());
    }

    #[test]
    fn fresh_table_is_readable() {
        let dir = TempDir::new().unwrap();
        let store = DurableStore::open(&dir.path().join("nested/t.redb"), &[T]).unwrap();
        assert_eq!(store.get(T, "missing").unwrap(), None);
        assert_eq!(store.len(T).unwrap(), 0);
    }

    #[test]
    fn overwrite_value() {
        let dir = TempDir::new().unwrap();
        let store = DurableStore::open(&dir.path().join("t.redb"), &[T]).unwrap();

        store.put(T, "key", b"val1").unwrap();
        store.put(T, "key", b"val2").unwrap();
        assert_eq!(store.get(T, "key").unwrap(), Some(b"val2".to_vec()));
        assert_eq!(store.len(T).unwrap(), 1);
    }

    #[test]
    fn entries_in_key_order() {
        let dir = TempDir::new().unwrap();
        let store = DurableStore::open(&dir.path().join("t.redb"), &[T]).unwrap();
        store.put(T, "b", b"2").unwrap();
        store.put(T, "a", b"1").unwrap();

        let keys: Vec<String> = store.entries(T).unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn snapshot_is_read_only_copy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.redb");
        let store = DurableStore::open(&path, &[T]).unwrap();
        store.put(T, "before", b"1").unwrap();

        let snap = DurableStore::open_snapshot(&path, &[T]).unwrap();
        assert!(snap.is_read_only());
        assert_eq!(snap.get(T, "before").unwrap(), Some(b"1".to_vec()));

        store.put(T, "after", b"2").unwrap();
        assert_eq!(snap.get(T, "after").unwrap(), None);

        assert!(matches!(
            snap.put(T, "x", b"y"),
            Err(StoreError::ReadOnly { .. })
        ));
    }

    #[test]
    fn snapshot_of_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let snap = DurableStore::open_snapshot(&dir.path().join("none.redb"), &[T]).unwrap();
        assert_eq!(snap.len(T).unwrap(), 0);
    }
}
