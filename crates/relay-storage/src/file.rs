//! File-backed cache.
//!
//! The whole cache is one JSON document of the form
//! `{namespace: {key: {value, cachedAt}}}`. Every mutation rewrites it through
//! a temp file and a rename, so readers never observe a partial write.

use crate::entry::{self, ttl_from_secs, CacheEntry, CacheTable, Lookup};
use crate::{CacheStorage, StorageResult};
use chrono::Duration;
use parking_lot::Mutex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Durable cache persisted to a single JSON file.
#[derive(Debug)]
pub struct FileCacheStorage {
    path: PathBuf,
    ttl: Option<Duration>,
    table: Mutex<CacheTable>,
}

impl FileCacheStorage {
    /// Open (or lazily create) the cache file at `path`.
    ///
    /// A missing file is an empty cache. A corrupt file is logged and
    /// replaced on the next write.
    pub fn open(path: impl Into<PathBuf>, ttl_secs: u64) -> StorageResult<Self> {
        let path = path.into();
        let table = load_table(&path)?;

        debug!(path = %path.display(), namespaces = table.len(), "Opened cache file");

        Ok(Self {
            path,
            ttl: ttl_from_secs(ttl_secs),
            table: Mutex::new(table),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` to a copy of `table` and keep the copy only once it is
    /// on disk. A failed write leaves `table` untouched.
    fn commit<R>(
        &self,
        table: &mut CacheTable,
        change: impl FnOnce(&mut CacheTable) -> R,
    ) -> StorageResult<R> {
        let mut next = table.clone();
        let result = change(&mut next);
        self.persist(&next)?;
        *table = next;
        Ok(result)
    }

    fn persist(&self, table: &CacheTable) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(table)?;
        std::fs::write(&tmp_path, content)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

fn load_table(path: &Path) -> StorageResult<CacheTable> {
    let content = match std::fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(CacheTable::new()),
        Err(e) => return Err(e.into()),
    };

    match serde_json::from_slice(&content) {
        Ok(table) => Ok(table),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cache file is corrupt, starting empty");
            Ok(CacheTable::new())
        }
    }
}

impl CacheStorage for FileCacheStorage {
    fn set(&self, namespace: &str, key: &str, value: Value) -> StorageResult<()> {
        let mut table = self.table.lock();
        self.commit(&mut table, |next| {
            next.entry(namespace.to_string())
                .or_default()
                .insert(key.to_string(), CacheEntry::new(value));
        })
    }

    fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Value>> {
        let mut table = self.table.lock();
        match entry::lookup(&table, namespace, key, self.ttl) {
            Lookup::Hit(value) => Ok(Some(value)),
            Lookup::Miss => Ok(None),
            Lookup::Expired => {
                // Expired entries read as absent whether or not eviction sticks
                match self.commit(&mut table, |next| entry::remove(next, namespace, key)) {
                    Ok(_) => debug!(namespace, key, "Evicted expired cache entry"),
                    Err(e) => {
                        warn!(namespace, key, error = %e, "Failed to evict expired cache entry")
                    }
                }
                Ok(None)
            }
        }
    }

    fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        let mut table = self.table.lock();
        let present = table
            .get(namespace)
            .is_some_and(|entries| entries.contains_key(key));
        if !present {
            return Ok(false);
        }
        self.commit(&mut table, |next| entry::remove(next, namespace, key))
    }

    fn clear(&self) -> StorageResult<()> {
        let mut table = self.table.lock();
        self.commit(&mut table, CacheTable::clear)
    }
}
