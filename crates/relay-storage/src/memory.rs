//! In-memory cache backend.

use crate::entry::{self, CacheEntry, CacheTable, Lookup};
use crate::{CacheStorage, StorageResult};
use chrono::Duration;
use parking_lot::Mutex;
use serde_json::Value;

/// Process-local cache with the same expiry rules as the file backend.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    table: Mutex<CacheTable>,
    ttl: Option<Duration>,
}

impl MemoryCacheStorage {
    /// Entries never expire.
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn with_ttl_secs(ttl_secs: u64) -> Self {
        Self {
            table: Mutex::new(CacheTable::new()),
            ttl: entry::ttl_from_secs(ttl_secs),
        }
    }
}

impl CacheStorage for MemoryCacheStorage {
    fn set(&self, namespace: &str, key: &str, value: Value) -> StorageResult<()> {
        self.table
            .lock()
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), CacheEntry::new(value));
        Ok(())
    }

    fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Value>> {
        let mut table = self.table.lock();
        match entry::lookup(&table, namespace, key, self.ttl) {
            Lookup::Hit(value) => Ok(Some(value)),
            Lookup::Miss => Ok(None),
            Lookup::Expired => {
                entry::remove(&mut table, namespace, key);
                Ok(None)
            }
        }
    }

    fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        Ok(entry::remove(&mut self.table.lock(), namespace, key))
    }

    fn clear(&self) -> StorageResult<()> {
        self.table.lock().clear();
        Ok(())
    }
}
