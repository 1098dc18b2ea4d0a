//! Storage trait definitions.

use crate::StorageResult;
use serde_json::Value;

/// Trait for durable cache backends
pub trait CacheStorage: Send + Sync {
    /// Store a value, replacing any previous one
    fn set(&self, namespace: &str, key: &str, value: Value) -> StorageResult<()>;

    /// Retrieve a value. Expired entries read as absent.
    fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Value>>;

    /// Delete a value, returning whether it existed
    fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool>;

    /// Remove every entry in every namespace
    fn clear(&self) -> StorageResult<()>;

    /// Check if a key exists
    fn has(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        Ok(self.get(namespace, key)?.is_some())
    }
}
