//! Durable cache access for relay clients.

use crate::{CacheError, Relay};
use async_trait::async_trait;
use relay_protocol_types::{CacheCommand, Message};
use relay_storage::CacheStorage;
use serde_json::Value;
use std::sync::Arc;

/// Async view of a durable `(namespace, key) -> JSON` store.
#[async_trait]
pub trait DurableCache: Send + Sync {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>, CacheError>;

    async fn set(&self, namespace: &str, key: &str, value: Value) -> Result<(), CacheError>;

    /// Returns whether an entry was removed.
    async fn delete(&self, namespace: &str, key: &str) -> Result<bool, CacheError>;

    async fn clear(&self) -> Result<(), CacheError>;
}

/// Cache backed by a storage handle in this process.
#[derive(Clone)]
pub struct LocalCache {
    storage: Arc<dyn CacheStorage>,
}

impl LocalCache {
    pub fn new(storage: Arc<dyn CacheStorage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl DurableCache for LocalCache {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>, CacheError> {
        Ok(self.storage.get(namespace, key)?)
    }

    async fn set(&self, namespace: &str, key: &str, value: Value) -> Result<(), CacheError> {
        Ok(self.storage.set(namespace, key, value)?)
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<bool, CacheError> {
        Ok(self.storage.delete(namespace, key)?)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        Ok(self.storage.clear()?)
    }
}

/// Cache owned by the background process, reached with `tb-cache` messages.
///
/// A `get` reply carries the value (or `null`) as its data.
#[derive(Clone)]
pub struct RelayCache {
    relay: Relay,
}

impl RelayCache {
    pub fn new(relay: Relay) -> Self {
        Self { relay }
    }
}

#[async_trait]
impl DurableCache for RelayCache {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>, CacheError> {
        let data = self
            .relay
            .send(Message::Cache(CacheCommand::get(namespace, key)))
            .await?;
        Ok(data.filter(|value| !value.is_null()))
    }

    async fn set(&self, namespace: &str, key: &str, value: Value) -> Result<(), CacheError> {
        self.relay
            .send(Message::Cache(CacheCommand::set(namespace, key, value)))
            .await?;
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<bool, CacheError> {
        let data = self
            .relay
            .send(Message::Cache(CacheCommand::delete(namespace, key)))
            .await?;
        Ok(data
            .and_then(|data| data.get("deleted").and_then(Value::as_bool))
            .unwrap_or(false))
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.relay.send(Message::Cache(CacheCommand::clear())).await?;
        Ok(())
    }
}
