//! Timestamped cache entries and the in-memory table shared by the backends.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A stored value and when it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub value: Value,
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            cached_at: Utc::now(),
        }
    }

    /// `ttl` of `None` never expires.
    pub fn is_expired(&self, ttl: Option<Duration>, now: DateTime<Utc>) -> bool {
        match ttl {
            Some(ttl) => now - self.cached_at >= ttl,
            None => false,
        }
    }
}

/// Zero disables expiry.
pub(crate) fn ttl_from_secs(secs: u64) -> Option<Duration> {
    if secs == 0 {
        None
    } else {
        Some(Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)))
    }
}

/// namespace -> key -> entry
pub(crate) type CacheTable = BTreeMap<String, BTreeMap<String, CacheEntry>>;

/// Outcome of a lookup against a [`CacheTable`].
pub(crate) enum Lookup {
    Hit(Value),
    Miss,
    /// Present but past its TTL. The caller decides how to evict it.
    Expired,
}

pub(crate) fn lookup(
    table: &CacheTable,
    namespace: &str,
    key: &str,
    ttl: Option<Duration>,
) -> Lookup {
    match table.get(namespace).and_then(|entries| entries.get(key)) {
        None => Lookup::Miss,
        Some(entry) if entry.is_expired(ttl, Utc::now()) => Lookup::Expired,
        Some(entry) => Lookup::Hit(entry.value.clone()),
    }
}

pub(crate) fn remove(table: &mut CacheTable, namespace: &str, key: &str) -> bool {
    let Some(entries) = table.get_mut(namespace) else {
        return false;
    };
    let removed = entries.remove(key).is_some();
    if entries.is_empty() {
        table.remove(namespace);
    }
    removed
}
