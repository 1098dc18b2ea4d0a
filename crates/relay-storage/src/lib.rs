//! Durable cache storage for the relay.
//!
//! Values are JSON documents addressed by `(namespace, key)`:
//! - **File**: one JSON document on disk, rewritten atomically
//! - **Memory**: process-local, for tests and ephemeral use

mod entry;
mod file;
mod keys;
mod memory;
mod traits;

pub use entry::CacheEntry;
pub use file::FileCacheStorage;
pub use keys::CacheKeys;
pub use memory::MemoryCacheStorage;
pub use traits::CacheStorage;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
