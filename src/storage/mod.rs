//! Storage module for the shared cache and the durable queues
//!
//! This module provides:
//! - The `CacheStore` and `MessageQueue` traits
//! - A SQLite backend used in production
//! - An in-memory backend used by tests and one-off inspection

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::{MemoryCache, MemoryQueue};
pub use sqlite::SqliteStore;
pub use traits::{CacheStore, Delivery, MessageQueue, StorageError, StorageResult};

use std::path::Path;

/// Initializes or opens the storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStore)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStore> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    SqliteStore::open(path)
}
