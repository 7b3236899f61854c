//! Storage traits and error types
//!
//! The worker talks to two shared services: a key/value cache with expiry
//! (strategies and link states) and a durable message queue (page jobs and
//! results). Both are traits so the SQLite backend can be swapped for the
//! in-memory one in tests.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Message not found: {0}")]
    MessageNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A message leased from a queue
///
/// The message stays invisible to other consumers until the lease runs out.
/// It is removed only when acknowledged, so a consumer that crashes or fails
/// to finish leaves it to be delivered again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Queue-assigned message id, used to acknowledge the message
    pub id: i64,

    /// Event pattern the message was published under, e.g. "page.added"
    pub pattern: String,

    /// JSON payload
    pub payload: String,

    /// How many times the message has been leased, including this one
    pub deliveries: u32,
}

/// Shared key/value cache with per-entry expiry
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Gets a value, ignoring entries whose TTL has passed
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Stores a value, replacing any previous one
    ///
    /// # Arguments
    ///
    /// * `key` - The cache key
    /// * `value` - The value, usually JSON
    /// * `ttl` - Lifetime of the entry; `None` keeps it forever
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StorageResult<()>;

    /// Removes a value, returning whether it existed
    async fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Counts live entries whose key starts with the prefix
    async fn count_prefix(&self, prefix: &str) -> StorageResult<u64>;
}

/// Durable queue with at-least-once delivery
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Appends a message to the named queue, returning its id
    async fn publish(&self, queue: &str, pattern: &str, payload: &str) -> StorageResult<i64>;

    /// Leases the oldest visible message of the queue
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Delivery))` - A message, invisible to others for `lease`
    /// * `Ok(None)` - The queue has no visible message
    async fn lease(&self, queue: &str, lease: Duration) -> StorageResult<Option<Delivery>>;

    /// Acknowledges a leased message, removing it for good
    async fn ack(&self, id: i64) -> StorageResult<()>;

    /// Number of messages in the queue, leased or not
    async fn depth(&self, queue: &str) -> StorageResult<u64>;
}
