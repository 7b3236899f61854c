//! SQLite storage implementation
//!
//! A single database file backs both the cache and the queues, so several
//! worker processes on one host can share state through it.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{CacheStore, Delivery, MessageQueue, StorageError, StorageResult};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// SQLite storage backend
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates the database file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Deletes cache entries whose TTL has passed, returning how many were removed
    pub fn purge_expired(&self) -> StorageResult<usize> {
        let conn = self.connection()?;
        let removed = conn.execute(
            "DELETE FROM cache_entries WHERE expires_at IS NOT NULL AND expires_at <= ?1",
            params![now_millis()],
        )?;
        Ok(removed)
    }

    fn connection(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn duration_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

#[async_trait]
impl CacheStore for SqliteStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let conn = self.connection()?;
        let value = conn
            .query_row(
                "SELECT value FROM cache_entries
                 WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                params![key, now_millis()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StorageResult<()> {
        let now = now_millis();
        let expires_at = ttl.map(|ttl| now.saturating_add(duration_millis(ttl)));
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO cache_entries (key, value, expires_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at,
                updated_at = excluded.updated_at",
            params![key, value, expires_at, now],
        )?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        let conn = self.connection()?;
        let removed = conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }

    async fn count_prefix(&self, prefix: &str) -> StorageResult<u64> {
        let conn = self.connection()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM cache_entries
             WHERE substr(key, 1, length(?1)) = ?1
               AND (expires_at IS NULL OR expires_at > ?2)",
            params![prefix, now_millis()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

#[async_trait]
impl MessageQueue for SqliteStore {
    async fn publish(&self, queue: &str, pattern: &str, payload: &str) -> StorageResult<i64> {
        let now = now_millis();
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO queue_messages (queue, pattern, payload, enqueued_at, visible_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![queue, pattern, payload, now],
        )?;
        Ok(conn.last_insert_rowid())
    }

    async fn lease(&self, queue: &str, lease: Duration) -> StorageResult<Option<Delivery>> {
        let now = now_millis();
        let mut conn = self.connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let next = tx
            .query_row(
                "SELECT id, pattern, payload, deliveries FROM queue_messages
                 WHERE queue = ?1 AND visible_at <= ?2
                 ORDER BY id
                 LIMIT 1",
                params![queue, now],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, u32>(3)?,
                    ))
                },
            )
            .optional()?;

        let delivery = match next {
            Some((id, pattern, payload, deliveries)) => {
                tx.execute(
                    "UPDATE queue_messages SET visible_at = ?1, deliveries = deliveries + 1
                     WHERE id = ?2",
                    params![now.saturating_add(duration_millis(lease)), id],
                )?;
                Some(Delivery {
                    id,
                    pattern,
                    payload,
                    deliveries: deliveries + 1,
                })
            }
            None => None,
        };

        tx.commit()?;
        Ok(delivery)
    }

    async fn ack(&self, id: i64) -> StorageResult<()> {
        let conn = self.connection()?;
        let removed = conn.execute("DELETE FROM queue_messages WHERE id = ?1", params![id])?;
        if removed == 0 {
            return Err(StorageError::MessageNotFound(id));
        }
        Ok(())
    }

    async fn depth(&self, queue: &str) -> StorageResult<u64> {
        let conn = self.connection()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM queue_messages WHERE queue = ?1",
            params![queue],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
