//! In-memory storage implementation
//!
//! Used by tests and by the `inspect` command; nothing survives the process.

use crate::storage::traits::{CacheStore, Delivery, MessageQueue, StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// In-memory cache honouring TTLs
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all live keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(Instant::now()))
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StorageResult<()> {
        let expires_at = ttl.and_then(|ttl| Instant::now().checked_add(ttl));
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        Ok(entries.remove(key).is_some())
    }

    async fn count_prefix(&self, prefix: &str) -> StorageResult<u64> {
        let now = Instant::now();
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries
            .iter()
            .filter(|(key, entry)| key.starts_with(prefix) && entry.is_live(now))
            .count() as u64)
    }
}

#[derive(Debug, Clone)]
struct StoredMessage {
    queue: String,
    pattern: String,
    payload: String,
    visible_at: Instant,
    deliveries: u32,
}

#[derive(Debug, Default)]
struct QueueState {
    next_id: i64,
    messages: BTreeMap<i64, StoredMessage>,
}

/// In-memory queue with the same lease/ack semantics as the SQLite one
#[derive(Debug, Default)]
pub struct MemoryQueue {
    state: RwLock<QueueState>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every message of a queue in publish order without leasing it
    pub fn peek_all(&self, queue: &str) -> Vec<Delivery> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state
            .messages
            .iter()
            .filter(|(_, message)| message.queue == queue)
            .map(|(id, message)| Delivery {
                id: *id,
                pattern: message.pattern.clone(),
                payload: message.payload.clone(),
                deliveries: message.deliveries,
            })
            .collect()
    }
}

#[async_trait]
impl MessageQueue for MemoryQueue {
    async fn publish(&self, queue: &str, pattern: &str, payload: &str) -> StorageResult<i64> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.next_id += 1;
        let id = state.next_id;
        state.messages.insert(
            id,
            StoredMessage {
                queue: queue.to_string(),
                pattern: pattern.to_string(),
                payload: payload.to_string(),
                visible_at: Instant::now(),
                deliveries: 0,
            },
        );
        Ok(id)
    }

    async fn lease(&self, queue: &str, lease: Duration) -> StorageResult<Option<Delivery>> {
        let now = Instant::now();
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());

        let next = state
            .messages
            .iter_mut()
            .find(|(_, message)| message.queue == queue && message.visible_at <= now);

        Ok(next.map(|(id, message)| {
            message.visible_at = now.checked_add(lease).unwrap_or(now);
            message.deliveries += 1;
            Delivery {
                id: *id,
                pattern: message.pattern.clone(),
                payload: message.payload.clone(),
                deliveries: message.deliveries,
            }
        }))
    }

    async fn ack(&self, id: i64) -> StorageResult<()> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state
            .messages
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::MessageNotFound(id))
    }

    async fn depth(&self, queue: &str) -> StorageResult<u64> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        Ok(state
            .messages
            .values()
            .filter(|message| message.queue == queue)
            .count() as u64)
    }
}
