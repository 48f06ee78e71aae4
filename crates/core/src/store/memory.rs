//! In-process entry store.
//!
//! Honours the same contract as [`SqliteStore`](super::SqliteStore) without
//! any persistence. Used as a test double and for throwaway deployments.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;

use super::{Entry, EntryStore, expiry_after};
use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;

/// Entries kept in a sharded concurrent map.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { entries: Arc::new(DashMap::new()), clock }
    }

    /// Number of rows held, live or not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn create(&self, id: &str, content: &[u8], lifetime: Duration) -> Result<Entry, StoreError> {
        let now = self.clock.now();
        let expires_at = expiry_after(now, lifetime)?;
        if expires_at <= now {
            return Err(StoreError::Io(format!("expiry {expires_at} is not after creation time {now}")));
        }

        let entry = Entry { id: id.to_string(), content: content.to_vec(), created_at: now, expires_at };

        match self.entries.entry(id.to_string()) {
            MapEntry::Occupied(existing) if existing.get().is_live_at(now) => {
                Err(StoreError::DuplicateId(id.to_string()))
            }
            MapEntry::Occupied(mut stale) => {
                stale.insert(entry.clone());
                Ok(entry)
            }
            MapEntry::Vacant(slot) => {
                slot.insert(entry.clone());
                Ok(entry)
            }
        }
    }

    async fn get(&self, id: &str) -> Result<Option<Entry>, StoreError> {
        let now = self.clock.now();
        Ok(self
            .entries
            .get(id)
            .filter(|entry| entry.is_live_at(now))
            .map(|entry| entry.value().clone()))
    }

    async fn delete_expired(&self) -> Result<u64, StoreError> {
        let now = self.clock.now();
        let mut removed = 0u64;
        self.entries.retain(|_, entry| {
            let keep = entry.is_live_at(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.entries.remove(id);
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[tokio::test]
    async fn test_memory_store_contract() {
        let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
        let store = MemoryStore::with_clock(clock.clone());
        let ten_minutes = Duration::from_secs(600);

        store.create("memory000001", b"hello", ten_minutes).await.unwrap();
        assert!(matches!(
            store.create("memory000001", b"again", ten_minutes).await,
            Err(StoreError::DuplicateId(_))
        ));
        assert_eq!(store.get("memory000001").await.unwrap().unwrap().content, b"hello");

        clock.advance(Duration::from_secs(600));
        assert!(store.get("memory000001").await.unwrap().is_none());
        assert_eq!(store.len(), 1);

        assert_eq!(store.delete_expired().await.unwrap(), 1);
        assert_eq!(store.delete_expired().await.unwrap(), 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_reuses_expired_id() {
        let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
        let store = MemoryStore::with_clock(clock.clone());

        store
            .create("memory000002", b"old", Duration::from_secs(600))
            .await
            .unwrap();
        clock.advance(Duration::from_secs(601));

        let entry = store
            .create("memory000002", b"new", Duration::from_secs(600))
            .await
            .unwrap();
        assert_eq!(entry.content, b"new");
    }

    #[tokio::test]
    async fn test_memory_store_delete() {
        let store = MemoryStore::new();
        store
            .create("memory000003", b"x", Duration::from_secs(3600))
            .await
            .unwrap();
        store.delete("memory000003").await.unwrap();
        store.delete("memory000003").await.unwrap();
        assert!(store.get("memory000003").await.unwrap().is_none());
    }
}
