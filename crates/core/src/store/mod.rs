//! Durable storage for published entries.
//!
//! The [`EntryStore`] trait is the only seam the publication service and the
//! sweeper see. Two backends implement it:
//!
//! - [`SqliteStore`]: SQLite via tokio-rusqlite, WAL mode, versioned
//!   migrations, bounded per-operation timeouts
//! - [`MemoryStore`]: a concurrent map used as a test double
//!
//! Both apply the liveness filter (`expires_at > now`) inside the store, with
//! one `now` per operation.

pub mod connection;
pub mod entries;
pub mod memory;
pub mod migrations;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use crate::error::StoreError;

pub use connection::SqliteStore;
pub use memory::MemoryStore;

/// One stored blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: String,
    pub content: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Entry {
    /// Whether the entry is visible at `now`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// `created_at + lifetime`, or `IO_FAILURE` if that leaves chrono's range.
pub(crate) fn expiry_after(created_at: DateTime<Utc>, lifetime: Duration) -> Result<DateTime<Utc>, StoreError> {
    chrono::Duration::from_std(lifetime)
        .ok()
        .and_then(|step| created_at.checked_add_signed(step))
        .ok_or_else(|| StoreError::Io(format!("lifetime of {}s is out of range", lifetime.as_secs())))
}

/// Storage capability shared by the publication path and the sweeper.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Insert a new entry living for `lifetime`.
    ///
    /// `created_at` and `expires_at` come from a single clock reading, so
    /// `expires_at - created_at == lifetime` exactly. Fails with
    /// [`StoreError::DuplicateId`] when a live entry holds `id`; never
    /// overwrites one.
    async fn create(&self, id: &str, content: &[u8], lifetime: Duration) -> Result<Entry, StoreError>;

    /// Fetch a live entry. Expired and missing ids both yield `None`.
    async fn get(&self, id: &str) -> Result<Option<Entry>, StoreError>;

    /// Remove every entry with `expires_at <= now`, returning how many went.
    async fn delete_expired(&self) -> Result<u64, StoreError>;

    /// Remove an entry by id. Missing ids are not an error.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), StoreError>;
}
