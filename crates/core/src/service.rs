//! Publication service: the write and read paths over an [`EntryStore`].
//!
//! `publish` validates content, resolves the lifetime, then allocates an id
//! and persists it, retrying only on identifier collisions. `retrieve`
//! collapses malformed, missing and expired ids into a single "absent"
//! outcome.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{Error, StoreError};
use crate::expiry::{self, Lifetime};
use crate::id::{self, IdAllocator, RandomIds};
use crate::store::EntryStore;

/// Limits applied on the write path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishPolicy {
    pub max_content_bytes: usize,
    pub default_lifetime: Lifetime,
    pub min_lifetime: Lifetime,
    pub max_lifetime: Lifetime,
    /// Allocation attempts before giving up with `ALLOCATION_EXHAUSTED`.
    pub max_attempts: u32,
}

impl Default for PublishPolicy {
    fn default() -> Self {
        Self {
            max_content_bytes: 1024 * 1024,
            default_lifetime: Lifetime::days(3),
            min_lifetime: Lifetime::minutes(10),
            max_lifetime: Lifetime::days(30),
            max_attempts: 3,
        }
    }
}

/// A successfully persisted entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub id: String,
    pub expires_at: DateTime<Utc>,
}

/// Write and read operations on published entries.
#[derive(Clone)]
pub struct Publisher {
    store: Arc<dyn EntryStore>,
    ids: Arc<dyn IdAllocator>,
    policy: PublishPolicy,
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher").field("policy", &self.policy).finish_non_exhaustive()
    }
}

impl Publisher {
    pub fn new(store: Arc<dyn EntryStore>, policy: PublishPolicy) -> Self {
        Self { store, ids: Arc::new(RandomIds), policy }
    }

    /// Replace the identifier source.
    pub fn with_ids(mut self, ids: Arc<dyn IdAllocator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn store(&self) -> &Arc<dyn EntryStore> {
        &self.store
    }

    /// Resolve requested expiry text to a bounded lifetime.
    ///
    /// Absent or empty text selects the default lifetime. Anything else must
    /// match the grammar exactly, surrounding whitespace included.
    pub fn resolve_lifetime(&self, expiry_text: Option<&str>) -> Result<Duration, Error> {
        let lifetime = match expiry_text {
            None | Some("") => self.policy.default_lifetime.as_duration(),
            Some(text) => expiry::parse(text)?,
        };
        expiry::validate(lifetime, self.policy.min_lifetime.as_duration(), self.policy.max_lifetime.as_duration())?;
        Ok(lifetime)
    }

    /// Persist `content` under a fresh identifier.
    pub async fn publish(&self, content: &[u8], expiry_text: Option<&str>) -> Result<Published, Error> {
        if content.is_empty() {
            return Err(Error::EmptyContent);
        }
        if content.len() > self.policy.max_content_bytes {
            return Err(Error::ContentTooLarge { size: content.len(), max: self.policy.max_content_bytes });
        }

        let lifetime = self.resolve_lifetime(expiry_text)?;

        for attempt in 1..=self.policy.max_attempts {
            let id = self.ids.allocate();
            match self.store.create(&id, content, lifetime).await {
                Ok(entry) => {
                    tracing::info!(
                        id = %entry.id,
                        size_bytes = content.len(),
                        expires_at = %entry.expires_at,
                        attempt,
                        "entry published"
                    );
                    return Ok(Published { id: entry.id, expires_at: entry.expires_at });
                }
                Err(StoreError::DuplicateId(_)) => {
                    tracing::warn!(attempt, "identifier collision, retrying");
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to persist entry");
                    return Err(Error::Storage(e));
                }
            }
        }

        tracing::error!(attempts = self.policy.max_attempts, "identifier allocation exhausted");
        Err(Error::AllocationExhausted(self.policy.max_attempts))
    }

    /// Fetch live content. Malformed, unknown and expired ids are all `None`.
    pub async fn retrieve(&self, id: &str) -> Result<Option<Vec<u8>>, Error> {
        if !id::is_well_formed(id) {
            return Ok(None);
        }
        let entry = self.store.get(id).await?;
        Ok(entry.map(|entry| entry.content))
    }

    /// Delete an entry before it expires. Unknown ids are a no-op.
    pub async fn remove(&self, id: &str) -> Result<(), Error> {
        if !id::is_well_formed(id) {
            return Ok(());
        }
        self.store.delete(id).await?;
        tracing::info!(id, "entry removed");
        Ok(())
    }
}
