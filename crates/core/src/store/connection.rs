//! Database connection management with pragma configuration.
//!
//! This module handles opening the SQLite database, applying required pragmas
//! for durability and concurrency (WAL mode), and running migrations.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio_rusqlite::Connection;

use super::migrations;
use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;

/// Default bound on a single read or write.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(5);

/// Default bound on a bulk eviction.
pub const DEFAULT_SWEEP_TIMEOUT: Duration = Duration::from_secs(30);

/// Rows removed per eviction statement.
pub const DEFAULT_SWEEP_BATCH: usize = 1000;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA busy_timeout=5000;";

/// SQLite-backed entry store.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread. Cloning shares the connection. Calls are queued
/// in order, so eviction is split into batches that reads can slot between.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pub(crate) conn: Connection,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) op_timeout: Duration,
    pub(crate) sweep_timeout: Duration,
    pub(crate) sweep_batch: usize,
}

impl SqliteStore {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies pragmas,
    /// and runs any pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| StoreError::Io(format!("failed to open database: {e}")))?;
        Self::prepare(conn).await
    }

    /// Open an in-memory database for testing.
    ///
    /// Same pragma configuration and schema as file-based databases.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| StoreError::Io(format!("failed to open database: {e}")))?;
        Self::prepare(conn).await
    }

    async fn prepare(conn: Connection) -> Result<Self, StoreError> {
        conn.call(|conn| conn.execute_batch(PRAGMAS))
            .await
            .map_err(StoreError::from)?;

        migrations::run(&conn).await?;

        Ok(Self {
            conn,
            clock: Arc::new(SystemClock),
            op_timeout: DEFAULT_OP_TIMEOUT,
            sweep_timeout: DEFAULT_SWEEP_TIMEOUT,
            sweep_batch: DEFAULT_SWEEP_BATCH,
        })
    }

    /// Replace the time source used for `created_at` and liveness checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Bound single-entry operations and bulk eviction separately.
    pub fn with_timeouts(mut self, op_timeout: Duration, sweep_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self.sweep_timeout = sweep_timeout;
        self
    }
}
