//! Entry operations for the SQLite backend.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio_rusqlite::rusqlite::{self, ErrorCode, OptionalExtension, ffi, types::Type};
use tokio_rusqlite::params;

use super::connection::SqliteStore;
use super::{Entry, EntryStore, expiry_after};
use crate::error::StoreError;

/// Fixed-width UTC encoding: lexical order matches chronological order.
pub(crate) fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && (e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                    || e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE)
    )
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<Entry> {
    let created_at: String = row.get(2)?;
    let expires_at: String = row.get(3)?;
    Ok(Entry {
        id: row.get(0)?,
        content: row.get(1)?,
        created_at: decode_ts(2, &created_at)?,
        expires_at: decode_ts(3, &expires_at)?,
    })
}

/// Await a store operation, failing with `IO_FAILURE` once `limit` elapses.
async fn bounded<T>(
    limit: Duration, op: &'static str, fut: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(op, timeout_ms = limit.as_millis() as u64, "store operation timed out");
            Err(StoreError::Io(format!("{op} timed out after {}ms", limit.as_millis())))
        }
    }
}

#[async_trait]
impl EntryStore for SqliteStore {
    async fn create(&self, id: &str, content: &[u8], lifetime: Duration) -> Result<Entry, StoreError> {
        let created_at = self.clock.now();
        let expires_at = expiry_after(created_at, lifetime)?;
        let entry = Entry { id: id.to_string(), content: content.to_vec(), created_at, expires_at };

        // An expired row that the sweeper has not reached yet is replaced in
        // place; a live one leaves the statement with zero changes.
        let fut = self.conn.call(move |conn| -> Result<Entry, StoreError> {
            let inserted = conn.execute(
                "INSERT INTO entries (id, content, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                     content = excluded.content,
                     created_at = excluded.created_at,
                     expires_at = excluded.expires_at
                 WHERE entries.expires_at <= excluded.created_at",
                params![&entry.id, &entry.content, encode_ts(entry.created_at), encode_ts(entry.expires_at)],
            );

            match inserted {
                Ok(0) => Err(StoreError::DuplicateId(entry.id)),
                Ok(_) => Ok(entry),
                Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateId(entry.id)),
                Err(e) => Err(e.into()),
            }
        });

        bounded(self.op_timeout, "create", async { fut.await.map_err(StoreError::from) }).await
    }

    async fn get(&self, id: &str) -> Result<Option<Entry>, StoreError> {
        let id = id.to_string();
        let now = encode_ts(self.clock.now());

        let fut = self.conn.call(move |conn| -> Result<Option<Entry>, StoreError> {
            let mut stmt = conn.prepare_cached(
                "SELECT id, content, created_at, expires_at FROM entries
                 WHERE id = ?1 AND expires_at > ?2",
            )?;
            Ok(stmt.query_row(params![id, now], row_to_entry).optional()?)
        });

        bounded(self.op_timeout, "get", async { fut.await.map_err(StoreError::from) }).await
    }

    async fn delete_expired(&self) -> Result<u64, StoreError> {
        let now = encode_ts(self.clock.now());
        let batch = self.sweep_batch.max(1);

        let sweep = async {
            let mut removed = 0u64;
            loop {
                let now = now.clone();
                let count = self
                    .conn
                    .call(move |conn| -> Result<usize, StoreError> {
                        let mut stmt = conn.prepare_cached(
                            "DELETE FROM entries WHERE rowid IN (
                                 SELECT rowid FROM entries WHERE expires_at <= ?1 LIMIT ?2
                             )",
                        )?;
                        Ok(stmt.execute(params![now, batch as i64])?)
                    })
                    .await
                    .map_err(StoreError::from)?;

                removed += count as u64;
                if count < batch {
                    return Ok(removed);
                }
            }
        };

        bounded(self.sweep_timeout, "delete_expired", sweep).await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let id = id.to_string();

        let fut = self.conn.call(move |conn| -> Result<(), StoreError> {
            conn.execute("DELETE FROM entries WHERE id = ?1", params![id])?;
            Ok(())
        });

        bounded(self.op_timeout, "delete", async { fut.await.map_err(StoreError::from) }).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let fut = self
            .conn
            .call(|conn| conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)));

        bounded(self.op_timeout, "ping", async { fut.await.map(|_| ()).map_err(StoreError::from) }).await
    }
}
