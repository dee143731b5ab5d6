//! Durable subscription store.
//!
//! Maps opaque registration handles to [`SubscriptionRecord`]s in a single
//! SQLite table:
//!
//! ```text
//! subscribers(handle TEXT PRIMARY KEY, record TEXT NOT NULL)  -- record is JSON
//! ```
//!
//! Every `put`/`get` runs in its own transaction behind a mutex, so
//! concurrent writers serialize and readers never see a partial row.
//! Methods block; async callers should go through `spawn_blocking`.

// Rust guideline compliant 2026-02

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};

use crate::notifications::SubscriptionRecord;

/// How long a writer waits on a lock held by another process.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Subscription store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record under the requested handle.
    #[error("subscription not found")]
    NotFound,
    /// The database could not be opened, read or written.
    #[error("subscription store failure: {0}")]
    Storage(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Persistent handle → subscription mapping.
#[derive(Debug)]
pub struct SubscriptionStore {
    /// `None` once [`SubscriptionStore::close`] has run.
    connection: Mutex<Option<Connection>>,
}

impl SubscriptionStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Storage(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let connection = Connection::open(path)?;
        connection.busy_timeout(BUSY_TIMEOUT)?;
        connection.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = FULL;")?;
        Self::from_connection(connection)
    }

    /// In-memory store, for tests and dry runs.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut connection: Connection) -> Result<Self, StoreError> {
        let tx = connection.transaction()?;
        tx.execute(
            "CREATE TABLE IF NOT EXISTS subscribers (
                handle TEXT PRIMARY KEY NOT NULL,
                record TEXT NOT NULL
            )",
            [],
        )?;
        tx.commit()?;

        Ok(Self {
            connection: Mutex::new(Some(connection)),
        })
    }

    fn with_connection<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self
            .connection
            .lock()
            .map_err(|e| StoreError::Storage(format!("store mutex poisoned: {e}")))?;
        let connection = guard
            .as_mut()
            .ok_or_else(|| StoreError::Storage("store is closed".to_string()))?;
        f(connection)
    }

    /// Insert or overwrite the record under `handle`.
    pub fn put(&self, handle: &str, record: &SubscriptionRecord) -> Result<(), StoreError> {
        let data = serde_json::to_string(record)
            .map_err(|e| StoreError::Storage(format!("failed to encode subscription: {e}")))?;

        self.with_connection(|connection| {
            let tx = connection.transaction()?;
            tx.execute(
                "INSERT INTO subscribers (handle, record) VALUES (?1, ?2)
                 ON CONFLICT(handle) DO UPDATE SET record = excluded.record",
                params![handle, data],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Fetch the record stored under exactly `handle`.
    pub fn get(&self, handle: &str) -> Result<SubscriptionRecord, StoreError> {
        let data: String = self.with_connection(|connection| {
            let tx = connection.transaction()?;
            let data = tx
                .query_row(
                    "SELECT record FROM subscribers WHERE handle = ?1",
                    params![handle],
                    |row| row.get(0),
                )
                .optional()?;
            tx.commit()?;
            data.ok_or(StoreError::NotFound)
        })?;

        serde_json::from_str(&data)
            .map_err(|e| StoreError::Storage(format!("stored subscription is unreadable: {e}")))
    }

    /// Number of stored records.
    pub fn len(&self) -> Result<usize, StoreError> {
        self.with_connection(|connection| {
            let count: i64 =
                connection.query_row("SELECT COUNT(*) FROM subscribers", [], |row| row.get(0))?;
            usize::try_from(count).map_err(|e| StoreError::Storage(e.to_string()))
        })
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Flush and release the database. Later calls fail with
    /// [`StoreError::Storage`]. Closing twice is a no-op.
    pub fn close(&self) -> Result<(), StoreError> {
        let mut guard = self
            .connection
            .lock()
            .map_err(|e| StoreError::Storage(format!("store mutex poisoned: {e}")))?;
        if let Some(connection) = guard.take() {
            connection.close().map_err(|(_, e)| StoreError::from(e))?;
            log::info!("Subscription store closed");
        }
        Ok(())
    }
}
