//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ScheduleStore trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ScheduleState, ScheduleStore, StorageError, StorageResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// SQLite schedule backend
pub struct SqliteScheduleStore {
    conn: Mutex<Connection>,
}

impl SqliteScheduleStore {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> StorageResult<T>) -> StorageResult<T> {
        let conn = self.conn.lock().map_err(|_| StorageError::LockPoisoned)?;
        f(&conn)
    }
}

impl ScheduleStore for SqliteScheduleStore {
    fn load(&self) -> StorageResult<ScheduleState> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT store_id, last_indexed_at FROM index_schedule")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;

            let mut state = ScheduleState::new();
            for row in rows {
                let (store_id, stamp) = row?;
                match parse_rfc3339(&stamp) {
                    Some(at) => {
                        state.insert(store_id, at);
                    }
                    None => tracing::warn!(
                        store = %store_id,
                        "Ignoring unparseable schedule timestamp '{}'",
                        stamp
                    ),
                }
            }
            Ok(state)
        })
    }

    fn last_indexed(&self, store_id: &str) -> StorageResult<Option<DateTime<Utc>>> {
        self.with_conn(|conn| {
            let stamp: Option<String> = conn
                .query_row(
                    "SELECT last_indexed_at FROM index_schedule WHERE store_id = ?1",
                    params![store_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(stamp.as_deref().and_then(parse_rfc3339))
        })
    }

    fn record(&self, store_id: &str, at: DateTime<Utc>) -> StorageResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO index_schedule (store_id, last_indexed_at) VALUES (?1, ?2)
                 ON CONFLICT(store_id) DO UPDATE SET last_indexed_at = excluded.last_indexed_at",
                params![store_id, at.to_rfc3339()],
            )?;
            Ok(())
        })
    }
}

fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|at| at.with_timezone(&Utc))
}
