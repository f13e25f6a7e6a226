//! Database schema definitions
//!
//! This module contains the SQL schema for the SQLite schedule backend.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Last completed indexing run per destination store
CREATE TABLE IF NOT EXISTS index_schedule (
    store_id TEXT PRIMARY KEY,
    last_indexed_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
