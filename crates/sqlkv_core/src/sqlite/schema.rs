//! Record table layout and the statements run against it.
//!
//! ```text
//! <dir>/<name>.db
//! └─ kv_records (id INTEGER PK AUTOINCREMENT, key BLOB UNIQUE, value BLOB)
//!    └─ idx_kv_records_key (UNIQUE key)
//! ```
//!
//! Keys and values are stored as BLOBs, which SQLite compares bytewise, so
//! `ORDER BY key` matches the store's key order.

use crate::config::SqliteConfig;
use crate::error::{KvError, KvResult};
use rusqlite::Connection;
use std::path::Path;

/// File suffix of a store's backing database.
pub const DB_FILE_SUFFIX: &str = ".db";

/// Name of the record table.
pub const TABLE: &str = "kv_records";

/// Name of the unique index on `key`.
pub const KEY_INDEX: &str = "idx_kv_records_key";

const CREATE_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS kv_records (
        id    INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
        key   BLOB    NOT NULL,
        value BLOB    NOT NULL,
        UNIQUE (key)
    );
    CREATE UNIQUE INDEX IF NOT EXISTS idx_kv_records_key ON kv_records (key);
";

/// Insert, or overwrite the value of an existing key.
pub(crate) const UPSERT: &str = "
    INSERT INTO kv_records (key, value) VALUES (?1, ?2)
    ON CONFLICT (key) DO UPDATE SET value = excluded.value
";

pub(crate) const DELETE: &str = "DELETE FROM kv_records WHERE key = ?1";

/// Newest row wins should duplicates ever exist.
pub(crate) const SELECT_VALUE: &str =
    "SELECT value FROM kv_records WHERE key = ?1 ORDER BY id DESC LIMIT 1";

/// Opens a connection to `path` with the per-connection pragmas applied.
pub(crate) fn connect(path: &Path, config: &SqliteConfig) -> KvResult<Connection> {
    let conn =
        Connection::open(path).map_err(|e| KvError::storage("failed to open sqlite database", e))?;
    conn.busy_timeout(config.busy_timeout)
        .map_err(|e| KvError::storage("failed to set busy timeout", e))?;
    conn.pragma_update(None, "synchronous", config.synchronous.as_str())
        .map_err(|e| KvError::storage("failed to set synchronous level", e))?;
    Ok(conn)
}

/// Sets the journal mode and creates the table and index if missing.
pub(crate) fn ensure_schema(conn: &Connection, config: &SqliteConfig) -> KvResult<()> {
    let _mode: String = conn
        .pragma_update_and_check(None, "journal_mode", config.journal_mode.as_str(), |row| {
            row.get(0)
        })
        .map_err(|e| KvError::storage("failed to set journal mode", e))?;
    conn.execute_batch(CREATE_SCHEMA)
        .map_err(|e| KvError::storage("failed to create schema", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn schema_objects(conn: &Connection) -> Vec<(String, String)> {
        let mut stmt = conn
            .prepare("SELECT type, name FROM sqlite_master WHERE tbl_name = ?1 ORDER BY name")
            .unwrap();
        stmt.query_map([TABLE], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn ensure_schema_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(format!("test{DB_FILE_SUFFIX}"));
        let config = SqliteConfig::default();
        let conn = connect(&path, &config).unwrap();

        ensure_schema(&conn, &config).unwrap();
        let first = schema_objects(&conn);
        ensure_schema(&conn, &config).unwrap();
        assert_eq!(schema_objects(&conn), first);

        assert!(first.contains(&("table".to_string(), TABLE.to_string())));
        assert!(first.contains(&("index".to_string(), KEY_INDEX.to_string())));
    }

    #[test]
    fn upsert_keeps_one_row_per_key() {
        let dir = tempdir().unwrap();
        let config = SqliteConfig::default();
        let conn = connect(&dir.path().join("upsert.db"), &config).unwrap();
        ensure_schema(&conn, &config).unwrap();

        conn.execute(UPSERT, rusqlite::params![&b"k"[..], &b"v1"[..]]).unwrap();
        conn.execute(UPSERT, rusqlite::params![&b"k"[..], &b"v2"[..]]).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM kv_records", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        let value: Vec<u8> = conn.query_row(SELECT_VALUE, [&b"k"[..]], |row| row.get(0)).unwrap();
        assert_eq!(value, b"v2");
    }
}
