//! SQLite-backed store.

use super::batch::SqliteBatch;
use super::iterator::{SqliteIterator, SqlitePageSource};
use super::schema::{self, DB_FILE_SUFFIX};
use crate::config::SqliteConfig;
use crate::error::{check_key, check_value, KvError, KvResult};
use crate::iterator::{RangeIterator, ScanRange};
use crate::kv::{KvBatch, KvIterator, KvStore};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// State shared by a store and the batches and iterators it hands out.
#[derive(Debug)]
pub(crate) struct Shared {
    path: PathBuf,
    config: SqliteConfig,
    /// `None` once the store is closed.
    conn: Mutex<Option<Connection>>,
}

impl Shared {
    /// Runs `f` against the store connection.
    ///
    /// Fails with [`KvError::StoreClosed`] after the store is closed.
    pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> KvResult<T>) -> KvResult<T> {
        let guard = self.conn.lock();
        let conn = guard.as_ref().ok_or(KvError::StoreClosed)?;
        f(conn)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.conn.lock().is_none()
    }

    /// Opens an additional connection to the same database file.
    pub(crate) fn connect(&self) -> KvResult<Connection> {
        if self.is_closed() {
            return Err(KvError::StoreClosed);
        }
        schema::connect(&self.path, &self.config)
    }

    pub(crate) fn config(&self) -> &SqliteConfig {
        &self.config
    }
}

/// An ordered key-value store kept in a single SQLite table.
///
/// Point operations run on one shared connection guarded by a mutex, so the
/// store is `Send + Sync` and may be shared across threads. Each batch runs
/// its transaction on a connection of its own.
///
/// # Example
///
/// ```rust
/// use sqlkv_core::{KvStore, SqliteStore};
///
/// let dir = tempfile::tempdir().unwrap();
/// let store = SqliteStore::open("state", dir.path()).unwrap();
///
/// store.set(b"alpha", Some(b"1")).unwrap();
/// assert_eq!(store.get(b"alpha").unwrap(), Some(b"1".to_vec()));
///
/// store.close().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct SqliteStore {
    shared: Arc<Shared>,
}

impl SqliteStore {
    /// Opens or creates the store `<dir>/<name>.db` with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the database
    /// cannot be opened or initialized.
    pub fn open(name: &str, dir: &Path) -> KvResult<Self> {
        Self::open_with_config(name, dir, SqliteConfig::default())
    }

    /// Opens or creates the store `<dir>/<name>.db`.
    ///
    /// Creating the schema is idempotent; reopening an existing store keeps
    /// its records.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory is missing and `create_dir` is false,
    /// or if the database cannot be opened or initialized.
    pub fn open_with_config(name: &str, dir: &Path, config: SqliteConfig) -> KvResult<Self> {
        if config.create_dir {
            std::fs::create_dir_all(dir).map_err(|e| {
                KvError::io(
                    format!("failed to create store directory '{}'", dir.display()),
                    e,
                )
            })?;
        } else if !dir.is_dir() {
            return Err(KvError::io(
                format!("store directory '{}' does not exist", dir.display()),
                std::io::ErrorKind::NotFound.into(),
            ));
        }

        let path = dir.join(format!("{name}{DB_FILE_SUFFIX}"));
        let conn = schema::connect(&path, &config)?;
        schema::ensure_schema(&conn, &config)?;
        debug!(path = %path.display(), "opened sqlite store");

        Ok(Self {
            shared: Arc::new(Shared {
                path,
                config,
                conn: Mutex::new(Some(conn)),
            }),
        })
    }

    /// Returns the path of the backing database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    /// Returns whether the store has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Opens a new batch with its own transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or the transaction cannot begin.
    pub fn batch(&self) -> KvResult<SqliteBatch> {
        SqliteBatch::begin(Arc::clone(&self.shared))
    }

    /// Returns a typed iterator over `[start, end)`.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::EmptyKey`] for an empty bound, or a storage error
    /// if the first page cannot be read.
    pub fn range(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        reverse: bool,
    ) -> KvResult<SqliteIterator> {
        let range = ScanRange::new(start, end, reverse)?;
        debug!(
            start = start.is_some(),
            end = end.is_some(),
            reverse,
            "opening sqlite iterator"
        );
        let source = SqlitePageSource::new(Arc::clone(&self.shared));
        RangeIterator::new(source, range, self.shared.config().iterator_page_size)
    }
}

impl KvStore for SqliteStore {
    fn get(&self, key: &[u8]) -> KvResult<Option<Vec<u8>>> {
        check_key(key)?;
        self.shared.with_conn(|conn| {
            let mut stmt = conn
                .prepare_cached(schema::SELECT_VALUE)
                .map_err(|e| KvError::storage("failed to prepare get statement", e))?;
            stmt.query_row([key], |row| row.get(0))
                .optional()
                .map_err(|e| KvError::storage("failed to query row", e))
        })
    }

    fn set(&self, key: &[u8], value: Option<&[u8]>) -> KvResult<()> {
        check_key(key)?;
        let value = check_value(value)?;
        self.shared.with_conn(|conn| {
            conn.prepare_cached(schema::UPSERT)
                .and_then(|mut stmt| stmt.execute([key, value]))
                .map_err(|e| KvError::storage("failed to execute upsert statement", e))?;
            Ok(())
        })
    }

    fn delete(&self, key: &[u8]) -> KvResult<()> {
        check_key(key)?;
        self.shared.with_conn(|conn| {
            conn.prepare_cached(schema::DELETE)
                .and_then(|mut stmt| stmt.execute([key]))
                .map_err(|e| KvError::storage("failed to execute delete statement", e))?;
            Ok(())
        })
    }

    fn close(&self) -> KvResult<()> {
        let conn = self.shared.conn.lock().take();
        if let Some(conn) = conn {
            conn.close()
                .map_err(|(_, e)| KvError::storage("failed to close sqlite store", e))?;
            debug!(path = %self.shared.path.display(), "closed sqlite store");
        }
        Ok(())
    }

    fn iterator(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> KvResult<Box<dyn KvIterator>> {
        Ok(Box::new(self.range(start, end, false)?))
    }

    fn reverse_iterator(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> KvResult<Box<dyn KvIterator>> {
        Ok(Box::new(self.range(start, end, true)?))
    }

    fn new_batch(&self) -> KvResult<Box<dyn KvBatch>> {
        Ok(Box::new(self.batch()?))
    }
}
