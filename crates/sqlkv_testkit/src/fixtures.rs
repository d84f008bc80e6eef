//! Test fixtures and store helpers.
//!
//! Provides convenience functions for setting up test stores
//! and common test scenarios.

use rusqlite::Connection;
use sqlkv_core::{MemStore, SqliteConfig, SqliteStore, KEY_INDEX, TABLE};
use std::path::Path;
use tempfile::TempDir;

/// Name every fixture store is opened under.
pub const TEST_STORE_NAME: &str = "test";

/// A SQLite store in a temporary directory that is removed on drop.
pub struct TestStore {
    /// The store instance.
    pub store: SqliteStore,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: TempDir,
}

impl TestStore {
    /// Creates a store with the default configuration.
    pub fn new() -> Self {
        Self::with_config(SqliteConfig::default())
    }

    /// Creates a store with the given configuration.
    pub fn with_config(config: SqliteConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = SqliteStore::open_with_config(TEST_STORE_NAME, temp_dir.path(), config)
            .expect("Failed to open test store");
        Self { store, temp_dir }
    }

    /// Returns the directory holding the database file.
    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Opens a second, independent handle on the same database file.
    pub fn reopen(&self) -> SqliteStore {
        SqliteStore::open(TEST_STORE_NAME, self.dir()).expect("Failed to reopen test store")
    }

    /// Opens a plain connection to the database file, bypassing the store.
    pub fn raw_connection(&self) -> Connection {
        Connection::open(self.store.path()).expect("Failed to open raw connection")
    }

    /// Makes every insert of `key` fail inside the engine.
    ///
    /// Useful for forcing a batch to fail halfway through its write.
    pub fn poison_key(&self, key: &[u8]) {
        let hex = sqlkv_core::to_hex(key);
        self.raw_connection()
            .execute_batch(&format!(
                "CREATE TRIGGER IF NOT EXISTS poison_{hex} BEFORE INSERT ON {TABLE}
                 WHEN NEW.key = X'{hex}'
                 BEGIN SELECT RAISE(ABORT, 'poisoned key'); END;"
            ))
            .expect("Failed to install poison trigger");
    }

    /// Returns the number of physical rows in the record table.
    pub fn row_count(&self) -> usize {
        let count: i64 = self
            .raw_connection()
            .query_row(&format!("SELECT COUNT(*) FROM {TABLE}"), [], |row| row.get(0))
            .expect("Failed to count rows");
        usize::try_from(count).expect("Row count out of range")
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestStore {
    type Target = SqliteStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with a temporary SQLite store.
///
/// # Example
///
/// ```rust
/// use sqlkv_core::KvStore;
/// use sqlkv_testkit::with_temp_store;
///
/// with_temp_store(|store| {
///     store.set(b"k", Some(b"v")).unwrap();
/// });
/// ```
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&SqliteStore) -> R,
{
    let test_store = TestStore::new();
    f(&test_store.store)
}

/// Runs a test with a fresh in-memory store.
pub fn with_mem_store<F, R>(f: F) -> R
where
    F: FnOnce(&MemStore) -> R,
{
    let store = MemStore::new();
    f(&store)
}

/// Deterministic key of the `i`-th fixture entry. Sorts in index order.
pub fn entry_key(i: usize) -> Vec<u8> {
    format!("key-{i:06}").into_bytes()
}

/// Deterministic value of the `i`-th fixture entry.
pub fn entry_value(i: usize) -> Vec<u8> {
    format!("value-{i}").into_bytes()
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use sqlkv_core::KvBatch;

    /// Creates a store holding `count` entries built by [`entry_key`] and
    /// [`entry_value`].
    pub fn populated_store(count: usize) -> TestStore {
        populated_store_with_config(count, SqliteConfig::default())
    }

    /// Same as [`populated_store`] with a custom configuration.
    pub fn populated_store_with_config(count: usize, config: SqliteConfig) -> TestStore {
        let test_store = TestStore::with_config(config);
        let mut batch = test_store.store.batch().expect("Failed to open batch");
        for i in 0..count {
            batch
                .set(&entry_key(i), Some(&entry_value(i)))
                .expect("Failed to buffer entry");
        }
        batch.write().expect("Failed to write entries");
        test_store
    }

    /// Creates a store whose record table allows a key to appear in more
    /// than one row, then inserts `rows` verbatim in order.
    ///
    /// Later rows for a key are newer and must win on reads.
    pub fn store_with_duplicates(rows: &[(&[u8], &[u8])], config: SqliteConfig) -> TestStore {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir
            .path()
            .join(format!("{TEST_STORE_NAME}{}", sqlkv_core::DB_FILE_SUFFIX));

        // Pre-create the table without the uniqueness constraint so the
        // store's schema setup keeps it.
        Connection::open(&path)
            .expect("Failed to open raw connection")
            .execute_batch(&format!(
                "CREATE TABLE {TABLE} (
                    id    INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
                    key   BLOB    NOT NULL,
                    value BLOB    NOT NULL
                );"
            ))
            .expect("Failed to create loose table");

        let store = SqliteStore::open_with_config(TEST_STORE_NAME, temp_dir.path(), config)
            .expect("Failed to open test store");
        let test_store = TestStore { store, temp_dir };

        let raw = test_store.raw_connection();
        raw.execute_batch(&format!("DROP INDEX IF EXISTS {KEY_INDEX}"))
            .expect("Failed to drop key index");
        for (key, value) in rows {
            raw.execute(
                &format!("INSERT INTO {TABLE} (key, value) VALUES (?1, ?2)"),
                [key, value],
            )
            .expect("Failed to insert raw row");
        }
        test_store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlkv_core::{KvBatch, KvError, KvIterator, KvStore};

    #[test]
    fn test_store_cleans_up_directory() {
        let dir = {
            let test_store = TestStore::new();
            assert!(test_store.path().exists());
            test_store.dir().to_path_buf()
        };
        assert!(!dir.exists());
    }

    #[test]
    fn test_with_temp_store() {
        with_temp_store(|store| {
            store.set(b"k", Some(b"v")).unwrap();
            assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));
        });
    }

    #[test]
    fn test_with_mem_store() {
        let keys = with_mem_store(|store| {
            store.set(b"b", Some(b"2")).unwrap();
            store.set(b"a", Some(b"")).unwrap();
            assert_eq!(store.get(b"a").unwrap(), Some(Vec::new()));
            let mut itr = store.iterator(None, None).unwrap();
            let mut keys = Vec::new();
            while itr.valid() {
                keys.push(itr.key());
                itr.next();
            }
            itr.close().unwrap();
            keys
        });
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn test_populated_scenario() {
        let test_store = scenarios::populated_store(10);
        assert_eq!(test_store.row_count(), 10);
        assert_eq!(test_store.get(&entry_key(3)).unwrap(), Some(entry_value(3)));
    }

    #[test]
    fn test_reopen_sees_data() {
        let test_store = scenarios::populated_store(3);
        let other = test_store.reopen();
        assert_eq!(other.get(&entry_key(2)).unwrap(), Some(entry_value(2)));
        other.close().unwrap();
    }

    #[test]
    fn end_to_end_example() {
        with_temp_store(|store| {
            store.set(&[1, 2, 4], Some(&[1, 1, 1])).unwrap();
            assert_eq!(store.get(&[1, 2, 4]).unwrap(), Some(vec![1, 1, 1]));

            store.delete(&[1, 2, 4]).unwrap();
            assert_eq!(store.get(&[1, 2, 4]).unwrap(), None);

            let mut batch = store.new_batch().unwrap();
            batch.set(&[1, 2, 3], Some(&[2, 2, 2])).unwrap();
            batch.write().unwrap();
            batch.close().unwrap();
            assert_eq!(store.get(&[1, 2, 3]).unwrap(), Some(vec![2, 2, 2]));
        });
    }

    #[test]
    fn poisoned_batch_rolls_back_entirely() {
        let test_store = TestStore::new();
        test_store.set(b"keep", Some(b"old")).unwrap();
        test_store.poison_key(b"bad");

        let mut batch = test_store.new_batch().unwrap();
        batch.set(b"keep", Some(b"new")).unwrap();
        batch.set(b"a", Some(b"1")).unwrap();
        batch.set(b"bad", Some(b"x")).unwrap();
        batch.delete(b"keep").unwrap();

        assert!(matches!(batch.write(), Err(KvError::Storage { .. })));
        batch.close().unwrap();

        assert_eq!(test_store.get(b"keep").unwrap(), Some(b"old".to_vec()));
        assert_eq!(test_store.get(b"a").unwrap(), None);
        assert_eq!(test_store.row_count(), 1);
    }

    #[test]
    fn duplicate_rows_resolve_to_newest() {
        let rows: [(&[u8], &[u8]); 4] = [(b"a", b"1"), (b"k", b"old"), (b"k", b"new"), (b"z", b"2")];
        let test_store = scenarios::store_with_duplicates(&rows, SqliteConfig::default());
        assert_eq!(test_store.row_count(), 4);
        assert_eq!(test_store.get(b"k").unwrap(), Some(b"new".to_vec()));

        let mut itr = test_store.iterator(None, None).unwrap();
        let mut seen = Vec::new();
        while itr.valid() {
            seen.push((itr.key(), itr.value()));
            itr.next();
        }
        itr.close().unwrap();
        assert_eq!(
            seen,
            vec![
                (b"a".to_vec(), b"1".to_vec()),
                (b"k".to_vec(), b"new".to_vec()),
                (b"z".to_vec(), b"2".to_vec()),
            ]
        );
    }

    #[test]
    fn entry_keys_sort_in_index_order() {
        assert!(entry_key(9) < entry_key(10));
        assert!(entry_key(99_999) < entry_key(100_000));
    }
}
