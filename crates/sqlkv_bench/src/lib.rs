//! Benchmark utilities.

#![warn(missing_docs)]

use rand::Rng;
use sqlkv_core::{KvBatch, KvStore, SqliteConfig, SqliteStore};
use tempfile::TempDir;

/// Generate random value bytes of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Fixed-width big-endian key for index `i`; keys sort in index order.
pub fn key_for(i: u64) -> Vec<u8> {
    let mut key = b"k".to_vec();
    key.extend_from_slice(&i.to_be_bytes());
    key
}

/// Generate `count` sequential keys paired with random values.
pub fn generate_entries(count: u64, value_size: usize) -> Vec<(Vec<u8>, Vec<u8>)> {
    (0..count).map(|i| (key_for(i), random_data(value_size))).collect()
}

/// Opens a SQLite store in a fresh temporary directory.
pub fn temp_store(config: SqliteConfig) -> (TempDir, SqliteStore) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let store =
        SqliteStore::open_with_config("bench", dir.path(), config).expect("Failed to open store");
    (dir, store)
}

/// Writes `entries` into `store` through a single batch.
pub fn load(store: &dyn KvStore, entries: &[(Vec<u8>, Vec<u8>)]) {
    let mut batch = store.new_batch().expect("Failed to open batch");
    for (key, value) in entries {
        batch.set(key, Some(value)).expect("Failed to buffer entry");
    }
    batch.write().expect("Failed to write batch");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_sort_numerically() {
        assert!(key_for(255) < key_for(256));
        assert_eq!(key_for(0).len(), 9);
    }

    #[test]
    fn load_writes_every_entry() {
        let (_dir, store) = temp_store(SqliteConfig::default());
        let entries = generate_entries(20, 8);
        load(&store, &entries);
        for (key, value) in &entries {
            assert_eq!(store.get(key).unwrap().as_ref(), Some(value));
        }
    }
}
