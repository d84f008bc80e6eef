//! # sqlkv core
//!
//! An ordered key-value store over a SQLite table.
//!
//! This crate provides:
//! - The [`KvStore`], [`KvBatch`] and [`KvIterator`] contract
//! - [`SqliteStore`], which keeps each store in one database file
//! - [`MemStore`], an in-memory backend with the same contract
//! - [`BackendRegistry`], which opens stores by backend kind
//!
//! ## Example
//!
//! ```rust
//! use sqlkv_core::{KvBatch, KvIterator, KvStore, SqliteStore};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store = SqliteStore::open("demo", dir.path()).unwrap();
//!
//! let mut batch = store.new_batch().unwrap();
//! batch.set(b"a", Some(b"1")).unwrap();
//! batch.set(b"b", Some(b"2")).unwrap();
//! batch.write().unwrap();
//!
//! let mut itr = store.reverse_iterator(None, None).unwrap();
//! assert_eq!(itr.key(), b"b");
//! itr.next();
//! assert_eq!(itr.key(), b"a");
//! itr.close().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod batch;
mod config;
mod error;
mod iterator;
mod kv;
mod memory;
mod options;
mod registry;
mod sqlite;

pub use batch::BatchOp;
pub use config::{JournalMode, SqliteConfig, Synchronous};
pub use error::{KvError, KvResult};
pub use iterator::{Entry, PageSource, RangeIterator, ScanRange};
pub use kv::{to_hex, KvBatch, KvIterator, KvStore};
pub use memory::{MemBatch, MemIterator, MemPageSource, MemStore};
pub use options::Options;
pub use registry::{BackendRegistry, StoreConstructor, MEMORY_BACKEND, SQLITE_BACKEND};
pub use sqlite::{
    SqliteBatch, SqliteIterator, SqlitePageSource, SqliteStore, DB_FILE_SUFFIX, KEY_INDEX, TABLE,
};

/// Crate version, as reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
