//! SQLite backend.
//!
//! A store is one database file holding one record table. SQLite is used
//! purely as a durable byte table: every key-value operation maps to a single
//! parameterized statement, and range scans are expressed as ordered,
//! de-duplicated selects.

mod batch;
mod iterator;
mod schema;
mod store;

pub use batch::SqliteBatch;
pub use iterator::{SqliteIterator, SqlitePageSource};
pub use schema::{DB_FILE_SUFFIX, KEY_INDEX, TABLE};
pub use store::SqliteStore;
