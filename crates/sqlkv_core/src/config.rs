//! SQLite store configuration.

use std::time::Duration;

/// SQLite journal mode applied when a store is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalMode {
    /// Rollback journal deleted after each transaction.
    Delete,
    /// Write-ahead log; readers do not block the writer.
    Wal,
    /// Journal kept in memory.
    Memory,
}

impl JournalMode {
    /// Returns the pragma value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Wal => "WAL",
            Self::Memory => "MEMORY",
        }
    }
}

/// SQLite `synchronous` level applied to every connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Synchronous {
    /// No syncs; fastest, not crash safe.
    Off,
    /// Sync at critical moments.
    Normal,
    /// Sync on every commit.
    Full,
}

impl Synchronous {
    /// Returns the pragma value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Normal => "NORMAL",
            Self::Full => "FULL",
        }
    }
}

/// Configuration for opening a [`crate::SqliteStore`].
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// How long a connection waits on a locked database before failing.
    pub busy_timeout: Duration,

    /// Journal mode set on the store connection.
    pub journal_mode: JournalMode,

    /// Synchronous level set on every connection.
    pub synchronous: Synchronous,

    /// Number of rows an iterator pulls per query.
    pub iterator_page_size: usize,

    /// Whether to create the store directory if it doesn't exist.
    pub create_dir: bool,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            journal_mode: JournalMode::Wal,
            synchronous: Synchronous::Normal,
            iterator_page_size: 256,
            create_dir: true,
        }
    }
}

impl SqliteConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the busy timeout.
    #[must_use]
    pub const fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Sets the journal mode.
    #[must_use]
    pub const fn journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = mode;
        self
    }

    /// Sets the synchronous level.
    #[must_use]
    pub const fn synchronous(mut self, level: Synchronous) -> Self {
        self.synchronous = level;
        self
    }

    /// Sets the iterator page size, clamped to `1..=i64::MAX`.
    #[must_use]
    pub const fn iterator_page_size(mut self, rows: usize) -> Self {
        self.iterator_page_size = if rows == 0 {
            1
        } else if rows as u64 > i64::MAX as u64 {
            i64::MAX as usize
        } else {
            rows
        };
        self
    }

    /// Sets whether to create a missing store directory.
    #[must_use]
    pub const fn create_dir(mut self, value: bool) -> Self {
        self.create_dir = value;
        self
    }
}
