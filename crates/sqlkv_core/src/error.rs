//! Error types shared by every store backend.

use std::io;
use thiserror::Error;

/// Result type for key-value operations.
pub type KvResult<T> = Result<T, KvError>;

/// Errors that can occur in key-value operations.
///
/// Validation failures (`EmptyKey`, `NilValue`, `BatchClosed`) are reported
/// before any storage is touched. Storage failures are never retried.
#[derive(Debug, Error)]
pub enum KvError {
    /// A key, or a present iteration bound, was zero-length.
    #[error("key cannot be empty")]
    EmptyKey,

    /// A value was absent. Empty values are legal.
    #[error("value cannot be nil")]
    NilValue,

    /// The batch has already been written or closed.
    #[error("batch has been written or closed")]
    BatchClosed,

    /// The store has been closed.
    #[error("store is closed")]
    StoreClosed,

    /// The SQLite engine reported a failure.
    #[error("{context}: {source}")]
    Storage {
        /// The operation that failed.
        context: &'static str,
        /// The engine error.
        #[source]
        source: rusqlite::Error,
    },

    /// An I/O error occurred outside the engine.
    #[error("{context}: {source}")]
    Io {
        /// The operation that failed.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// No constructor is registered for the requested backend.
    #[error("unknown store backend: {0}")]
    UnknownBackend(String),

    /// A constructor is already registered for the backend.
    #[error("store backend already registered: {0}")]
    BackendAlreadyRegistered(String),
}

impl KvError {
    /// Creates a storage error annotated with the failing operation.
    pub fn storage(context: &'static str, source: rusqlite::Error) -> Self {
        Self::Storage { context, source }
    }

    /// Creates an I/O error annotated with the failing operation.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Rejects zero-length keys.
pub(crate) fn check_key(key: &[u8]) -> KvResult<()> {
    if key.is_empty() {
        return Err(KvError::EmptyKey);
    }
    Ok(())
}

/// Rejects absent values, returning the present one.
pub(crate) fn check_value(value: Option<&[u8]>) -> KvResult<&[u8]> {
    value.ok_or(KvError::NilValue)
}

/// Rejects iteration bounds that are present but zero-length.
pub(crate) fn check_bounds(start: Option<&[u8]>, end: Option<&[u8]>) -> KvResult<()> {
    if start.is_some_and(<[u8]>::is_empty) || end.is_some_and(<[u8]>::is_empty) {
        return Err(KvError::EmptyKey);
    }
    Ok(())
}
