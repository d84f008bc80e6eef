//! The key-value contract shared by every store backend.

use crate::error::{KvError, KvResult};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{self, Write};

/// An ordered key-value store.
///
/// Keys are non-empty byte strings ordered bytewise. Values are byte strings;
/// an empty value is distinct from an absent one. On the write path a value is
/// passed as `Option<&[u8]>` so that the nil sentinel is expressible and can be
/// rejected with [`KvError::NilValue`].
///
/// # Invariants
///
/// - At most one record exists per key
/// - `get` after `set` returns the value set; `get` after `delete` returns `None`
/// - After `close`, every operation except `close` fails with
///   [`KvError::StoreClosed`]
///
/// # Implementors
///
/// - [`crate::SqliteStore`] - persistent, backed by a SQLite table
/// - [`crate::MemStore`] - ephemeral, for tests and caches
pub trait KvStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::EmptyKey`] for an empty key.
    fn get(&self, key: &[u8]) -> KvResult<Option<Vec<u8>>>;

    /// Returns whether a value is stored under `key`.
    ///
    /// # Errors
    ///
    /// Fails exactly when [`KvStore::get`] fails.
    fn has(&self, key: &[u8]) -> KvResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Inserts or overwrites the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::EmptyKey`] for an empty key and
    /// [`KvError::NilValue`] for an absent value.
    fn set(&self, key: &[u8], value: Option<&[u8]>) -> KvResult<()>;

    /// Same as [`KvStore::set`]; every write is committed on return.
    fn set_sync(&self, key: &[u8], value: Option<&[u8]>) -> KvResult<()> {
        self.set(key, value)
    }

    /// Removes the value stored under `key`. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::EmptyKey`] for an empty key.
    fn delete(&self, key: &[u8]) -> KvResult<()>;

    /// Same as [`KvStore::delete`]; every write is committed on return.
    fn delete_sync(&self, key: &[u8]) -> KvResult<()> {
        self.delete(key)
    }

    /// Closes the store. Closing twice is a no-op.
    fn close(&self) -> KvResult<()>;

    /// Returns an ascending iterator over `[start, end)`.
    ///
    /// `None` leaves a side unbounded.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::EmptyKey`] if a bound is present but empty.
    fn iterator(&self, start: Option<&[u8]>, end: Option<&[u8]>)
        -> KvResult<Box<dyn KvIterator>>;

    /// Returns a descending iterator over `[start, end)`.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::EmptyKey`] if a bound is present but empty.
    fn reverse_iterator(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> KvResult<Box<dyn KvIterator>>;

    /// Opens a new batch.
    fn new_batch(&self) -> KvResult<Box<dyn KvBatch>>;

    /// Opens a new batch. The size hint is advisory and may be ignored.
    fn new_batch_with_size(&self, _size: usize) -> KvResult<Box<dyn KvBatch>> {
        self.new_batch()
    }

    /// Prints every entry to stdout.
    fn print(&self) -> KvResult<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.print_to(&mut out)
    }

    /// Writes every entry, in ascending key order, as `[KEY]:\t[VALUE]` lines
    /// with both sides rendered as uppercase hex.
    fn print_to(&self, out: &mut dyn Write) -> KvResult<()> {
        let mut itr = self.iterator(None, None)?;
        while itr.valid() {
            writeln!(out, "[{}]:\t[{}]", to_hex(&itr.key()), to_hex(&itr.value()))
                .map_err(|e| KvError::io("failed to print entry", e))?;
            itr.next();
        }
        let fault = itr.take_error();
        itr.close()?;
        fault.map_or(Ok(()), Err)
    }

    /// Returns backend statistics. Backends may return an empty map.
    fn stats(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }
}

/// An atomic batch of writes.
///
/// A batch is OPEN until it is written or closed. Operations are buffered
/// in append order and applied all-or-nothing by [`KvBatch::write`].
pub trait KvBatch: Send {
    /// Buffers a set operation.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::EmptyKey`], [`KvError::NilValue`], or
    /// [`KvError::BatchClosed`].
    fn set(&mut self, key: &[u8], value: Option<&[u8]>) -> KvResult<()>;

    /// Buffers a delete operation.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::EmptyKey`] or [`KvError::BatchClosed`].
    fn delete(&mut self, key: &[u8]) -> KvResult<()>;

    /// Applies all buffered operations atomically and closes the batch.
    ///
    /// On failure the batch stays open; call [`KvBatch::close`] to roll back.
    fn write(&mut self) -> KvResult<()>;

    /// Writes the batch, then closes it whatever the outcome.
    fn write_sync(&mut self) -> KvResult<()> {
        if !self.is_open() {
            return Err(KvError::BatchClosed);
        }
        let written = self.write();
        let closed = self.close();
        written.and(closed)
    }

    /// Discards the batch. Closing twice is a no-op.
    fn close(&mut self) -> KvResult<()>;

    /// Discards buffered operations and reopens the batch for new work.
    fn reset(&mut self) -> KvResult<()>;

    /// Returns the accumulated byte size, even when closed.
    fn size(&self) -> usize;

    /// Returns the accumulated byte size of a live batch.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::BatchClosed`] if the batch is not open.
    fn byte_size(&self) -> KvResult<usize> {
        if !self.is_open() {
            return Err(KvError::BatchClosed);
        }
        Ok(self.size())
    }

    /// Returns whether operations may still be appended.
    fn is_open(&self) -> bool;
}

/// A cursor over a key range.
///
/// The iterator starts positioned on the first entry (if any). Calling
/// [`KvIterator::key`], [`KvIterator::value`] or [`KvIterator::next`] on an
/// invalid iterator is a programming error and panics.
pub trait KvIterator: Send {
    /// Returns the `[start, end)` bounds the iterator was created with.
    fn domain(&self) -> (Option<&[u8]>, Option<&[u8]>);

    /// Returns whether the iterator is positioned on an entry in range.
    fn valid(&mut self) -> bool;

    /// Moves to the next entry.
    ///
    /// # Panics
    ///
    /// Panics if the iterator is not valid.
    fn next(&mut self);

    /// Returns a copy of the current key.
    ///
    /// # Panics
    ///
    /// Panics if the iterator is not valid.
    fn key(&self) -> Vec<u8>;

    /// Returns a copy of the current value.
    ///
    /// # Panics
    ///
    /// Panics if the iterator is not valid.
    fn value(&self) -> Vec<u8>;

    /// Returns the fault that ended iteration early, if any.
    fn error(&self) -> Option<&KvError>;

    /// Takes ownership of the fault that ended iteration early, if any.
    ///
    /// [`KvIterator::error`] returns `None` afterwards.
    fn take_error(&mut self) -> Option<KvError>;

    /// Releases the iterator's resources. Closing twice is a no-op.
    fn close(&mut self) -> KvResult<()>;
}

/// Renders bytes as uppercase hex.
#[must_use]
pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02X}");
    }
    out
}
