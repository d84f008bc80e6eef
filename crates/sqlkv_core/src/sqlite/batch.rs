//! Transactional write batches.

use super::schema;
use super::store::Shared;
use crate::batch::{BatchOp, PendingOps};
use crate::error::{KvError, KvResult};
use crate::kv::KvBatch;
use rusqlite::Connection;
use std::sync::Arc;
use tracing::{debug, warn};

/// A batch of writes applied in one SQLite transaction.
///
/// The batch opens a connection of its own and begins a deferred
/// transaction on it, so the store's point operations are not drawn into the
/// transaction. Operations are only buffered until [`KvBatch::write`], which
/// replays them in append order and commits.
///
/// Dropping a batch whose transaction is still open rolls it back.
pub struct SqliteBatch {
    shared: Arc<Shared>,
    conn: Connection,
    /// Whether `conn` has a live transaction; the batch is OPEN exactly then.
    in_txn: bool,
    pending: PendingOps,
}

impl SqliteBatch {
    pub(crate) fn begin(shared: Arc<Shared>) -> KvResult<Self> {
        let conn = shared.connect()?;
        conn.execute_batch("BEGIN DEFERRED")
            .map_err(|e| KvError::storage("failed to create sql transaction", e))?;
        Ok(Self {
            shared,
            conn,
            in_txn: true,
            pending: PendingOps::default(),
        })
    }

    /// Returns the buffered operations in append order.
    ///
    /// They stay readable after the batch is written.
    #[must_use]
    pub fn ops(&self) -> &[BatchOp] {
        self.pending.ops()
    }

    /// Returns the number of buffered operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.ops().len()
    }

    /// Returns whether no operations are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.ops().is_empty()
    }

    fn rollback(&mut self) -> KvResult<()> {
        if self.in_txn {
            self.conn
                .execute_batch("ROLLBACK")
                .map_err(|e| KvError::storage("failed to roll back batch transaction", e))?;
            self.in_txn = false;
            debug!(ops = self.len(), "rolled back batch");
        }
        Ok(())
    }

    fn apply(&self, op: &BatchOp) -> KvResult<()> {
        match op {
            BatchOp::Set { key, value } => self
                .conn
                .prepare_cached(schema::UPSERT)
                .and_then(|mut stmt| stmt.execute([key, value]))
                .map_err(|e| KvError::storage("failed to exec batch set statement", e))?,
            BatchOp::Delete { key } => self
                .conn
                .prepare_cached(schema::DELETE)
                .and_then(|mut stmt| stmt.execute([key]))
                .map_err(|e| KvError::storage("failed to exec batch delete statement", e))?,
        };
        Ok(())
    }
}

impl KvBatch for SqliteBatch {
    fn set(&mut self, key: &[u8], value: Option<&[u8]>) -> KvResult<()> {
        self.pending.push_set(self.in_txn, key, value)
    }

    fn delete(&mut self, key: &[u8]) -> KvResult<()> {
        self.pending.push_delete(self.in_txn, key)
    }

    fn write(&mut self) -> KvResult<()> {
        if !self.in_txn {
            return Err(KvError::BatchClosed);
        }
        if self.shared.is_closed() {
            return Err(KvError::StoreClosed);
        }
        // A failed op leaves the transaction open; close() rolls it back.
        for op in self.pending.ops() {
            self.apply(op)?;
        }
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| KvError::storage("failed to write sql transaction", e))?;
        self.in_txn = false;
        debug!(ops = self.len(), bytes = self.pending.size(), "committed batch");
        Ok(())
    }

    fn close(&mut self) -> KvResult<()> {
        self.rollback()
    }

    fn reset(&mut self) -> KvResult<()> {
        self.rollback()?;
        self.pending.clear();
        if self.shared.is_closed() {
            return Err(KvError::StoreClosed);
        }
        self.conn
            .execute_batch("BEGIN DEFERRED")
            .map_err(|e| KvError::storage("failed to create sql transaction", e))?;
        self.in_txn = true;
        Ok(())
    }

    fn size(&self) -> usize {
        self.pending.size()
    }

    fn is_open(&self) -> bool {
        self.in_txn
    }
}

impl Drop for SqliteBatch {
    fn drop(&mut self) {
        if self.in_txn {
            warn!(ops = self.len(), "batch dropped without close, rolling back");
            if let Err(err) = self.rollback() {
                warn!(error = %err, "failed to roll back dropped batch");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::KvStore;
    use crate::sqlite::SqliteStore;
    use tempfile::{tempdir, TempDir};

    fn open_temp() -> (TempDir, SqliteStore) {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open("batch", dir.path()).unwrap();
        (dir, store)
    }

    /// Makes any insert of `key` fail inside the engine.
    fn poison_key(store: &SqliteStore, key: &[u8]) {
        let conn = Connection::open(store.path()).unwrap();
        conn.execute_batch(&format!(
            "CREATE TRIGGER reject_poison BEFORE INSERT ON kv_records
             WHEN NEW.key = X'{}'
             BEGIN SELECT RAISE(ABORT, 'poisoned key'); END;",
            crate::kv::to_hex(key)
        ))
        .unwrap();
    }

    #[test]
    fn write_then_close_applies_ops() {
        let (_dir, store) = open_temp();
        let mut batch = store.new_batch_with_size(100_000).unwrap();
        batch.set(&[1, 2, 3], Some(&[2, 2, 2])).unwrap();
        batch.write().unwrap();
        batch.close().unwrap();

        assert_eq!(store.get(&[1, 2, 3]).unwrap(), Some(vec![2, 2, 2]));
    }

    #[test]
    fn ops_apply_in_append_order() {
        let (_dir, store) = open_temp();
        store.set(b"gone", Some(b"x")).unwrap();

        let mut batch = store.batch().unwrap();
        batch.set(b"k", Some(b"v1")).unwrap();
        batch.set(b"k", Some(b"v2")).unwrap();
        batch.delete(b"gone").unwrap();
        batch.set(b"gone", Some(b"back")).unwrap();
        batch.set(b"tmp", Some(b"t")).unwrap();
        batch.delete(b"tmp").unwrap();
        assert_eq!(batch.len(), 6);
        batch.write().unwrap();

        assert_eq!(store.get(b"k").unwrap(), Some(b"v2".to_vec()));
        assert_eq!(store.get(b"gone").unwrap(), Some(b"back".to_vec()));
        assert_eq!(store.get(b"tmp").unwrap(), None);
        assert_eq!(batch.ops().len(), 6);
    }

    #[test]
    fn nothing_is_visible_before_write() {
        let (_dir, store) = open_temp();
        let mut batch = store.batch().unwrap();
        batch.set(b"k", Some(b"v")).unwrap();
        assert_eq!(store.get(b"k").unwrap(), None);
        batch.write().unwrap();
        assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn failed_op_rolls_back_whole_batch() {
        let (_dir, store) = open_temp();
        poison_key(&store, &[0xff]);

        let mut batch = store.batch().unwrap();
        batch.set(b"a", Some(b"1")).unwrap();
        batch.set(b"b", Some(b"2")).unwrap();
        batch.set(&[0xff], Some(b"3")).unwrap();
        batch.set(b"c", Some(b"4")).unwrap();

        let err = batch.write().unwrap_err();
        assert!(matches!(
            err,
            KvError::Storage {
                context: "failed to exec batch set statement",
                ..
            }
        ));
        assert!(batch.is_open());
        batch.close().unwrap();
        assert!(!batch.is_open());

        let keys: [&[u8]; 4] = [b"a", b"b", b"c", &[0xff]];
        for key in keys {
            assert_eq!(store.get(key).unwrap(), None);
        }
    }

    #[test]
    fn closed_batch_rejects_mutation() {
        let (_dir, store) = open_temp();
        let mut batch = store.batch().unwrap();
        batch.set(b"k", Some(b"v")).unwrap();
        batch.write().unwrap();

        assert!(matches!(batch.set(b"k", Some(b"v")), Err(KvError::BatchClosed)));
        assert!(matches!(batch.delete(b"k"), Err(KvError::BatchClosed)));
        assert!(matches!(batch.write(), Err(KvError::BatchClosed)));
        assert!(matches!(batch.write_sync(), Err(KvError::BatchClosed)));
        assert!(matches!(batch.byte_size(), Err(KvError::BatchClosed)));
        assert_eq!(batch.size(), 2);
    }

    #[test]
    fn validation_comes_before_closed_check() {
        let (_dir, store) = open_temp();
        let mut batch = store.batch().unwrap();
        batch.close().unwrap();
        assert!(matches!(batch.set(b"", Some(b"v")), Err(KvError::EmptyKey)));
        assert!(matches!(batch.set(b"k", None), Err(KvError::NilValue)));
        assert!(matches!(batch.delete(b""), Err(KvError::EmptyKey)));
    }

    #[test]
    fn close_is_idempotent() {
        let (_dir, store) = open_temp();
        let mut batch = store.batch().unwrap();
        batch.set(b"k", Some(b"v")).unwrap();
        batch.close().unwrap();
        batch.close().unwrap();
        assert_eq!(store.get(b"k").unwrap(), None);

        let mut written = store.batch().unwrap();
        written.write().unwrap();
        written.close().unwrap();
        written.close().unwrap();
    }

    #[test]
    fn write_sync_closes_batch() {
        let (_dir, store) = open_temp();
        let mut batch = store.batch().unwrap();
        batch.set(b"k", Some(b"v")).unwrap();
        batch.write_sync().unwrap();
        assert!(!batch.is_open());
        assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn write_sync_closes_batch_even_on_failure() {
        let (_dir, store) = open_temp();
        poison_key(&store, b"bad");

        let mut batch = store.batch().unwrap();
        batch.set(b"ok", Some(b"1")).unwrap();
        batch.set(b"bad", Some(b"2")).unwrap();
        assert!(batch.write_sync().is_err());
        assert!(!batch.is_open());
        assert_eq!(store.get(b"ok").unwrap(), None);
    }

    #[test]
    fn byte_size_tracks_keys_and_values() {
        let (_dir, store) = open_temp();
        let mut batch = store.batch().unwrap();
        assert_eq!(batch.byte_size().unwrap(), 0);
        batch.set(b"key", Some(b"value")).unwrap();
        batch.delete(b"gone").unwrap();
        assert_eq!(batch.byte_size().unwrap(), 3 + 5 + 4);
        assert_eq!(batch.size(), 12);
        batch.close().unwrap();
    }

    #[test]
    fn reset_reopens_batch() {
        let (_dir, store) = open_temp();
        let mut batch = store.batch().unwrap();
        batch.set(b"first", Some(b"1")).unwrap();
        batch.write().unwrap();

        batch.reset().unwrap();
        assert!(batch.is_open());
        assert_eq!(batch.size(), 0);
        assert!(batch.is_empty());

        batch.set(b"second", Some(b"2")).unwrap();
        batch.write().unwrap();
        assert_eq!(store.get(b"second").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn reset_discards_open_work() {
        let (_dir, store) = open_temp();
        let mut batch = store.batch().unwrap();
        batch.set(b"discarded", Some(b"1")).unwrap();
        batch.reset().unwrap();
        batch.write().unwrap();
        assert_eq!(store.get(b"discarded").unwrap(), None);
    }

    #[test]
    fn dropping_open_batch_rolls_back() {
        let (_dir, store) = open_temp();
        {
            let mut batch = store.batch().unwrap();
            batch.set(b"k", Some(b"v")).unwrap();
        }
        assert_eq!(store.get(b"k").unwrap(), None);
        store.set(b"after", Some(b"ok")).unwrap();
    }

    #[test]
    fn store_writes_proceed_while_batch_is_open() {
        let (_dir, store) = open_temp();
        let mut batch = store.batch().unwrap();
        batch.set(b"from-batch", Some(b"1")).unwrap();
        store.set(b"from-store", Some(b"2")).unwrap();
        batch.write().unwrap();

        assert!(store.has(b"from-batch").unwrap());
        assert!(store.has(b"from-store").unwrap());
    }

    #[test]
    fn write_on_closed_store_fails() {
        let (_dir, store) = open_temp();
        let mut batch = store.batch().unwrap();
        batch.set(b"k", Some(b"v")).unwrap();
        store.close().unwrap();
        assert!(matches!(batch.write(), Err(KvError::StoreClosed)));
        batch.close().unwrap();
    }
}
