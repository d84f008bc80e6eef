//! In-memory store backend.

use crate::batch::{BatchOp, PendingOps};
use crate::error::{check_key, check_value, KvError, KvResult};
use crate::iterator::{Entry, PageSource, RangeIterator, ScanRange};
use crate::kv::{KvBatch, KvIterator, KvStore};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound::{self, Excluded, Included, Unbounded};
use std::sync::Arc;

type Tree = BTreeMap<Vec<u8>, Vec<u8>>;

/// `None` once the store is closed.
type SharedTree = Arc<RwLock<Option<Tree>>>;

/// Rows pulled per iterator page.
const PAGE_SIZE: usize = 256;

/// An ordered in-memory store.
///
/// This backend keeps all records in a `BTreeMap` and is suitable for:
/// - Unit tests
/// - Swapping in where persistence is not needed
///
/// It implements the same [`KvStore`] contract as the SQLite backend.
///
/// # Thread Safety
///
/// Clones share the same records and can be used across threads.
///
/// # Example
///
/// ```rust
/// use sqlkv_core::{KvStore, MemStore};
///
/// let store = MemStore::new();
/// store.set(b"k", Some(b"v")).unwrap();
/// assert!(store.has(b"k").unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct MemStore {
    tree: SharedTree,
}

impl Default for MemStore {
    fn default() -> Self {
        Self {
            tree: Arc::new(RwLock::new(Some(Tree::new()))),
        }
    }
}

impl MemStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of records, or `None` once closed.
    #[must_use]
    pub fn len(&self) -> Option<usize> {
        self.tree.read().as_ref().map(Tree::len)
    }

    /// Returns whether the store holds no records. A closed store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len().unwrap_or(0) == 0
    }

    /// Opens a new batch.
    #[must_use]
    pub fn batch(&self) -> MemBatch {
        MemBatch {
            tree: Arc::clone(&self.tree),
            open: true,
            pending: PendingOps::default(),
        }
    }

    /// Returns a typed iterator over `[start, end)`.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::EmptyKey`] for an empty bound, or
    /// [`KvError::StoreClosed`] after close.
    pub fn range(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        reverse: bool,
    ) -> KvResult<MemIterator> {
        let range = ScanRange::new(start, end, reverse)?;
        let source = MemPageSource {
            tree: Arc::clone(&self.tree),
        };
        RangeIterator::new(source, range, PAGE_SIZE)
    }
}

impl KvStore for MemStore {
    fn get(&self, key: &[u8]) -> KvResult<Option<Vec<u8>>> {
        check_key(key)?;
        let tree = self.tree.read();
        let tree = tree.as_ref().ok_or(KvError::StoreClosed)?;
        Ok(tree.get(key).cloned())
    }

    fn set(&self, key: &[u8], value: Option<&[u8]>) -> KvResult<()> {
        check_key(key)?;
        let value = check_value(value)?;
        let mut tree = self.tree.write();
        let tree = tree.as_mut().ok_or(KvError::StoreClosed)?;
        tree.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> KvResult<()> {
        check_key(key)?;
        let mut tree = self.tree.write();
        let tree = tree.as_mut().ok_or(KvError::StoreClosed)?;
        tree.remove(key);
        Ok(())
    }

    fn close(&self) -> KvResult<()> {
        self.tree.write().take();
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
        if self.tree.read().is_none() {
            return Err(KvError::StoreClosed);
        }
        Ok(Box::new(self.batch()))
    }
}

/// A batch applied to a [`MemStore`] under a single write lock.
#[derive(Debug)]
pub struct MemBatch {
    tree: SharedTree,
    open: bool,
    pending: PendingOps,
}

impl MemBatch {
    /// Returns the buffered operations in append order.
    #[must_use]
    pub fn ops(&self) -> &[BatchOp] {
        self.pending.ops()
    }
}

impl KvBatch for MemBatch {
    fn set(&mut self, key: &[u8], value: Option<&[u8]>) -> KvResult<()> {
        self.pending.push_set(self.open, key, value)
    }

    fn delete(&mut self, key: &[u8]) -> KvResult<()> {
        self.pending.push_delete(self.open, key)
    }

    fn write(&mut self) -> KvResult<()> {
        if !self.open {
            return Err(KvError::BatchClosed);
        }
        let mut tree = self.tree.write();
        let tree = tree.as_mut().ok_or(KvError::StoreClosed)?;
        for op in self.pending.ops() {
            match op {
                BatchOp::Set { key, value } => {
                    tree.insert(key.clone(), value.clone());
                }
                BatchOp::Delete { key } => {
                    tree.remove(key);
                }
            }
        }
        self.open = false;
        Ok(())
    }

    fn close(&mut self) -> KvResult<()> {
        self.open = false;
        Ok(())
    }

    fn reset(&mut self) -> KvResult<()> {
        self.pending.clear();
        self.open = false;
        if self.tree.read().is_none() {
            return Err(KvError::StoreClosed);
        }
        self.open = true;
        Ok(())
    }

    fn size(&self) -> usize {
        self.pending.size()
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

/// Iterator returned by [`MemStore::range`].
pub type MemIterator = RangeIterator<MemPageSource>;

/// Pulls pages of a key range out of a [`MemStore`].
#[derive(Debug)]
pub struct MemPageSource {
    tree: SharedTree,
}

impl PageSource for MemPageSource {
    fn fetch(
        &mut self,
        range: &ScanRange,
        resume_after: Option<&[u8]>,
        limit: usize,
    ) -> KvResult<Vec<Entry>> {
        let tree = self.tree.read();
        let tree = tree.as_ref().ok_or(KvError::StoreClosed)?;

        let mut lower = range.start().map_or(Unbounded, Included);
        let mut upper = range.end().map_or(Unbounded, Excluded);
        if let Some(after) = resume_after {
            if range.is_reverse() {
                upper = Excluded(after);
            } else {
                lower = Excluded(after);
            }
        }
        // BTreeMap::range panics on an inverted interval.
        if is_empty_interval(lower, upper) {
            return Ok(Vec::new());
        }

        let rows = tree.range::<[u8], _>((lower, upper));
        let clone = |(k, v): (&Vec<u8>, &Vec<u8>)| (k.clone(), v.clone());
        Ok(if range.is_reverse() {
            rows.rev().take(limit).map(clone).collect()
        } else {
            rows.take(limit).map(clone).collect()
        })
    }
}

fn is_empty_interval(lower: Bound<&[u8]>, upper: Bound<&[u8]>) -> bool {
    match (lower, upper) {
        (Included(l), Included(u)) => l > u,
        (Included(l) | Excluded(l), Included(u) | Excluded(u)) => l >= u,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(mut itr: Box<dyn KvIterator>) -> Vec<Vec<u8>> {
        let mut keys = Vec::new();
        while itr.valid() {
            keys.push(itr.key());
            itr.next();
        }
        itr.close().unwrap();
        keys
    }

    fn alphabet() -> MemStore {
        let store = MemStore::new();
        for key in ["a", "b", "c", "d", "e"] {
            store.set(key.as_bytes(), Some(b"v")).unwrap();
        }
        store
    }

    #[test]
    fn memory_new_is_empty() {
        let store = MemStore::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), Some(0));
    }

    #[test]
    fn memory_set_get_delete() {
        let store = MemStore::new();
        store.set(b"k", Some(b"v")).unwrap();
        assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));
        store.delete(b"k").unwrap();
        assert_eq!(store.get(b"k").unwrap(), None);
        store.delete(b"k").unwrap();
    }

    #[test]
    fn memory_validation() {
        let store = MemStore::new();
        assert!(matches!(store.get(b""), Err(KvError::EmptyKey)));
        assert!(matches!(store.set(b"k", None), Err(KvError::NilValue)));
        assert!(matches!(store.delete(b""), Err(KvError::EmptyKey)));
        assert!(store.is_empty());
    }

    #[test]
    fn memory_ranges() {
        let store = alphabet();
        assert_eq!(
            collect(store.iterator(Some(b"b"), Some(b"d")).unwrap()),
            vec![b"b".to_vec(), b"c".to_vec()]
        );
        assert_eq!(
            collect(store.reverse_iterator(Some(b"b"), Some(b"d")).unwrap()),
            vec![b"c".to_vec(), b"b".to_vec()]
        );
        assert!(collect(store.iterator(Some(b"d"), Some(b"b")).unwrap()).is_empty());
        assert!(collect(store.iterator(Some(b"c"), Some(b"c")).unwrap()).is_empty());
    }

    #[test]
    fn memory_ranges_across_pages() {
        let store = MemStore::new();
        let keys: Vec<Vec<u8>> = (0u16..600).map(|i| i.to_be_bytes().to_vec()).collect();
        for key in &keys {
            store.set(key, Some(b"")).unwrap();
        }
        assert_eq!(collect(store.iterator(None, None).unwrap()), keys);
        let mut reversed = keys.clone();
        reversed.reverse();
        assert_eq!(collect(store.reverse_iterator(None, None).unwrap()), reversed);
    }

    #[test]
    fn memory_batch_is_atomic_and_ordered() {
        let store = MemStore::new();
        let mut batch = store.new_batch().unwrap();
        batch.set(b"k", Some(b"1")).unwrap();
        batch.set(b"k", Some(b"2")).unwrap();
        batch.delete(b"x").unwrap();
        assert_eq!(store.get(b"k").unwrap(), None);
        batch.write().unwrap();
        assert_eq!(store.get(b"k").unwrap(), Some(b"2".to_vec()));
        assert!(matches!(batch.byte_size(), Err(KvError::BatchClosed)));
        batch.close().unwrap();
    }

    #[test]
    fn memory_batch_close_discards() {
        let store = MemStore::new();
        let mut batch = store.batch();
        batch.set(b"k", Some(b"1")).unwrap();
        batch.close().unwrap();
        assert!(matches!(batch.write(), Err(KvError::BatchClosed)));
        assert_eq!(store.get(b"k").unwrap(), None);
        assert_eq!(batch.ops().len(), 1);
    }

    #[test]
    fn memory_close_is_idempotent() {
        let store = MemStore::new();
        store.close().unwrap();
        store.close().unwrap();
        assert!(matches!(store.get(b"k"), Err(KvError::StoreClosed)));
        assert!(matches!(store.new_batch(), Err(KvError::StoreClosed)));
        assert!(matches!(store.iterator(None, None), Err(KvError::StoreClosed)));
        assert_eq!(store.len(), None);
    }

    #[test]
    fn empty_interval_detection() {
        assert!(is_empty_interval(Included(b"b"), Excluded(b"a")));
        assert!(is_empty_interval(Included(b"a"), Excluded(b"a")));
        assert!(!is_empty_interval(Included(b"a"), Included(b"a")));
        assert!(!is_empty_interval(Unbounded, Excluded(b"a")));
    }
}
