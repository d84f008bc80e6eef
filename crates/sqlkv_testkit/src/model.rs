//! Model-checking harness.
//!
//! Mirrors every write into a `BTreeMap` and checks reads and scans of the
//! store under test against it.

use crate::generators::ModelOp;
use sqlkv_core::{Entry, KvIterator, KvStore};
use std::collections::BTreeMap;

/// Drains an iterator into its entries, asserting it ended without a fault.
pub fn collect_entries(mut itr: Box<dyn KvIterator>) -> Vec<Entry> {
    let mut entries = Vec::new();
    while itr.valid() {
        entries.push((itr.key(), itr.value()));
        itr.next();
    }
    if let Some(err) = itr.error() {
        panic!("iteration failed: {err}");
    }
    itr.close().expect("Failed to close iterator");
    entries
}

/// Returns the entries of `model` within `[start, end)` in scan order.
pub fn expected_range(
    model: &BTreeMap<Vec<u8>, Vec<u8>>,
    start: Option<&[u8]>,
    end: Option<&[u8]>,
    reverse: bool,
) -> Vec<Entry> {
    let mut entries: Vec<Entry> = model
        .iter()
        .filter(|(k, _)| start.map_or(true, |s| k.as_slice() >= s))
        .filter(|(k, _)| end.map_or(true, |e| k.as_slice() < e))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if reverse {
        entries.reverse();
    }
    entries
}

/// A store under test paired with its reference model.
pub struct ModelHarness<'a> {
    store: &'a dyn KvStore,
    model: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl<'a> ModelHarness<'a> {
    /// Wraps an empty store.
    pub fn new(store: &'a dyn KvStore) -> Self {
        Self {
            store,
            model: BTreeMap::new(),
        }
    }

    /// Applies one write to both sides.
    pub fn apply(&mut self, op: &ModelOp) {
        match op {
            ModelOp::Set { key, value } => {
                self.store.set(key, Some(value)).expect("Failed to set");
                self.model.insert(key.clone(), value.clone());
            }
            ModelOp::Delete { key } => {
                self.store.delete(key).expect("Failed to delete");
                self.model.remove(key);
            }
        }
    }

    /// Applies `ops` to the store as one batch and to the model in order.
    pub fn apply_batch(&mut self, ops: &[ModelOp]) {
        let mut batch = self.store.new_batch().expect("Failed to open batch");
        for op in ops {
            match op {
                ModelOp::Set { key, value } => {
                    batch.set(key, Some(value)).expect("Failed to buffer set");
                    self.model.insert(key.clone(), value.clone());
                }
                ModelOp::Delete { key } => {
                    batch.delete(key).expect("Failed to buffer delete");
                    self.model.remove(key);
                }
            }
        }
        batch.write().expect("Failed to write batch");
        batch.close().expect("Failed to close batch");
    }

    /// Checks a point read of `key`.
    pub fn verify_get(&self, key: &[u8]) {
        let actual = self.store.get(key).expect("Failed to get");
        assert_eq!(
            actual.as_ref(),
            self.model.get(key),
            "value mismatch for {key:?}"
        );
        assert_eq!(
            self.store.has(key).expect("Failed to check key"),
            self.model.contains_key(key)
        );
    }

    /// Checks a scan of `[start, end)` in one direction.
    pub fn verify_scan(&self, start: Option<&[u8]>, end: Option<&[u8]>, reverse: bool) {
        let itr = if reverse {
            self.store.reverse_iterator(start, end)
        } else {
            self.store.iterator(start, end)
        }
        .expect("Failed to open iterator");
        assert_eq!(
            collect_entries(itr),
            expected_range(&self.model, start, end, reverse),
            "scan mismatch for [{start:?}, {end:?}) reverse={reverse}"
        );
    }

    /// Checks every tracked key and both full scans.
    pub fn verify_all(&self) {
        for key in self.model.keys() {
            self.verify_get(key);
        }
        self.verify_scan(None, None, false);
        self.verify_scan(None, None, true);
    }

    /// Returns the number of live keys in the model.
    pub fn tracked_count(&self) -> usize {
        self.model.len()
    }
}
