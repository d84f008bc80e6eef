//! Backend-agnostic contract suite.
//!
//! Every check takes an empty store and asserts one part of the
//! [`KvStore`] contract. A backend passes the suite when
//! [`run_contract_suite`] returns for a freshly opened instance.

use crate::model::collect_entries;
use sqlkv_core::{KvError, KvStore};

/// Runs every check against stores produced by `open`.
///
/// `open` is called once per check and must return an empty store; the
/// guard it returns is held until the check finishes.
pub fn run_contract_suite<G>(mut open: impl FnMut() -> (G, Box<dyn KvStore>)) {
    let checks: [(&str, fn(&dyn KvStore)); 9] = [
        ("point_operations", point_operations),
        ("validation_leaves_state_unchanged", validation_leaves_state_unchanged),
        ("empty_value_is_present", empty_value_is_present),
        ("batch_applies_in_order", batch_applies_in_order),
        ("batch_lifecycle", batch_lifecycle),
        ("bounded_ranges", bounded_ranges),
        ("iterator_lifecycle", iterator_lifecycle),
        ("print_lists_entries", print_lists_entries),
        ("close_is_final", close_is_final),
    ];
    for (name, check) in checks {
        let (_guard, store) = open();
        eprintln!("contract check: {name}");
        check(store.as_ref());
    }
}

/// Set, get, has, overwrite and delete of a single key.
pub fn point_operations(store: &dyn KvStore) {
    store.set(&[1, 2, 4], Some(&[1, 1, 1])).unwrap();
    assert_eq!(store.get(&[1, 2, 4]).unwrap(), Some(vec![1, 1, 1]));
    assert!(store.has(&[1, 2, 4]).unwrap());

    store.set_sync(&[1, 2, 4], Some(&[9])).unwrap();
    assert_eq!(store.get(&[1, 2, 4]).unwrap(), Some(vec![9]));

    store.delete(&[1, 2, 4]).unwrap();
    assert_eq!(store.get(&[1, 2, 4]).unwrap(), None);
    assert!(!store.has(&[1, 2, 4]).unwrap());

    store.delete_sync(&[1, 2, 4]).unwrap();
}

/// Invalid input is rejected with the documented error and changes nothing.
pub fn validation_leaves_state_unchanged(store: &dyn KvStore) {
    store.set(b"k", Some(b"v")).unwrap();

    assert!(matches!(store.get(b""), Err(KvError::EmptyKey)));
    assert!(matches!(store.has(b""), Err(KvError::EmptyKey)));
    assert!(matches!(store.set(b"", Some(b"v")), Err(KvError::EmptyKey)));
    assert!(matches!(store.delete(b""), Err(KvError::EmptyKey)));
    assert!(matches!(store.set(b"k", None), Err(KvError::NilValue)));
    assert!(matches!(store.iterator(Some(b""), None), Err(KvError::EmptyKey)));
    assert!(matches!(store.reverse_iterator(None, Some(b"")), Err(KvError::EmptyKey)));

    let entries = collect_entries(store.iterator(None, None).unwrap());
    assert_eq!(entries, vec![(b"k".to_vec(), b"v".to_vec())]);
}

/// An empty value is stored and returned, not treated as absent.
pub fn empty_value_is_present(store: &dyn KvStore) {
    store.set(b"k", Some(b"")).unwrap();
    assert_eq!(store.get(b"k").unwrap(), Some(Vec::new()));
    assert!(store.has(b"k").unwrap());
}

/// A batch applies its operations in append order, only on write.
pub fn batch_applies_in_order(store: &dyn KvStore) {
    store.set(b"gone", Some(b"x")).unwrap();

    let mut batch = store.new_batch_with_size(4).unwrap();
    batch.set(b"k", Some(b"1")).unwrap();
    batch.set(b"k", Some(b"2")).unwrap();
    batch.delete(b"gone").unwrap();
    batch.set(b"later", Some(b"x")).unwrap();
    batch.delete(b"later").unwrap();

    assert_eq!(store.get(b"k").unwrap(), None);
    assert!(store.has(b"gone").unwrap());

    batch.write().unwrap();
    batch.close().unwrap();

    assert_eq!(store.get(b"k").unwrap(), Some(b"2".to_vec()));
    assert!(!store.has(b"gone").unwrap());
    assert!(!store.has(b"later").unwrap());
}

/// Size accounting and the open/closed state machine.
pub fn batch_lifecycle(store: &dyn KvStore) {
    let mut batch = store.new_batch().unwrap();
    assert!(batch.is_open());
    assert_eq!(batch.byte_size().unwrap(), 0);

    batch.set(b"ab", Some(b"cde")).unwrap();
    batch.delete(b"f").unwrap();
    assert_eq!(batch.size(), 6);
    assert_eq!(batch.byte_size().unwrap(), 6);

    assert!(matches!(batch.set(b"", Some(b"v")), Err(KvError::EmptyKey)));
    assert!(matches!(batch.set(b"k", None), Err(KvError::NilValue)));
    assert_eq!(batch.size(), 6);

    batch.close().unwrap();
    batch.close().unwrap();
    assert!(!batch.is_open());
    assert_eq!(batch.size(), 6);
    assert!(matches!(batch.byte_size(), Err(KvError::BatchClosed)));
    assert!(matches!(batch.set(b"k", Some(b"v")), Err(KvError::BatchClosed)));
    assert!(matches!(batch.delete(b"k"), Err(KvError::BatchClosed)));
    assert!(matches!(batch.write(), Err(KvError::BatchClosed)));
    assert!(matches!(batch.write_sync(), Err(KvError::BatchClosed)));
    assert!(!store.has(b"ab").unwrap());

    batch.reset().unwrap();
    assert!(batch.is_open());
    assert_eq!(batch.size(), 0);
    batch.set(b"r", Some(b"1")).unwrap();
    batch.write_sync().unwrap();
    assert!(!batch.is_open());
    assert_eq!(store.get(b"r").unwrap(), Some(b"1".to_vec()));
}

/// Half-open bounds in both directions, including empty and inverted ones.
pub fn bounded_ranges(store: &dyn KvStore) {
    for key in ["a", "b", "c", "d", "e"] {
        store.set(key.as_bytes(), Some(key.as_bytes())).unwrap();
    }
    let keys = |itr| -> Vec<Vec<u8>> {
        collect_entries(itr).into_iter().map(|(k, _)| k).collect()
    };

    assert_eq!(
        keys(store.iterator(Some(b"b"), Some(b"d")).unwrap()),
        vec![b"b".to_vec(), b"c".to_vec()]
    );
    assert_eq!(
        keys(store.reverse_iterator(Some(b"b"), Some(b"d")).unwrap()),
        vec![b"c".to_vec(), b"b".to_vec()]
    );
    assert_eq!(
        keys(store.iterator(Some(b"d"), None).unwrap()),
        vec![b"d".to_vec(), b"e".to_vec()]
    );
    assert_eq!(
        keys(store.reverse_iterator(None, Some(b"b")).unwrap()),
        vec![b"a".to_vec()]
    );
    assert!(keys(store.iterator(Some(b"c"), Some(b"c")).unwrap()).is_empty());
    assert!(keys(store.reverse_iterator(Some(b"d"), Some(b"b")).unwrap()).is_empty());
    assert_eq!(keys(store.reverse_iterator(None, None).unwrap()).len(), 5);
}

/// Domain, copies, error reporting and idempotent close.
pub fn iterator_lifecycle(store: &dyn KvStore) {
    store.set(b"a", Some(b"1")).unwrap();
    store.set(b"b", Some(b"2")).unwrap();

    let mut itr = store.iterator(Some(b"a"), None).unwrap();
    assert_eq!(itr.domain(), (Some(&b"a"[..]), None));
    assert!(itr.valid());
    let key = itr.key();
    itr.next();
    assert_eq!(key, b"a");
    assert_eq!(itr.key(), b"b");
    assert_eq!(itr.value(), b"2");
    itr.next();
    assert!(!itr.valid());
    assert!(itr.error().is_none());

    itr.close().unwrap();
    itr.close().unwrap();
    assert!(!itr.valid());
}

/// `print_to` writes one hex line per entry in ascending order.
pub fn print_lists_entries(store: &dyn KvStore) {
    store.set(&[0x0a], Some(&[0xff, 0x01])).unwrap();
    store.set(&[0x01], Some(&[])).unwrap();

    let mut out = Vec::new();
    store.print_to(&mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "[01]:\t[]\n[0A]:\t[FF01]\n");
    assert!(store.stats().is_empty());
}

/// Close is idempotent and every later operation fails.
pub fn close_is_final(store: &dyn KvStore) {
    store.set(b"k", Some(b"v")).unwrap();
    store.close().unwrap();
    store.close().unwrap();

    assert!(matches!(store.get(b"k"), Err(KvError::StoreClosed)));
    assert!(matches!(store.has(b"k"), Err(KvError::StoreClosed)));
    assert!(matches!(store.set(b"k", Some(b"v")), Err(KvError::StoreClosed)));
    assert!(matches!(store.delete(b"k"), Err(KvError::StoreClosed)));
    assert!(matches!(store.new_batch(), Err(KvError::StoreClosed)));
    assert!(matches!(store.iterator(None, None), Err(KvError::StoreClosed)));
    assert!(matches!(store.reverse_iterator(None, None), Err(KvError::StoreClosed)));
}
