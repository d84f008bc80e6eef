//! Point commands: get, set and delete.

use super::{CommandResult, EntryRow};
use sqlkv_core::KvStore;
use tracing::info;

/// Looks up `key` and renders the result in `format`.
///
/// Returns `None` for a missing key.
pub fn lookup(store: &dyn KvStore, key: &str, format: &str) -> CommandResult<Option<String>> {
    let Some(value) = store.get(key.as_bytes())? else {
        return Ok(None);
    };
    let row = EntryRow::new(key.as_bytes(), &value);
    let rendered = match format {
        "json" => serde_json::to_string_pretty(&row)?,
        _ => row.to_line(),
    };
    Ok(Some(rendered))
}

/// Runs the get command. A missing key is an error.
pub fn get(store: &dyn KvStore, key: &str, format: &str) -> CommandResult {
    match lookup(store, key, format)? {
        Some(rendered) => {
            println!("{rendered}");
            Ok(())
        }
        None => Err(format!("key {key:?} not found").into()),
    }
}

/// Runs the set command.
pub fn set(store: &dyn KvStore, key: &str, value: &str) -> CommandResult {
    store.set_sync(key.as_bytes(), Some(value.as_bytes()))?;
    info!(key, bytes = value.len(), "set key");
    Ok(())
}

/// Runs the delete command.
pub fn delete(store: &dyn KvStore, key: &str) -> CommandResult {
    store.delete_sync(key.as_bytes())?;
    info!(key, "deleted key");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlkv_core::MemStore;

    #[test]
    fn set_then_lookup() {
        let store = MemStore::new();
        set(&store, "k", "v").unwrap();
        assert_eq!(
            lookup(&store, "k", "text").unwrap(),
            Some("[6B]:\t[76]".to_string())
        );
    }

    #[test]
    fn lookup_json() {
        let store = MemStore::new();
        set(&store, "k", "").unwrap();
        let rendered = lookup(&store, "k", "json").unwrap().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed, serde_json::json!({ "key": "6B", "value": "" }));
    }

    #[test]
    fn delete_then_get_fails() {
        let store = MemStore::new();
        set(&store, "k", "v").unwrap();
        delete(&store, "k").unwrap();
        assert_eq!(lookup(&store, "k", "text").unwrap(), None);
        assert!(get(&store, "k", "text").is_err());
    }

    #[test]
    fn empty_key_is_rejected() {
        let store = MemStore::new();
        assert!(set(&store, "", "v").is_err());
        assert!(delete(&store, "").is_err());
    }
}
