//! Backend registry.
//!
//! Maps backend-kind tags to store constructors. The registry is an ordinary
//! value built at startup and handed to whatever needs to open stores;
//! nothing is registered as a side effect of linking a backend.

use crate::error::{KvError, KvResult};
use crate::kv::KvStore;
use crate::memory::MemStore;
use crate::options::Options;
use crate::sqlite::SqliteStore;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Tag of the SQLite backend.
pub const SQLITE_BACKEND: &str = "sqlite";

/// Tag of the in-memory backend.
pub const MEMORY_BACKEND: &str = "memdb";

/// Builds a store from `(name, dir, options)`.
pub type StoreConstructor =
    Box<dyn Fn(&str, &Path, &Options) -> KvResult<Box<dyn KvStore>> + Send + Sync>;

/// A table of store constructors keyed by backend kind.
///
/// # Example
///
/// ```rust
/// use sqlkv_core::{BackendRegistry, KvStore, Options, MEMORY_BACKEND};
/// use std::path::Path;
///
/// let registry = BackendRegistry::with_defaults();
/// let store = registry
///     .open(MEMORY_BACKEND, "cache", Path::new("."), &Options::new())
///     .unwrap();
/// store.set(b"k", Some(b"v")).unwrap();
/// ```
#[derive(Default)]
pub struct BackendRegistry {
    constructors: HashMap<String, StoreConstructor>,
}

impl BackendRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the SQLite and in-memory backends.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .constructors
            .insert(SQLITE_BACKEND.to_string(), Box::new(open_sqlite));
        registry
            .constructors
            .insert(MEMORY_BACKEND.to_string(), Box::new(open_memory));
        registry
    }

    /// Registers `constructor` under `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::BackendAlreadyRegistered`] if `kind` is taken and
    /// `force` is false. With `force` the existing constructor is replaced.
    pub fn register<F>(&mut self, kind: impl Into<String>, constructor: F, force: bool) -> KvResult<()>
    where
        F: Fn(&str, &Path, &Options) -> KvResult<Box<dyn KvStore>> + Send + Sync + 'static,
    {
        let kind = kind.into();
        if !force && self.constructors.contains_key(&kind) {
            return Err(KvError::BackendAlreadyRegistered(kind));
        }
        self.constructors.insert(kind, Box::new(constructor));
        Ok(())
    }

    /// Returns whether a constructor is registered under `kind`.
    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Returns the registered kinds in sorted order.
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Opens a store of the given kind, passing `options` through untouched.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::UnknownBackend`] if nothing is registered under
    /// `kind`, or whatever the constructor fails with.
    pub fn open(
        &self,
        kind: &str,
        name: &str,
        dir: &Path,
        options: &Options,
    ) -> KvResult<Box<dyn KvStore>> {
        let constructor = self
            .constructors
            .get(kind)
            .ok_or_else(|| KvError::UnknownBackend(kind.to_string()))?;
        debug!(kind, name, dir = %dir.display(), "opening store");
        constructor(name, dir, options)
    }
}

fn open_sqlite(name: &str, dir: &Path, _options: &Options) -> KvResult<Box<dyn KvStore>> {
    Ok(Box::new(SqliteStore::open(name, dir)?))
}

fn open_memory(_name: &str, _dir: &Path, _options: &Options) -> KvResult<Box<dyn KvStore>> {
    Ok(Box::new(MemStore::new()))
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
