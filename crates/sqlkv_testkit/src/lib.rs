//! # sqlkv testkit
//!
//! Test utilities for sqlkv.
//!
//! This crate provides:
//! - Temporary store fixtures with automatic cleanup
//! - Helpers that inject rows the schema normally forbids
//! - Property-based test generators using proptest
//! - A backend-agnostic contract suite
//! - A model-checking harness backed by a `BTreeMap`
//!
//! ## Usage
//!
//! ```rust
//! use sqlkv_testkit::prelude::*;
//! use sqlkv_core::KvStore;
//!
//! with_temp_store(|store| {
//!     store.set(b"k", Some(b"v")).unwrap();
//!     assert!(store.has(b"k").unwrap());
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod contract;
pub mod fixtures;
pub mod generators;
pub mod model;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::contract::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::model::*;
}

pub use fixtures::*;
pub use generators::*;
pub use model::*;
