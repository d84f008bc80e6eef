//! Property-based test generators using proptest.
//!
//! Keys are drawn from a deliberately small alphabet so that generated
//! operation sequences overwrite and delete the same keys often.

use proptest::prelude::*;

/// Strategy for generating valid (non-empty) keys.
pub fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..4, 1..4)
}

/// Strategy for generating values, including the empty value.
pub fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..16)
}

/// Strategy for generating an optional range bound.
pub fn bound_strategy() -> impl Strategy<Value = Option<Vec<u8>>> {
    prop::option::of(key_strategy())
}

/// A write applied to both the store under test and the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelOp {
    /// Set a key
    Set {
        /// Record key
        key: Vec<u8>,
        /// Record value
        value: Vec<u8>,
    },
    /// Delete a key
    Delete {
        /// Record key
        key: Vec<u8>,
    },
}

impl ModelOp {
    /// Returns the key this operation targets.
    #[must_use]
    pub fn key(&self) -> &[u8] {
        match self {
            Self::Set { key, .. } | Self::Delete { key } => key,
        }
    }
}

/// Strategy for generating a single write.
pub fn model_op_strategy() -> impl Strategy<Value = ModelOp> {
    prop_oneof![
        3 => (key_strategy(), value_strategy())
            .prop_map(|(key, value)| ModelOp::Set { key, value }),
        1 => key_strategy().prop_map(|key| ModelOp::Delete { key }),
    ]
}

/// Strategy for generating a sequence of writes.
pub fn op_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<ModelOp>> {
    prop::collection::vec(model_op_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    ///
    /// Every SQLite-backed case opens a database file, so this is the
    /// default for tests that touch disk.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn keys_are_never_empty(key in key_strategy()) {
            prop_assert!(!key.is_empty());
        }

        #[test]
        fn bounds_are_never_empty(bound in bound_strategy()) {
            prop_assert!(bound.map_or(true, |b| !b.is_empty()));
        }

        #[test]
        fn sequences_respect_length(ops in op_sequence_strategy(2, 10)) {
            prop_assert!((2..10).contains(&ops.len()));
            for op in &ops {
                prop_assert!(!op.key().is_empty());
            }
        }
    }
}
