//! Pending batch operations.

use crate::error::{check_key, check_value, KvError, KvResult};

/// A buffered batch operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Insert or overwrite a value.
    Set {
        /// Record key.
        key: Vec<u8>,
        /// Record value.
        value: Vec<u8>,
    },
    /// Remove a key.
    Delete {
        /// Record key.
        key: Vec<u8>,
    },
}

impl BatchOp {
    /// Returns the key this operation targets.
    #[must_use]
    pub fn key(&self) -> &[u8] {
        match self {
            Self::Set { key, .. } | Self::Delete { key } => key,
        }
    }
}

/// Append-only operation log plus the running byte size of a batch.
///
/// Validation mirrors the store: key first, then value, then the open state.
#[derive(Debug, Default)]
pub(crate) struct PendingOps {
    ops: Vec<BatchOp>,
    size: usize,
}

impl PendingOps {
    pub(crate) fn push_set(&mut self, open: bool, key: &[u8], value: Option<&[u8]>) -> KvResult<()> {
        check_key(key)?;
        let value = check_value(value)?;
        if !open {
            return Err(KvError::BatchClosed);
        }
        self.size += key.len() + value.len();
        self.ops.push(BatchOp::Set {
            key: key.to_vec(),
            value: value.to_vec(),
        });
        Ok(())
    }

    pub(crate) fn push_delete(&mut self, open: bool, key: &[u8]) -> KvResult<()> {
        check_key(key)?;
        if !open {
            return Err(KvError::BatchClosed);
        }
        self.size += key.len();
        self.ops.push(BatchOp::Delete { key: key.to_vec() });
        Ok(())
    }

    pub(crate) fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }

    pub(crate) fn clear(&mut self) {
        self.ops.clear();
        self.size = 0;
    }
}
