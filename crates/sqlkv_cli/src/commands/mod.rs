//! CLI command implementations.

pub mod point;
pub mod scan;
pub mod stats;

use serde::Serialize;
use sqlkv_core::to_hex;

/// Result type shared by the commands.
pub type CommandResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// One entry as printed by the CLI, both sides in uppercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryRow {
    /// Key bytes as hex.
    pub key: String,
    /// Value bytes as hex.
    pub value: String,
}

impl EntryRow {
    /// Renders a raw entry.
    pub fn new(key: &[u8], value: &[u8]) -> Self {
        Self {
            key: to_hex(key),
            value: to_hex(value),
        }
    }

    /// Text form, matching the store's print format.
    pub fn to_line(&self) -> String {
        format!("[{}]:\t[{}]", self.key, self.value)
    }
}
