//! Scan command implementation.

use super::{CommandResult, EntryRow};
use sqlkv_core::KvStore;

/// Bounds, direction and cap of a scan.
#[derive(Debug, Default)]
pub struct ScanQuery<'a> {
    /// Inclusive lower bound.
    pub start: Option<&'a str>,
    /// Exclusive upper bound.
    pub end: Option<&'a str>,
    /// Descending key order.
    pub reverse: bool,
    /// Maximum number of entries.
    pub limit: Option<usize>,
}

/// Collects the rows matched by `query`.
pub fn collect(store: &dyn KvStore, query: &ScanQuery<'_>) -> CommandResult<Vec<EntryRow>> {
    let start = query.start.map(str::as_bytes);
    let end = query.end.map(str::as_bytes);
    let mut itr = if query.reverse {
        store.reverse_iterator(start, end)?
    } else {
        store.iterator(start, end)?
    };

    let limit = query.limit.unwrap_or(usize::MAX);
    let mut rows = Vec::new();
    while rows.len() < limit && itr.valid() {
        rows.push(EntryRow::new(&itr.key(), &itr.value()));
        itr.next();
    }
    if let Some(err) = itr.error() {
        return Err(err.to_string().into());
    }
    itr.close()?;
    Ok(rows)
}

/// Runs the scan command.
pub fn run(store: &dyn KvStore, query: &ScanQuery<'_>, format: &str) -> CommandResult {
    let rows = collect(store, query)?;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&rows)?),
        _ => {
            for row in &rows {
                println!("{}", row.to_line());
            }
            println!();
            println!("{} entries", rows.len());
        }
    }
    Ok(())
}
