//! Range scans over the record table.

use super::store::Shared;
use crate::error::{KvError, KvResult};
use crate::iterator::{Entry, PageSource, RangeIterator, ScanRange};
use rusqlite::params_from_iter;
use std::sync::Arc;

/// Iterator returned by [`crate::SqliteStore::range`].
pub type SqliteIterator = RangeIterator<SqlitePageSource>;

/// Pulls de-duplicated pages of a key range from the record table.
///
/// Every page re-runs the range query with a continuation bound on the last
/// key seen, so no statement stays open between pages and the store
/// connection is only locked while a page is read.
#[derive(Debug)]
pub struct SqlitePageSource {
    shared: Arc<Shared>,
}

impl SqlitePageSource {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

/// Builds the page query for `range`.
///
/// The bound predicate is the same in both directions; only the sort order
/// and the continuation comparison follow the direction. Matching rows are
/// partitioned by key and only the newest row of each partition survives.
/// Placeholders are bound in order: start, end, continuation key.
///
/// SQLite reads a `LIMIT` above `i64::MAX` as a REAL and rejects it, so the
/// limit saturates there.
fn page_query(range: &ScanRange, resume: bool, limit: usize) -> String {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let mut clauses = Vec::with_capacity(3);
    if range.start().is_some() {
        clauses.push("key >= ?");
    }
    if range.end().is_some() {
        clauses.push("key < ?");
    }
    if resume {
        clauses.push(if range.is_reverse() { "key < ?" } else { "key > ?" });
    }
    let filter = if clauses.is_empty() {
        "1 = 1".to_string()
    } else {
        clauses.join(" AND ")
    };
    let order = if range.is_reverse() { "DESC" } else { "ASC" };

    format!(
        "SELECT x.key, x.value
         FROM (
             SELECT key, value,
                 row_number() OVER (PARTITION BY key ORDER BY id DESC) AS rn
             FROM kv_records WHERE {filter}
         ) x
         WHERE x.rn = 1 ORDER BY x.key {order} LIMIT {limit}"
    )
}

impl PageSource for SqlitePageSource {
    fn fetch(
        &mut self,
        range: &ScanRange,
        resume_after: Option<&[u8]>,
        limit: usize,
    ) -> KvResult<Vec<Entry>> {
        let sql = page_query(range, resume_after.is_some(), limit);
        let args: Vec<&[u8]> = range
            .start()
            .into_iter()
            .chain(range.end())
            .chain(resume_after)
            .collect();

        self.shared.with_conn(|conn| {
            let mut stmt = conn
                .prepare_cached(&sql)
                .map_err(|e| KvError::storage("failed to prepare iterator query", e))?;
            let rows = stmt
                .query_map(params_from_iter(args), |row| Ok((row.get(0)?, row.get(1)?)))
                .map_err(|e| KvError::storage("failed to execute iterator query", e))?;
            rows.collect::<Result<Vec<Entry>, _>>()
                .map_err(|e| KvError::storage("failed to scan row", e))
        })
    }
}
