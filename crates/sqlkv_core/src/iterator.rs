//! Paged range iteration.
//!
//! Backends expose their rows through a [`PageSource`]; [`RangeIterator`]
//! turns that into the [`KvIterator`] state machine. Rows are pulled one page
//! at a time, so memory stays bounded by the page size regardless of how many
//! rows the range covers, and no engine cursor is held between calls.
//!
//! ```text
//! Created --first fetch--> Valid | Exhausted
//! Valid   --next-------->  Valid | Exhausted
//! ```
//!
//! Exhausted is terminal. A row outside `[start, end)` is treated as the end
//! of the range even if later rows would fall inside it again.

use crate::error::{check_bounds, KvError, KvResult};
use crate::kv::KvIterator;
use std::collections::VecDeque;
use tracing::trace;

/// A decoded `(key, value)` row.
pub type Entry = (Vec<u8>, Vec<u8>);

/// The `[start, end)` bounds and direction of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRange {
    start: Option<Vec<u8>>,
    end: Option<Vec<u8>>,
    reverse: bool,
}

impl ScanRange {
    /// Creates a scan range.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::EmptyKey`] if a bound is present but empty.
    pub fn new(start: Option<&[u8]>, end: Option<&[u8]>, reverse: bool) -> KvResult<Self> {
        check_bounds(start, end)?;
        Ok(Self {
            start: start.map(<[u8]>::to_vec),
            end: end.map(<[u8]>::to_vec),
            reverse,
        })
    }

    /// Inclusive lower bound.
    #[must_use]
    pub fn start(&self) -> Option<&[u8]> {
        self.start.as_deref()
    }

    /// Exclusive upper bound.
    #[must_use]
    pub fn end(&self) -> Option<&[u8]> {
        self.end.as_deref()
    }

    /// Whether the scan runs in descending key order.
    #[must_use]
    pub fn is_reverse(&self) -> bool {
        self.reverse
    }

    /// Returns whether `key` lies within `[start, end)`.
    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        if let Some(start) = self.start() {
            if key < start {
                return false;
            }
        }
        if let Some(end) = self.end() {
            if key >= end {
                return false;
            }
        }
        true
    }
}

/// Supplies rows to a [`RangeIterator`].
pub trait PageSource: Send {
    /// Fetches up to `limit` rows of `range` in scan order, each key appearing
    /// at most once, starting strictly after `resume_after` in scan order.
    ///
    /// Returning fewer than `limit` rows signals the end of the range.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn fetch(
        &mut self,
        range: &ScanRange,
        resume_after: Option<&[u8]>,
        limit: usize,
    ) -> KvResult<Vec<Entry>>;
}

/// A [`KvIterator`] over rows pulled page by page from a [`PageSource`].
pub struct RangeIterator<S> {
    source: S,
    range: ScanRange,
    page_size: usize,
    page: VecDeque<Entry>,
    /// Last key handed over by the source; the next page starts after it.
    resume_after: Option<Vec<u8>>,
    source_exhausted: bool,
    key: Vec<u8>,
    value: Vec<u8>,
    valid: bool,
    closed: bool,
    err: Option<KvError>,
}

impl<S: PageSource> RangeIterator<S> {
    /// Creates an iterator positioned on the first row of `range`.
    ///
    /// # Errors
    ///
    /// Returns an error if the first page cannot be fetched.
    pub fn new(source: S, range: ScanRange, page_size: usize) -> KvResult<Self> {
        let mut itr = Self {
            source,
            range,
            page_size: page_size.max(1),
            page: VecDeque::new(),
            resume_after: None,
            source_exhausted: false,
            key: Vec::new(),
            value: Vec::new(),
            valid: false,
            closed: false,
            err: None,
        };
        itr.fill_page()?;
        itr.advance();
        Ok(itr)
    }

    /// Returns whether the iterator scans in descending order.
    #[must_use]
    pub fn is_reverse(&self) -> bool {
        self.range.is_reverse()
    }

    fn fill_page(&mut self) -> KvResult<()> {
        let rows = self
            .source
            .fetch(&self.range, self.resume_after.as_deref(), self.page_size)?;
        trace!(
            rows = rows.len(),
            reverse = self.range.is_reverse(),
            "fetched iterator page"
        );
        if rows.len() < self.page_size {
            self.source_exhausted = true;
        }
        if let Some((key, _)) = rows.last() {
            self.resume_after = Some(key.clone());
        }
        self.page.extend(rows);
        Ok(())
    }

    fn advance(&mut self) {
        if self.page.is_empty() && !self.source_exhausted {
            if let Err(err) = self.fill_page() {
                self.err = Some(err);
                self.valid = false;
                return;
            }
        }
        match self.page.pop_front() {
            Some((key, value)) => {
                self.key = key;
                self.value = value;
                self.valid = true;
            }
            None => self.valid = false,
        }
    }

    fn assert_valid(&self) {
        assert!(self.valid, "iterator is invalid");
    }
}

impl<S: PageSource> KvIterator for RangeIterator<S> {
    fn domain(&self) -> (Option<&[u8]>, Option<&[u8]>) {
        (self.range.start(), self.range.end())
    }

    fn valid(&mut self) -> bool {
        if !self.valid || self.closed || self.err.is_some() {
            self.valid = false;
            return false;
        }
        // The query already filtered by the bounds; re-check so that an engine
        // comparison quirk can never surface a key outside the range.
        if !self.range.contains(&self.key) {
            self.valid = false;
            return false;
        }
        true
    }

    fn next(&mut self) {
        self.assert_valid();
        self.advance();
    }

    fn key(&self) -> Vec<u8> {
        self.assert_valid();
        self.key.clone()
    }

    fn value(&self) -> Vec<u8> {
        self.assert_valid();
        self.value.clone()
    }

    fn error(&self) -> Option<&KvError> {
        self.err.as_ref()
    }

    fn take_error(&mut self) -> Option<KvError> {
        self.err.take()
    }

    fn close(&mut self) -> KvResult<()> {
        self.closed = true;
        self.valid = false;
        self.page.clear();
        self.source_exhausted = true;
        Ok(())
    }
}
