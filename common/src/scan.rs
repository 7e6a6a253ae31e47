//! Absolute scan bounds and the bound matcher.
//!
//! Backends receive a [`ScanBounds`] already translated into their absolute
//! key space. Ordered backends hand the bounds straight to their native range
//! iterator; backends whose enumeration is unordered filter every key through
//! [`scan_match`] instead.

use std::ops::Bound;

use bytes::Bytes;

/// An absolute key range, inclusive on both ends, with an optional cap on the
/// number of items a scan may yield.
///
/// A missing `start` or `end` leaves that side unbounded. A `limit` of
/// `Some(0)` yields nothing; `None` is unbounded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanBounds {
    pub start: Option<Bytes>,
    pub end: Option<Bytes>,
    pub limit: Option<usize>,
}

impl ScanBounds {
    pub fn new(start: Option<Bytes>, end: Option<Bytes>, limit: Option<usize>) -> Self {
        Self { start, end, limit }
    }

    /// Bounds that match every key with no limit.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Returns true if `key` falls within the start/end bounds.
    ///
    /// The limit plays no part in membership.
    pub fn contains(&self, key: &[u8]) -> bool {
        scan_match(key, self)
    }

    /// Returns true if no scan over these bounds can yield anything, either
    /// because the limit is zero or because `start` sorts after `end`.
    pub fn is_empty(&self) -> bool {
        if self.limit == Some(0) {
            return true;
        }
        match (&self.start, &self.end) {
            (Some(start), Some(end)) => start > end,
            _ => false,
        }
    }

    /// Returns true once `count` items have been yielded and the limit is hit.
    pub fn limit_reached(&self, count: usize) -> bool {
        self.limit.is_some_and(|limit| count >= limit)
    }

    /// Converts the bounds to a `(Bound, Bound)` pair for native range APIs.
    ///
    /// Callers must check [`is_empty`](Self::is_empty) first: range APIs such
    /// as `BTreeMap::range` panic when start sorts after end.
    pub fn as_range(&self) -> (Bound<Bytes>, Bound<Bytes>) {
        let start = match &self.start {
            Some(start) => Bound::Included(start.clone()),
            None => Bound::Unbounded,
        };
        let end = match &self.end {
            Some(end) => Bound::Included(end.clone()),
            None => Bound::Unbounded,
        };
        (start, end)
    }
}

/// Decides whether `key` lies within the inclusive `[start, end]` bounds
/// using plain lexicographic byte order.
pub fn scan_match(key: &[u8], bounds: &ScanBounds) -> bool {
    if let Some(start) = &bounds.start {
        if key < start.as_ref() {
            return false;
        }
    }
    if let Some(end) = &bounds.end {
        if key > end.as_ref() {
            return false;
        }
    }
    true
}
