//! Data types for key-value operations.

/// A logical range scan, inclusive on both ends.
///
/// Bounds are logical keys in the facade's own scope; the facade translates
/// them into the backend's absolute key space. A missing bound leaves that
/// side open, and a `limit` of zero yields nothing.
///
/// # Example
///
/// ```ignore
/// let scan = Scan::new().start("record:2").end("record:3");
/// let first_two = Scan::new().limit(2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scan {
    pub start: Option<String>,
    pub end: Option<String>,
    pub limit: Option<usize>,
}

impl Scan {
    /// A scan over every key in scope.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(mut self, start: impl Into<String>) -> Self {
        self.start = Some(start.into());
        self
    }

    pub fn end(mut self, end: impl Into<String>) -> Self {
        self.end = Some(end.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A logical key and its decoded value, yielded by entry scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<V> {
    /// The key with the scope prefix stripped.
    pub key: String,
    /// The decoded value.
    pub value: V,
}
