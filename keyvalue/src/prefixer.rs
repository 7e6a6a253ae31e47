//! Prefix composition for scoped keys.
//!
//! ```text
//! absolute key: | segment (divisor segment)* | delimiter | logical key |
//! ```
//!
//! An unscoped prefixer has an empty prefix and leaves keys unchanged.

use bytes::{BufMut, Bytes, BytesMut};
use common::ScanBounds;

use crate::error::{Error, Result};
use crate::model::Scan;

/// Upper scan bound appended to the prefix when a scan has no end.
///
/// `0xFF` never occurs in UTF-8, so it sorts after every logical key sharing
/// the prefix.
pub const SCAN_END: u8 = 0xFF;

/// Maps logical keys into a scope's absolute key space and back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefixer {
    path: Vec<String>,
    divisor: String,
    delimiter: String,
    prefix: String,
}

impl Prefixer {
    pub fn new(
        path: Vec<String>,
        divisor: impl Into<String>,
        delimiter: impl Into<String>,
    ) -> Self {
        let divisor = divisor.into();
        let delimiter = delimiter.into();
        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{}{}", path.join(&divisor), delimiter)
        };
        Self {
            path,
            divisor,
            delimiter,
            prefix,
        }
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn divisor(&self) -> &str {
        &self.divisor
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// The string every absolute key in this scope starts with.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns a prefixer one scope deeper.
    ///
    /// The child keeps this prefixer's delimiter unless `delimiter` overrides it.
    pub fn child(&self, name: &str, delimiter: Option<&str>) -> Self {
        let mut path = self.path.clone();
        path.push(name.to_string());
        let delimiter = delimiter.unwrap_or(&self.delimiter);
        Self::new(path, self.divisor.clone(), delimiter)
    }

    /// Returns the same scope with a different delimiter.
    pub fn with_delimiter(&self, delimiter: &str) -> Self {
        Self::new(self.path.clone(), self.divisor.clone(), delimiter)
    }

    pub fn to_absolute(&self, key: &str) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.prefix.len() + key.len());
        buf.put_slice(self.prefix.as_bytes());
        buf.put_slice(key.as_bytes());
        buf.freeze()
    }

    /// Strips exactly the prefix length from an absolute key.
    ///
    /// The key is trusted to carry this prefix; only its length is checked.
    pub fn to_logical(&self, absolute: &[u8]) -> Result<String> {
        let logical = absolute.get(self.prefix.len()..).ok_or_else(|| {
            Error::Encoding(format!(
                "key too short: expected at least {} bytes, got {}",
                self.prefix.len(),
                absolute.len()
            ))
        })?;
        String::from_utf8(logical.to_vec())
            .map_err(|e| Error::Encoding(format!("logical key is not UTF-8: {}", e)))
    }

    /// Translates a logical scan into absolute bounds for this scope.
    pub fn scope_bounds(&self, scan: &Scan) -> ScanBounds {
        let start = self.to_absolute(scan.start.as_deref().unwrap_or(""));
        let end = match &scan.end {
            Some(end) => self.to_absolute(end),
            None => {
                let mut buf = BytesMut::with_capacity(self.prefix.len() + 1);
                buf.put_slice(self.prefix.as_bytes());
                buf.put_u8(SCAN_END);
                buf.freeze()
            }
        };
        ScanBounds::new(Some(start), Some(end), scan.limit)
    }
}
