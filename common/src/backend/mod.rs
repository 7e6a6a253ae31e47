pub mod config;
pub mod factory;
pub mod file;
pub mod in_memory;
#[cfg(feature = "slatedb")]
pub mod slate;

use async_trait::async_trait;
use bytes::Bytes;

use crate::ScanBounds;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub key: Bytes,
    pub value: Bytes,
}

impl Record {
    pub fn new(key: Bytes, value: Bytes) -> Self {
        Self { key, value }
    }
}

/// A single operation inside an atomic write batch.
///
/// Absence of a value is always expressed as [`WriteOp::Delete`]; there is no
/// stored null.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOp {
    Put(Record),
    Delete(Bytes),
}

impl WriteOp {
    pub fn put(key: Bytes, value: Bytes) -> Self {
        WriteOp::Put(Record::new(key, value))
    }

    pub fn delete(key: Bytes) -> Self {
        WriteOp::Delete(key)
    }
}

/// Error type for backend operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Failures reported by the underlying store
    Storage(String),
    /// Internal errors
    Internal(String),
}

impl std::error::Error for BackendError {}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            BackendError::Storage(msg) => write!(f, "Storage error: {}", msg),
            BackendError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl BackendError {
    /// Converts a store error to BackendError::Storage.
    pub fn from_storage(e: impl std::fmt::Display) -> Self {
        BackendError::Storage(e.to_string())
    }
}

/// Result type alias for backend operations
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Iterator over backend records in ascending key order.
///
/// Iterators are owned and hold whatever backend resource they need until
/// dropped, so a consumer may stop at any point.
#[async_trait]
pub trait RecordIterator {
    async fn next(&mut self) -> BackendResult<Option<Record>>;
}

/// Iterator over backend keys in ascending order.
#[async_trait]
pub trait KeyIterator {
    async fn next(&mut self) -> BackendResult<Option<Bytes>>;
}

/// The minimal storage contract the key-value layer sits on.
///
/// Every key a backend sees is absolute: scoping and prefixing happen above
/// this trait. Implementations must apply a write batch atomically and in
/// list order, so a later operation on the same key wins.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Looks up every key, returning values in the same order and length.
    async fn gets(&self, keys: &[Bytes]) -> BackendResult<Vec<Option<Bytes>>>;

    /// Checks every key for existence, in the same order and length.
    ///
    /// The default implementation reads the values and discards them.
    /// Backends with a cheaper existence check should override it.
    #[tracing::instrument(level = "trace", skip_all)]
    async fn has_keys(&self, keys: &[Bytes]) -> BackendResult<Vec<bool>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let values = self.gets(keys).await?;
        Ok(values.iter().map(Option::is_some).collect())
    }

    /// Returns an iterator over records within the inclusive bounds, ordered
    /// by key and capped at `bounds.limit`.
    async fn scan_entries(
        &self,
        bounds: &ScanBounds,
    ) -> BackendResult<Box<dyn RecordIterator + Send + 'static>>;

    /// Returns an iterator over keys within the inclusive bounds.
    ///
    /// The default implementation drops the values of [`scan_entries`](Self::scan_entries).
    #[tracing::instrument(level = "trace", skip_all)]
    async fn scan_keys(
        &self,
        bounds: &ScanBounds,
    ) -> BackendResult<Box<dyn KeyIterator + Send + 'static>> {
        let inner = self.scan_entries(bounds).await?;
        Ok(Box::new(RecordKeys { inner }))
    }

    /// Applies a batch of puts and deletes atomically.
    ///
    /// Either every operation becomes visible or none does.
    async fn apply(&self, ops: Vec<WriteOp>) -> BackendResult<()>;

    /// Flushes pending writes to durable storage.
    async fn flush(&self) -> BackendResult<()> {
        Ok(())
    }

    /// Releases any resources held by the backend.
    async fn close(&self) -> BackendResult<()> {
        Ok(())
    }
}

/// Adapts a record iterator into a key iterator.
struct RecordKeys {
    inner: Box<dyn RecordIterator + Send + 'static>,
}

#[async_trait]
impl KeyIterator for RecordKeys {
    async fn next(&mut self) -> BackendResult<Option<Bytes>> {
        Ok(self.inner.next().await?.map(|record| record.key))
    }
}

/// Iterator over records materialized up front.
///
/// Used by backends that must read under a lock and cannot hold it across
/// the lifetime of the iterator.
pub struct BufferedIterator {
    records: std::vec::IntoIter<Record>,
}

impl BufferedIterator {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: records.into_iter(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl RecordIterator for BufferedIterator {
    async fn next(&mut self) -> BackendResult<Option<Record>> {
        Ok(self.records.next())
    }
}

#[async_trait]
impl KeyIterator for BufferedIterator {
    async fn next(&mut self) -> BackendResult<Option<Bytes>> {
        Ok(self.records.next().map(|record| record.key))
    }
}
