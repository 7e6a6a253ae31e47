use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use super::{
    Backend, BackendError, BackendResult, BufferedIterator, KeyIterator, Record, RecordIterator,
    WriteOp,
};
use crate::ScanBounds;

/// Volatile backend over an ordered map.
///
/// All data lives in memory and is lost when the backend is dropped. Scans use
/// the map's native range iteration, so bounds never need filtering. A write
/// batch is applied under a single write lock acquisition, which makes it
/// atomic with respect to every reader.
#[derive(Default)]
pub struct MemoryBackend {
    data: RwLock<BTreeMap<Bytes, Bytes>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored keys.
    pub fn len(&self) -> BackendResult<usize> {
        let data = self
            .data
            .read()
            .map_err(|e| BackendError::Internal(format!("Failed to acquire read lock: {}", e)))?;
        Ok(data.len())
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> BackendResult<bool> {
        Ok(self.len()? == 0)
    }

    fn collect_range(&self, bounds: &ScanBounds) -> BackendResult<Vec<Record>> {
        if bounds.is_empty() {
            return Ok(Vec::new());
        }

        let data = self
            .data
            .read()
            .map_err(|e| BackendError::Internal(format!("Failed to acquire read lock: {}", e)))?;

        let records = data
            .range(bounds.as_range())
            .take(bounds.limit.unwrap_or(usize::MAX))
            .map(|(k, v)| Record::new(k.clone(), v.clone()))
            .collect();
        Ok(records)
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn gets(&self, keys: &[Bytes]) -> BackendResult<Vec<Option<Bytes>>> {
        let data = self
            .data
            .read()
            .map_err(|e| BackendError::Internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(keys.iter().map(|key| data.get(key).cloned()).collect())
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn has_keys(&self, keys: &[Bytes]) -> BackendResult<Vec<bool>> {
        let data = self
            .data
            .read()
            .map_err(|e| BackendError::Internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(keys.iter().map(|key| data.contains_key(key)).collect())
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn scan_entries(
        &self,
        bounds: &ScanBounds,
    ) -> BackendResult<Box<dyn RecordIterator + Send + 'static>> {
        let records = self.collect_range(bounds)?;
        Ok(Box::new(BufferedIterator::new(records)))
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn scan_keys(
        &self,
        bounds: &ScanBounds,
    ) -> BackendResult<Box<dyn KeyIterator + Send + 'static>> {
        let records = self.collect_range(bounds)?;
        Ok(Box::new(BufferedIterator::new(records)))
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn apply(&self, ops: Vec<WriteOp>) -> BackendResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| BackendError::Internal(format!("Failed to acquire write lock: {}", e)))?;

        for op in ops {
            match op {
                WriteOp::Put(record) => {
                    data.insert(record.key, record.value);
                }
                WriteOp::Delete(key) => {
                    data.remove(&key);
                }
            }
        }

        Ok(())
    }
}

/// Injected failure that fires either once or on every call.
#[cfg(feature = "test-utils")]
#[derive(Clone)]
enum Failure {
    /// Error is returned once, then automatically cleared.
    Once(BackendError),
    /// Error is returned on every subsequent call until explicitly cleared.
    Persistent(BackendError),
}

#[cfg(feature = "test-utils")]
type FailSlot = arc_swap::ArcSwap<Option<Failure>>;

/// Checks a [`FailSlot`] and returns an error if one is set.
///
/// For [`Failure::Once`], the slot is atomically swapped to `None` so the
/// error fires exactly once. For [`Failure::Persistent`], the slot is left
/// unchanged.
#[cfg(feature = "test-utils")]
fn check_failure(slot: &FailSlot) -> BackendResult<()> {
    let guard = slot.load();
    match guard.as_ref() {
        None => Ok(()),
        Some(Failure::Persistent(err)) => Err(err.clone()),
        Some(Failure::Once(_)) => {
            let prev = slot.swap(std::sync::Arc::new(None));
            match prev.as_ref() {
                Some(Failure::Once(err)) => Err(err.clone()),
                _ => Ok(()),
            }
        }
    }
}

/// A backend wrapper that delegates to an inner [`Backend`] but can inject
/// failures into `apply` and the scan methods on demand, and records every
/// `apply` call it sees.
///
/// A failed `apply` never reaches the inner backend, which models a store
/// rejecting the whole batch.
///
/// Gated behind the `test-utils` feature.
///
/// # Example
///
/// ```ignore
/// let backend = FailingBackend::wrap(Arc::new(MemoryBackend::new()));
/// backend.fail_apply_once(BackendError::Storage("disk full".into()));
/// // only the next apply call returns Err(...), then auto-clears
/// assert_eq!(backend.apply_calls(), 0);
/// ```
#[cfg(feature = "test-utils")]
pub struct FailingBackend {
    inner: std::sync::Arc<dyn Backend>,
    fail_apply: FailSlot,
    fail_scan: FailSlot,
    apply_batches: std::sync::Mutex<Vec<usize>>,
}

#[cfg(feature = "test-utils")]
impl FailingBackend {
    /// Wraps an existing backend, with all failure injections initially `None`.
    pub fn wrap(inner: std::sync::Arc<dyn Backend>) -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self {
            inner,
            fail_apply: arc_swap::ArcSwap::from_pointee(None),
            fail_scan: arc_swap::ArcSwap::from_pointee(None),
            apply_batches: std::sync::Mutex::new(Vec::new()),
        })
    }

    /// Makes `apply` return the given error on every subsequent call.
    pub fn fail_apply(&self, err: BackendError) {
        self.fail_apply
            .store(std::sync::Arc::new(Some(Failure::Persistent(err))));
    }

    /// Makes `apply` return the given error on the next call only.
    pub fn fail_apply_once(&self, err: BackendError) {
        self.fail_apply
            .store(std::sync::Arc::new(Some(Failure::Once(err))));
    }

    /// Makes `scan_keys` and `scan_entries` return the given error on every
    /// subsequent call.
    pub fn fail_scan(&self, err: BackendError) {
        self.fail_scan
            .store(std::sync::Arc::new(Some(Failure::Persistent(err))));
    }

    /// Removes every injected failure.
    pub fn clear_failures(&self) {
        self.fail_apply.store(std::sync::Arc::new(None));
        self.fail_scan.store(std::sync::Arc::new(None));
    }

    /// Returns how many times `apply` has been called, failed calls included.
    pub fn apply_calls(&self) -> usize {
        self.apply_batches().len()
    }

    /// Returns the size of every batch passed to `apply`, in call order.
    pub fn apply_batches(&self) -> Vec<usize> {
        match self.apply_batches.lock() {
            Ok(batches) => batches.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record_apply(&self, size: usize) {
        match self.apply_batches.lock() {
            Ok(mut batches) => batches.push(size),
            Err(poisoned) => poisoned.into_inner().push(size),
        }
    }
}

#[cfg(feature = "test-utils")]
#[async_trait]
impl Backend for FailingBackend {
    async fn gets(&self, keys: &[Bytes]) -> BackendResult<Vec<Option<Bytes>>> {
        self.inner.gets(keys).await
    }

    async fn has_keys(&self, keys: &[Bytes]) -> BackendResult<Vec<bool>> {
        self.inner.has_keys(keys).await
    }

    async fn scan_entries(
        &self,
        bounds: &ScanBounds,
    ) -> BackendResult<Box<dyn RecordIterator + Send + 'static>> {
        check_failure(&self.fail_scan)?;
        self.inner.scan_entries(bounds).await
    }

    async fn scan_keys(
        &self,
        bounds: &ScanBounds,
    ) -> BackendResult<Box<dyn KeyIterator + Send + 'static>> {
        check_failure(&self.fail_scan)?;
        self.inner.scan_keys(bounds).await
    }

    async fn apply(&self, ops: Vec<WriteOp>) -> BackendResult<()> {
        self.record_apply(ops.len());
        check_failure(&self.fail_apply)?;
        self.inner.apply(ops).await
    }

    async fn flush(&self) -> BackendResult<()> {
        self.inner.flush().await
    }

    async fn close(&self) -> BackendResult<()> {
        self.inner.close().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use nskv_macros::backend_test;

    use super::*;

    async fn collect_keys(backend: &dyn Backend, bounds: &ScanBounds) -> Vec<Bytes> {
        let mut iter = backend.scan_keys(bounds).await.unwrap();
        let mut keys = vec![];
        while let Some(key) = iter.next().await.unwrap() {
            keys.push(key);
        }
        keys
    }

    fn put(key: &'static str, value: &'static str) -> WriteOp {
        WriteOp::put(Bytes::from(key), Bytes::from(value))
    }

    #[backend_test]
    async fn should_return_none_when_key_not_found(backend: Arc<dyn Backend>) {
        // when
        let result = backend.gets(&[Bytes::from("missing")]).await.unwrap();

        // then
        assert_eq!(result, vec![None]);
    }

    #[backend_test]
    async fn should_get_values_in_request_order(backend: Arc<dyn Backend>) {
        // given
        backend
            .apply(vec![put("a", "1"), put("b", "2")])
            .await
            .unwrap();

        // when
        let result = backend
            .gets(&[Bytes::from("b"), Bytes::from("missing"), Bytes::from("a")])
            .await
            .unwrap();

        // then
        assert_eq!(
            result,
            vec![Some(Bytes::from("2")), None, Some(Bytes::from("1"))]
        );
    }

    #[backend_test]
    async fn should_report_existence(backend: Arc<dyn Backend>) {
        // given
        backend.apply(vec![put("a", "")]).await.unwrap();

        // when
        let result = backend
            .has_keys(&[Bytes::from("a"), Bytes::from("b")])
            .await
            .unwrap();

        // then
        assert_eq!(result, vec![true, false]);
    }

    #[backend_test]
    async fn should_apply_batch_in_order(backend: Arc<dyn Backend>) {
        // given
        let ops = vec![
            put("k", "first"),
            WriteOp::delete(Bytes::from("k")),
            put("k", "last"),
            put("gone", "x"),
            WriteOp::delete(Bytes::from("gone")),
        ];

        // when
        backend.apply(ops).await.unwrap();

        // then
        let result = backend
            .gets(&[Bytes::from("k"), Bytes::from("gone")])
            .await
            .unwrap();
        assert_eq!(result, vec![Some(Bytes::from("last")), None]);
    }

    #[backend_test]
    async fn should_scan_inclusive_bounds_in_order(backend: Arc<dyn Backend>) {
        // given
        backend
            .apply(vec![put("d", "4"), put("b", "2"), put("a", "1"), put("c", "3")])
            .await
            .unwrap();

        // when
        let bounds = ScanBounds::new(Some(Bytes::from("b")), Some(Bytes::from("c")), None);
        let keys = collect_keys(backend.as_ref(), &bounds).await;

        // then
        assert_eq!(keys, vec![Bytes::from("b"), Bytes::from("c")]);
    }

    #[backend_test]
    async fn should_stop_scan_at_limit(backend: Arc<dyn Backend>) {
        // given
        backend
            .apply(vec![put("a", "1"), put("b", "2"), put("c", "3")])
            .await
            .unwrap();

        // when
        let bounds = ScanBounds::new(None, None, Some(2));
        let mut iter = backend.scan_entries(&bounds).await.unwrap();
        let mut records = vec![];
        while let Some(record) = iter.next().await.unwrap() {
            records.push(record);
        }

        // then
        assert_eq!(
            records,
            vec![
                Record::new(Bytes::from("a"), Bytes::from("1")),
                Record::new(Bytes::from("b"), Bytes::from("2")),
            ]
        );
    }

    #[backend_test]
    async fn should_yield_nothing_for_zero_limit(backend: Arc<dyn Backend>) {
        // given
        backend.apply(vec![put("a", "1")]).await.unwrap();

        // when
        let keys = collect_keys(backend.as_ref(), &ScanBounds::new(None, None, Some(0))).await;

        // then
        assert!(keys.is_empty());
    }

    #[backend_test]
    async fn should_yield_nothing_when_start_after_end(backend: Arc<dyn Backend>) {
        // given
        backend.apply(vec![put("a", "1"), put("z", "2")]).await.unwrap();

        // when
        let bounds = ScanBounds::new(Some(Bytes::from("z")), Some(Bytes::from("a")), None);
        let keys = collect_keys(backend.as_ref(), &bounds).await;

        // then
        assert!(keys.is_empty());
    }

    #[tokio::test]
    async fn should_count_stored_keys() {
        // given
        let backend = MemoryBackend::new();
        assert!(backend.is_empty().unwrap());

        // when
        backend
            .apply(vec![put("a", "1"), put("b", "2")])
            .await
            .unwrap();

        // then
        assert_eq!(backend.len().unwrap(), 2);
    }
}
