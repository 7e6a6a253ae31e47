use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use slatedb::{Db, DbIterator, WriteBatch};

use super::{
    Backend, BackendError, BackendResult, BufferedIterator, Record, RecordIterator, WriteOp,
};
use crate::ScanBounds;

/// Ordered, log-structured backend over SlateDB.
///
/// Scans use SlateDB's native range iterator and a write batch maps onto a
/// single [`WriteBatch`], which SlateDB applies atomically.
pub struct SlateDbBackend {
    db: Arc<Db>,
}

impl SlateDbBackend {
    pub fn new(db: Arc<Db>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Backend for SlateDbBackend {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn gets(&self, keys: &[Bytes]) -> BackendResult<Vec<Option<Bytes>>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            let value = self
                .db
                .get(key)
                .await
                .map_err(BackendError::from_storage)?;
            values.push(value);
        }
        Ok(values)
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn scan_entries(
        &self,
        bounds: &ScanBounds,
    ) -> BackendResult<Box<dyn RecordIterator + Send + 'static>> {
        if bounds.is_empty() {
            return Ok(Box::new(BufferedIterator::empty()));
        }

        let inner = self
            .db
            .scan(bounds.as_range())
            .await
            .map_err(BackendError::from_storage)?;
        Ok(Box::new(SlateDbIterator {
            inner,
            bounds: bounds.clone(),
            yielded: 0,
        }))
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn apply(&self, ops: Vec<WriteOp>) -> BackendResult<()> {
        let mut batch = WriteBatch::new();
        for op in ops {
            match op {
                WriteOp::Put(record) => batch.put(&record.key, &record.value),
                WriteOp::Delete(key) => batch.delete(&key),
            }
        }
        self.db
            .write(batch)
            .await
            .map_err(BackendError::from_storage)
    }

    async fn flush(&self) -> BackendResult<()> {
        self.db.flush().await.map_err(BackendError::from_storage)
    }

    async fn close(&self) -> BackendResult<()> {
        self.db.close().await.map_err(BackendError::from_storage)
    }
}

struct SlateDbIterator {
    inner: DbIterator,
    bounds: ScanBounds,
    yielded: usize,
}

#[async_trait]
impl RecordIterator for SlateDbIterator {
    async fn next(&mut self) -> BackendResult<Option<Record>> {
        if self.bounds.limit_reached(self.yielded) {
            return Ok(None);
        }
        let kv = self
            .inner
            .next()
            .await
            .map_err(BackendError::from_storage)?;
        self.yielded += 1;
        Ok(kv.map(|kv| Record::new(kv.key, kv.value)))
    }
}
