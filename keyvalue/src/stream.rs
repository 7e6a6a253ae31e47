//! Lazy scan results in logical key space.
//!
//! Each stream wraps one backend iterator and strips the scope prefix from
//! every key as it is pulled. Streams are single pass; call the scan again to
//! restart. Dropping a stream early releases the backend iterator.

use std::marker::PhantomData;

use common::{KeyIterator, RecordIterator};

use crate::codec::Codec;
use crate::error::Result;
use crate::model::Entry;
use crate::prefixer::Prefixer;

/// Ordered stream of logical keys.
pub struct KeyStream {
    inner: Box<dyn KeyIterator + Send + 'static>,
    prefixer: Prefixer,
}

impl KeyStream {
    pub(crate) fn new(inner: Box<dyn KeyIterator + Send + 'static>, prefixer: Prefixer) -> Self {
        Self { inner, prefixer }
    }

    /// Returns the next key, or None if the scan is complete.
    pub async fn next(&mut self) -> Result<Option<String>> {
        match self.inner.next().await? {
            Some(key) => Ok(Some(self.prefixer.to_logical(&key)?)),
            None => Ok(None),
        }
    }

    /// Drains the remaining keys.
    pub async fn collect(mut self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        while let Some(key) = self.next().await? {
            keys.push(key);
        }
        Ok(keys)
    }
}

/// Ordered stream of logical keys with decoded values.
pub struct EntryStream<V, C> {
    inner: Box<dyn RecordIterator + Send + 'static>,
    prefixer: Prefixer,
    codec: C,
    _value: PhantomData<fn() -> V>,
}

impl<V, C: Codec<V>> EntryStream<V, C> {
    pub(crate) fn new(
        inner: Box<dyn RecordIterator + Send + 'static>,
        prefixer: Prefixer,
        codec: C,
    ) -> Self {
        Self {
            inner,
            prefixer,
            codec,
            _value: PhantomData,
        }
    }

    /// Returns the next entry, or None if the scan is complete.
    pub async fn next(&mut self) -> Result<Option<Entry<V>>> {
        match self.inner.next().await? {
            Some(record) => Ok(Some(Entry {
                key: self.prefixer.to_logical(&record.key)?,
                value: self.codec.decode(&record.value)?,
            })),
            None => Ok(None),
        }
    }

    /// Drains the remaining entries.
    pub async fn collect(mut self) -> Result<Vec<Entry<V>>> {
        let mut entries = Vec::new();
        while let Some(entry) = self.next().await? {
            entries.push(entry);
        }
        Ok(entries)
    }
}

/// Ordered stream of decoded values, the value half of an [`EntryStream`].
pub struct ValueStream<V, C> {
    entries: EntryStream<V, C>,
}

impl<V, C: Codec<V>> ValueStream<V, C> {
    pub(crate) fn new(entries: EntryStream<V, C>) -> Self {
        Self { entries }
    }

    pub async fn next(&mut self) -> Result<Option<V>> {
        Ok(self.entries.next().await?.map(|entry| entry.value))
    }

    pub async fn collect(mut self) -> Result<Vec<V>> {
        let mut values = Vec::new();
        while let Some(value) = self.next().await? {
            values.push(value);
        }
        Ok(values)
    }
}
