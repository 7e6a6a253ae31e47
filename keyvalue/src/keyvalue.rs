//! The scoped key-value facade.

use std::future::Future;
use std::sync::Arc;

use common::{Backend, WriteOp, create_backend};

use crate::chunks::chunks;
use crate::codec::{Codec, JsonCodec};
use crate::config::{Config, KvOptions};
use crate::error::{Error, Result};
use crate::model::Scan;
use crate::prefixer::Prefixer;
use crate::store::Store;
use crate::stream::{EntryStream, KeyStream, ValueStream};
use crate::writer::Writer;

/// A key-value view over a shared backend, confined to one scope.
///
/// Every logical key is mapped through the facade's [`Prefixer`] before it
/// reaches the backend, and every key read back is mapped through the
/// inverse. Narrowing with [`scope`](Kv::scope), [`flatten`](Kv::flatten) or
/// [`store`](Kv::store) returns a new view over the same backend; a facade is
/// never mutated in place.
///
/// Writes are built by a [`Writer`] and applied through
/// [`transaction`](Kv::transaction), which issues exactly one atomic backend
/// apply. Writers of different scopes can contribute to one transaction.
///
/// # Example
///
/// ```ignore
/// use nskv::{Kv, Scan};
///
/// let root: Kv<u32> = Kv::new(backend);
/// let users = root.scope("users");
///
/// users.set("alice", 30).await?;
/// assert_eq!(users.get("alice").await?, Some(30));
///
/// // one atomic write across two scopes
/// let audit = root.scope("audit");
/// root.transaction(|w| {
///     Ok(vec![w.set("count", 1)?, audit.writer().set("last", 30)?])
/// })
/// .await?;
///
/// let keys = users.keys(&Scan::new().limit(10)).await?.collect().await?;
/// ```
pub struct Kv<V, C = JsonCodec> {
    backend: Arc<dyn Backend>,
    writer: Writer<V, C>,
    chunk_size: usize,
}

impl<V, C: Clone> Clone for Kv<V, C> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            writer: self.writer.clone(),
            chunk_size: self.chunk_size,
        }
    }
}

impl<V> Kv<V, JsonCodec>
where
    JsonCodec: Codec<V>,
{
    /// Creates an unscoped facade with default options and JSON values.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_options(backend, KvOptions::default())
    }

    pub fn with_options(backend: Arc<dyn Backend>, options: KvOptions) -> Self {
        Self::with_codec(backend, options, JsonCodec)
    }

    /// Opens the configured backend and wraps it in a root facade.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be initialized.
    pub async fn open(config: Config) -> Result<Self> {
        let backend = create_backend(&config.backend).await?;
        Ok(Self::with_options(backend, config.options))
    }
}

impl<V, C: Codec<V>> Kv<V, C> {
    pub fn with_codec(backend: Arc<dyn Backend>, options: KvOptions, codec: C) -> Self {
        let prefixer = Prefixer::new(options.scope, options.divisor, options.delimiter);
        Self {
            backend,
            writer: Writer::new(prefixer, codec),
            chunk_size: options.chunk_size,
        }
    }

    fn derive(&self, prefixer: Prefixer) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            writer: Writer::new(prefixer, self.writer.codec().clone()),
            chunk_size: self.chunk_size,
        }
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn prefixer(&self) -> &Prefixer {
        self.writer.prefixer()
    }

    /// Returns this facade's writer, for building ops that another facade's
    /// [`transaction`](Kv::transaction) applies.
    pub fn writer(&self) -> &Writer<V, C> {
        &self.writer
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Gets the value for a key, or None if absent.
    pub async fn get(&self, key: &str) -> Result<Option<V>> {
        let mut values = self.gets(&[key]).await?;
        Ok(values.pop().flatten())
    }

    /// Gets values for several keys, in request order.
    pub async fn gets<K: AsRef<str>>(&self, keys: &[K]) -> Result<Vec<Option<V>>> {
        let absolute: Vec<_> = keys
            .iter()
            .map(|key| self.prefixer().to_absolute(key.as_ref()))
            .collect();
        let codec = self.writer.codec();
        self.backend
            .gets(&absolute)
            .await?
            .into_iter()
            .map(|value| value.map(|bytes| codec.decode(&bytes)).transpose())
            .collect()
    }

    /// Gets the value for a key that must exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the key is absent.
    pub async fn require(&self, key: &str) -> Result<V> {
        let mut values = self.requires(&[key]).await?;
        values
            .pop()
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    /// Gets values for several keys that must all exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] naming the first absent key.
    pub async fn requires<K: AsRef<str>>(&self, keys: &[K]) -> Result<Vec<V>> {
        let values = self.gets(keys).await?;
        keys.iter()
            .zip(values)
            .map(|(key, value)| value.ok_or_else(|| Error::NotFound(key.as_ref().to_string())))
            .collect()
    }

    pub async fn has(&self, key: &str) -> Result<bool> {
        let found = self.has_keys(&[key]).await?;
        Ok(found.first().copied().unwrap_or(false))
    }

    pub async fn has_keys<K: AsRef<str>>(&self, keys: &[K]) -> Result<Vec<bool>> {
        let absolute: Vec<_> = keys
            .iter()
            .map(|key| self.prefixer().to_absolute(key.as_ref()))
            .collect();
        Ok(self.backend.has_keys(&absolute).await?)
    }

    /// Scans logical keys in order within the scan's inclusive bounds.
    pub async fn keys(&self, scan: &Scan) -> Result<KeyStream> {
        let bounds = self.prefixer().scope_bounds(scan);
        let inner = self.backend.scan_keys(&bounds).await?;
        Ok(KeyStream::new(inner, self.prefixer().clone()))
    }

    /// Scans logical keys and decoded values in key order.
    pub async fn entries(&self, scan: &Scan) -> Result<EntryStream<V, C>> {
        let bounds = self.prefixer().scope_bounds(scan);
        let inner = self.backend.scan_entries(&bounds).await?;
        Ok(EntryStream::new(
            inner,
            self.prefixer().clone(),
            self.writer.codec().clone(),
        ))
    }

    /// Scans decoded values in key order.
    pub async fn values(&self, scan: &Scan) -> Result<ValueStream<V, C>> {
        Ok(ValueStream::new(self.entries(scan).await?))
    }

    /// Stores a value, or deletes the key when the value is `None`.
    pub async fn set(&self, key: &str, value: impl Into<Option<V>>) -> Result<()> {
        let value = value.into();
        self.transaction(|w| Ok(vec![w.set(key, value)?])).await
    }

    /// Stores or deletes several keys in one transaction.
    pub async fn sets<I, K>(&self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: AsRef<str>,
    {
        self.transaction(|w| Ok(vec![w.sets(pairs)?])).await
    }

    /// Deletes keys in one transaction. Absent keys are ignored.
    pub async fn del<I, K>(&self, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.transaction(|w| Ok(vec![w.del(keys)])).await
    }

    /// Applies every op built by `f` with a single atomic backend apply.
    ///
    /// `f` receives this facade's writer and returns batches of ops, which
    /// may also come from writers of other facades over the same backend.
    /// The batches are flattened in order. If `f` fails nothing is applied.
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn transaction<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&Writer<V, C>) -> Result<Vec<Vec<WriteOp>>>,
    {
        let ops: Vec<WriteOp> = f(&self.writer)?.into_iter().flatten().collect();
        tracing::debug!(ops = ops.len(), "applying transaction");
        self.backend.apply(ops).await?;
        Ok(())
    }

    /// Deletes every key matched by `scan`, returning how many were deleted.
    ///
    /// Matching keys are collected first, then deleted in transactions of at
    /// most [`chunk_size`](KvOptions::chunk_size) keys. Each chunk is atomic;
    /// the clear as a whole is not, so a failure part way leaves earlier
    /// chunks deleted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the chunk size is zero.
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn clear(&self, scan: &Scan) -> Result<usize> {
        let keys = self.keys(scan).await?.collect().await?;
        let batches = chunks(self.chunk_size, &keys)?;
        tracing::debug!(
            keys = keys.len(),
            chunk_size = self.chunk_size,
            "clearing scan"
        );
        for chunk in batches {
            self.del(chunk).await?;
        }
        Ok(keys.len())
    }

    /// Returns the stored value, first storing the output of `make` if the
    /// key is absent.
    ///
    /// The read and the write are separate backend calls, so concurrent
    /// callers on the same key may each run `make`.
    pub async fn guarantee<F, Fut>(&self, key: &str, make: F) -> Result<V>
    where
        V: Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(value) = self.get(key).await? {
            return Ok(value);
        }
        let value = make().await?;
        self.set(key, value.clone()).await?;
        Ok(value)
    }

    /// Returns a child facade with `name` appended to the scope path.
    pub fn scope(&self, name: &str) -> Self {
        self.derive(self.prefixer().child(name, None))
    }

    /// Returns a child facade whose namespace uses `delimiter` before keys.
    ///
    /// Descendants of the child inherit the override unless they set their own.
    pub fn scope_with_delimiter(&self, name: &str, delimiter: &str) -> Self {
        self.derive(self.prefixer().child(name, Some(delimiter)))
    }

    /// Returns the same scope with an empty delimiter, so scans also see keys
    /// written by descendant scopes.
    pub fn flatten(&self) -> Self {
        self.derive(self.prefixer().with_delimiter(""))
    }

    /// Returns an accessor bound to one logical key.
    pub fn store(&self, key: &str) -> Store<V, C> {
        Store::new(self.clone(), key)
    }

    /// Returns the same scope read and written as a different value type.
    pub fn typed<X>(&self) -> Kv<X, C>
    where
        C: Codec<X>,
    {
        Kv {
            backend: Arc::clone(&self.backend),
            writer: Writer::new(self.prefixer().clone(), self.writer.codec().clone()),
            chunk_size: self.chunk_size,
        }
    }

    /// Runs `migrate` once per schema upgrade, tracked by a version at `key`.
    ///
    /// The stored version is 0 when absent or not an unsigned integer. When it
    /// equals `latest` nothing happens; otherwise `migrate` is awaited with the
    /// stored version and `latest` is written only after it succeeds.
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn version_migration<F, Fut>(
        &self,
        key: &str,
        latest: u64,
        migrate: F,
    ) -> Result<()>
    where
        C: Codec<u64>,
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let versions = self.typed::<u64>();
        let current = match versions.get(key).await {
            Ok(version) => version.unwrap_or(0),
            Err(Error::Encoding(_)) => 0,
            Err(err) => return Err(err),
        };
        if current == latest {
            return Ok(());
        }

        tracing::debug!(key, from = current, to = latest, "running version migration");
        migrate(current).await?;
        versions.set(key, latest).await
    }

    /// Flushes pending backend writes to durable storage.
    pub async fn flush(&self) -> Result<()> {
        Ok(self.backend.flush().await?)
    }

    /// Closes the backend. Every facade over the same backend is affected.
    pub async fn close(&self) -> Result<()> {
        Ok(self.backend.close().await?)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use common::KeyIterator;
    use common::backend::in_memory::MemoryBackend;

    use super::*;

    fn kv() -> Kv<String> {
        Kv::new(Arc::new(MemoryBackend::new()))
    }

    async fn raw_keys(kv: &Kv<String>) -> Vec<Bytes> {
        let mut iter = kv
            .backend()
            .scan_keys(&common::ScanBounds::unbounded())
            .await
            .unwrap();
        let mut keys = vec![];
        while let Some(key) = iter.next().await.unwrap() {
            keys.push(key);
        }
        keys
    }

    #[tokio::test]
    async fn should_open_with_in_memory_config() {
        // when
        let kv: Kv<String> = Kv::open(Config::default()).await.unwrap();

        // then
        assert_eq!(kv.prefixer().prefix(), "");
        assert_eq!(kv.chunk_size(), 10_000);
    }

    #[tokio::test]
    async fn should_open_with_configured_scope() {
        // given
        let config = Config::from_toml_str("[options]\nscope = [\"app\"]").unwrap();

        // when
        let kv: Kv<String> = Kv::open(config).await.unwrap();
        kv.set("k", "v".to_string()).await.unwrap();

        // then
        assert_eq!(raw_keys(&kv).await, vec![Bytes::from("app:k")]);
    }

    #[tokio::test]
    async fn should_set_and_get_single_key() {
        // given
        let kv = kv();

        // when
        kv.set("user:123", "alice".to_string()).await.unwrap();

        // then
        assert_eq!(kv.get("user:123").await.unwrap(), Some("alice".to_string()));
    }

    #[tokio::test]
    async fn should_return_none_for_missing_key() {
        // given
        let kv = kv();
        kv.set("existing", "value".to_string()).await.unwrap();

        // when
        let result = kv.get("missing").await.unwrap();

        // then
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn should_overwrite_existing_key() {
        // given
        let kv = kv();
        kv.set("key", "old-value".to_string()).await.unwrap();

        // when
        kv.set("key", "new-value".to_string()).await.unwrap();

        // then
        assert_eq!(kv.get("key").await.unwrap(), Some("new-value".to_string()));
    }

    #[tokio::test]
    async fn should_get_many_in_request_order() {
        // given
        let kv = kv();
        kv.sets([("a", Some("1".to_string())), ("b", Some("2".to_string()))])
            .await
            .unwrap();

        // when
        let values = kv.gets(&["b", "missing", "a"]).await.unwrap();

        // then
        assert_eq!(
            values,
            vec![Some("2".to_string()), None, Some("1".to_string())]
        );
    }

    #[tokio::test]
    async fn should_fail_require_for_missing_key() {
        // given
        let kv = kv();
        kv.set("present", "x".to_string()).await.unwrap();

        // when
        let single = kv.require("absent").await;
        let many = kv.requires(&["present", "absent"]).await;

        // then
        assert_eq!(single, Err(Error::NotFound("absent".to_string())));
        assert_eq!(many, Err(Error::NotFound("absent".to_string())));
        assert_eq!(kv.require("present").await.unwrap(), "x");
    }

    #[tokio::test]
    async fn should_delete_nonexistent_key_without_error() {
        // given
        let kv = kv();

        // when
        let result = kv.del(["nonexistent"]).await;

        // then
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn should_propagate_corrupt_value() {
        // given
        let kv = kv();
        kv.backend()
            .apply(vec![WriteOp::put(Bytes::from("bad"), Bytes::from("{"))])
            .await
            .unwrap();

        // when
        let result = kv.get("bad").await;

        // then
        assert!(matches!(result, Err(Error::Encoding(_))));
    }

    #[tokio::test]
    async fn should_store_scoped_keys_under_prefix() {
        // given
        let kv = kv();
        let nested = kv.scope("a").scope("b");

        // when
        nested.set("k", "v".to_string()).await.unwrap();

        // then
        assert_eq!(raw_keys(&kv).await, vec![Bytes::from("a.b:k")]);
    }

    #[tokio::test]
    async fn should_reject_transaction_when_builder_fails() {
        // given
        let kv = kv();

        // when
        let result = kv
            .transaction(|w| {
                let first = w.set("a", "1".to_string())?;
                Err::<Vec<Vec<WriteOp>>, _>(Error::InvalidConfiguration(format!(
                    "abandoned after {} ops",
                    first.len()
                )))
            })
            .await;

        // then
        assert!(result.is_err());
        assert!(!kv.has("a").await.unwrap());
    }

    #[tokio::test]
    async fn should_return_cleared_count() {
        // given
        let kv = kv();
        kv.sets((0..5).map(|i| (format!("k{}", i), Some(i.to_string()))))
            .await
            .unwrap();

        // when
        let cleared = kv.clear(&Scan::new().start("k1").end("k3")).await.unwrap();

        // then
        assert_eq!(cleared, 3);
        let remaining = kv.keys(&Scan::new()).await.unwrap().collect().await.unwrap();
        assert_eq!(remaining, vec!["k0", "k4"]);
    }

    #[tokio::test]
    async fn should_reject_clear_with_zero_chunk_size() {
        // given
        let options = KvOptions {
            chunk_size: 0,
            ..Default::default()
        };
        let kv: Kv<String> = Kv::with_options(Arc::new(MemoryBackend::new()), options);
        kv.set("k", "v".to_string()).await.unwrap();

        // when
        let result = kv.clear(&Scan::new()).await;

        // then
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
        assert!(kv.has("k").await.unwrap());
    }

    #[tokio::test]
    async fn should_read_same_scope_as_other_type() {
        // given
        let kv = kv();
        let counters = kv.typed::<u64>();

        // when
        counters.set("count", 42).await.unwrap();

        // then
        assert_eq!(counters.get("count").await.unwrap(), Some(42));
        assert!(matches!(kv.get("count").await, Err(Error::Encoding(_))));
    }
}
