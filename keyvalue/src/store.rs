//! Single-key accessor.

use std::future::Future;

use common::WriteOp;

use crate::codec::Codec;
use crate::error::Result;
use crate::keyvalue::Kv;

/// A [`Kv`] bound to one logical key.
///
/// # Example
///
/// ```ignore
/// let settings = kv.store("settings");
/// let current = settings.guarantee(|| async { Ok(Settings::default()) }).await?;
///
/// // fold the store's write into a larger transaction
/// kv.transaction(|w| Ok(vec![settings.write(updated)?, w.del(["stale"])])).await?;
/// ```
pub struct Store<V, C> {
    kv: Kv<V, C>,
    key: String,
}

impl<V, C: Clone> Clone for Store<V, C> {
    fn clone(&self) -> Self {
        Self {
            kv: self.kv.clone(),
            key: self.key.clone(),
        }
    }
}

impl<V, C: Codec<V>> Store<V, C> {
    pub(crate) fn new(kv: Kv<V, C>, key: &str) -> Self {
        Self {
            kv,
            key: key.to_string(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn get(&self) -> Result<Option<V>> {
        self.kv.get(&self.key).await
    }

    pub async fn require(&self) -> Result<V> {
        self.kv.require(&self.key).await
    }

    pub async fn has(&self) -> Result<bool> {
        self.kv.has(&self.key).await
    }

    /// Stores a value, or deletes the key when the value is `None`.
    pub async fn set(&self, value: impl Into<Option<V>>) -> Result<()> {
        self.kv.set(&self.key, value).await
    }

    pub async fn del(&self) -> Result<()> {
        self.kv.del([self.key.as_str()]).await
    }

    pub async fn guarantee<F, Fut>(&self, make: F) -> Result<V>
    where
        V: Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        self.kv.guarantee(&self.key, make).await
    }

    /// Builds the ops for setting this key without applying them.
    pub fn write(&self, value: impl Into<Option<V>>) -> Result<Vec<WriteOp>> {
        self.kv.writer().set(&self.key, value)
    }
}
