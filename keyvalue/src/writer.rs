//! Builds backend write operations from logical keys and values.

use std::marker::PhantomData;

use common::WriteOp;

use crate::codec::{Codec, JsonCodec};
use crate::error::Result;
use crate::prefixer::Prefixer;

/// Turns logical writes into absolute [`WriteOp`]s without applying them.
///
/// Ops from several writers over the same backend, for example a parent scope
/// and a child scope, can be concatenated and applied as one transaction.
///
/// An absent value always becomes a [`WriteOp::Delete`].
pub struct Writer<V, C = JsonCodec> {
    prefixer: Prefixer,
    codec: C,
    _value: PhantomData<fn() -> V>,
}

impl<V, C: Clone> Clone for Writer<V, C> {
    fn clone(&self) -> Self {
        Self {
            prefixer: self.prefixer.clone(),
            codec: self.codec.clone(),
            _value: PhantomData,
        }
    }
}

impl<V, C: Codec<V>> Writer<V, C> {
    pub fn new(prefixer: Prefixer, codec: C) -> Self {
        Self {
            prefixer,
            codec,
            _value: PhantomData,
        }
    }

    pub fn prefixer(&self) -> &Prefixer {
        &self.prefixer
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Builds a put for `value`, or a delete when it is `None`.
    pub fn set(&self, key: &str, value: impl Into<Option<V>>) -> Result<Vec<WriteOp>> {
        Ok(vec![self.op(key, value.into())?])
    }

    /// Builds one put or delete per pair, in order.
    pub fn sets<I, K>(&self, pairs: I) -> Result<Vec<WriteOp>>
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: AsRef<str>,
    {
        pairs
            .into_iter()
            .map(|(key, value)| self.op(key.as_ref(), value))
            .collect()
    }

    pub fn del<I, K>(&self, keys: I) -> Vec<WriteOp>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        keys.into_iter()
            .map(|key| WriteOp::delete(self.prefixer.to_absolute(key.as_ref())))
            .collect()
    }

    fn op(&self, key: &str, value: Option<V>) -> Result<WriteOp> {
        let key = self.prefixer.to_absolute(key);
        match value {
            Some(value) => Ok(WriteOp::put(key, self.codec.encode(&value)?)),
            None => Ok(WriteOp::delete(key)),
        }
    }
}
