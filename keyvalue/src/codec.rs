//! Value encoding for stored values.

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Converts values to and from the bytes a backend stores.
pub trait Codec<V>: Clone + Send + Sync + 'static {
    fn encode(&self, value: &V) -> Result<Bytes>;

    fn decode(&self, bytes: &[u8]) -> Result<V>;
}

/// Stores values as JSON text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonCodec;

impl<V> Codec<V> for JsonCodec
where
    V: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &V) -> Result<Bytes> {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| Error::Encoding(format!("Failed to encode value: {}", e)))
    }

    fn decode(&self, bytes: &[u8]) -> Result<V> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::Encoding(format!("Failed to decode value: {}", e)))
    }
}
