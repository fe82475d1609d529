//! Serde-backed value codec.

use super::traits::{Codec, CodecError};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Codec for any serde type, using bincode's default layout.
///
/// Intended for row values. Integers are written little-endian, so the
/// encoding is not order-preserving and should not back prefix or bounds
/// scans.
pub struct BincodeCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> BincodeCodec<T> {
    /// Create a new codec
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for BincodeCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for BincodeCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for BincodeCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BincodeCodec")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl From<bincode::Error> for CodecError {
    fn from(e: bincode::Error) -> Self {
        CodecError::Decode(e.to_string())
    }
}

impl<T> Codec<T> for BincodeCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T, buf: &mut Vec<u8>) -> Result<(), CodecError> {
        bincode::serialize_into(buf, value).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError> {
        Ok(bincode::deserialize(bytes)?)
    }
}
