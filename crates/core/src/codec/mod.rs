//! Codec contract and built-in codecs.
//!
//! Every typed key or value crossing into the ordered store goes through a
//! [`Codec`]. Tables and indexes hold codecs as `Arc<dyn Codec<T>>` so one
//! codec instance can be shared by a table and the indexes built on it.
//!
//! Key codecs must be order-preserving for any field used in prefix or
//! bounds queries, since scans run over the encoded bytes.
//!
//! # Built-in codecs
//!
//! - [`BytesCodec`]: raw bytes, no transformation
//! - [`Utf8Codec`]: `String` as UTF-8
//! - [`I32LeCodec`]: `i32` little-endian (compact, not order-preserving)
//! - [`U64BeCodec`], [`I64BeCodec`]: order-preserving integers
//! - [`BincodeCodec`]: any serde type via bincode, for values
//!
//! # Usage
//!
//! ```ignore
//! use rowtable_core::codec::{Codec, Utf8Codec};
//!
//! let mut buf = Vec::new();
//! Utf8Codec.encode(&"john".to_string(), &mut buf)?;
//! assert_eq!(Utf8Codec.decode(&buf)?, "john");
//! ```

mod builtin;
mod serialized;
mod traits;

pub use builtin::{BytesCodec, I32LeCodec, I64BeCodec, U64BeCodec, Utf8Codec};
pub use serialized::BincodeCodec;
pub use traits::{Codec, CodecError};

/// Encode `value` into a fresh vector.
///
/// Convenience for call sites that do not hold a pooled buffer.
pub fn encode_to_vec<T>(codec: &dyn Codec<T>, value: &T) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    codec.encode(value, &mut buf)?;
    Ok(buf)
}
