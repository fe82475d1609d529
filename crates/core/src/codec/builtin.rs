//! Built-in codecs for common key and value types.

use super::traits::{Codec, CodecError};
use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};

fn expect_len(bytes: &[u8], expected: usize) -> Result<(), CodecError> {
    if bytes.len() == expected {
        Ok(())
    } else {
        Err(CodecError::UnexpectedLength {
            expected,
            actual: bytes.len(),
        })
    }
}

/// Raw bytes codec - no transformation.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesCodec;

impl Codec<Vec<u8>> for BytesCodec {
    fn encode(&self, value: &Vec<u8>, buf: &mut Vec<u8>) -> Result<(), CodecError> {
        buf.extend_from_slice(value);
        Ok(())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(bytes.to_vec())
    }
}

/// UTF-8 string codec.
///
/// Byte order of UTF-8 matches code point order, so string prefixes map to
/// byte prefixes and this codec is safe for prefix scans.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Codec;

impl Codec<String> for Utf8Codec {
    fn encode(&self, value: &String, buf: &mut Vec<u8>) -> Result<(), CodecError> {
        buf.extend_from_slice(value.as_bytes());
        Ok(())
    }

    fn decode(&self, bytes: &[u8]) -> Result<String, CodecError> {
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| CodecError::Decode(format!("invalid UTF-8: {}", e)))
    }
}

/// Little-endian `i32` codec.
///
/// Compact and compatible with stores written by little-endian hosts, but
/// NOT order-preserving: use it for point lookups only.
#[derive(Debug, Clone, Copy, Default)]
pub struct I32LeCodec;

impl Codec<i32> for I32LeCodec {
    fn encode(&self, value: &i32, buf: &mut Vec<u8>) -> Result<(), CodecError> {
        buf.write_i32::<LittleEndian>(*value)
            .map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<i32, CodecError> {
        expect_len(bytes, 4)?;
        Ok(LittleEndian::read_i32(bytes))
    }
}

/// Big-endian `u64` codec (order-preserving).
#[derive(Debug, Clone, Copy, Default)]
pub struct U64BeCodec;

impl Codec<u64> for U64BeCodec {
    fn encode(&self, value: &u64, buf: &mut Vec<u8>) -> Result<(), CodecError> {
        buf.write_u64::<BigEndian>(*value)
            .map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<u64, CodecError> {
        expect_len(bytes, 8)?;
        Ok(BigEndian::read_u64(bytes))
    }
}

/// Order-preserving `i64` codec.
///
/// The sign bit is flipped before writing big-endian, so negative values
/// sort before positive ones byte-wise.
#[derive(Debug, Clone, Copy, Default)]
pub struct I64BeCodec;

const SIGN_BIT: u64 = 1 << 63;

impl Codec<i64> for I64BeCodec {
    fn encode(&self, value: &i64, buf: &mut Vec<u8>) -> Result<(), CodecError> {
        buf.write_u64::<BigEndian>((*value as u64) ^ SIGN_BIT)
            .map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<i64, CodecError> {
        expect_len(bytes, 8)?;
        Ok((BigEndian::read_u64(bytes) ^ SIGN_BIT) as i64)
    }
}
