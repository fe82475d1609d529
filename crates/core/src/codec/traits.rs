//! Codec trait definitions.

/// Typed codec trait.
///
/// Converts a `T` to bytes appended to a growable buffer, and back.
///
/// # Thread Safety
///
/// Codecs must be `Send + Sync`: one instance is shared by a table, its
/// indexes and every thread using them.
///
/// # Ordering
///
/// For key types the byte encoding must preserve the order of any field
/// used by prefix or bounds scans. Value codecs have no such requirement.
pub trait Codec<T>: Send + Sync {
    /// Append the encoding of `value` to `buf`.
    ///
    /// Implementations must only append; the caller may have written a
    /// prefix into `buf` already.
    fn encode(&self, value: &T, buf: &mut Vec<u8>) -> Result<(), CodecError>;

    /// Decode a value from exactly `bytes`.
    ///
    /// Returns an error if the bytes are not a valid encoding. Callers
    /// treat this as corruption and never retry it.
    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError>;
}

/// Codec errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Decoding failed (invalid format, schema mismatch).
    #[error("Decode error: {0}")]
    Decode(String),

    /// Encoding failed.
    #[error("Encode error: {0}")]
    Encode(String),

    /// A fixed-width encoding received the wrong number of bytes.
    #[error("Unexpected length: expected {expected} bytes, got {actual}")]
    UnexpectedLength {
        /// Width required by the codec
        expected: usize,
        /// Width actually stored
        actual: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test that trait is object-safe
    fn _accepts_box_dyn_codec(_codec: Box<dyn Codec<u64>>) {}

    #[test]
    fn test_codec_error_display() {
        let err = CodecError::UnexpectedLength {
            expected: 8,
            actual: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("expected 8"));
        assert!(msg.contains("got 3"));

        assert!(CodecError::Decode("bad".into()).to_string().contains("Decode error"));
        assert!(CodecError::Encode("bad".into()).to_string().contains("Encode error"));
    }
}
