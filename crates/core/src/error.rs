//! Error types for rowtable
//!
//! This module defines the error taxonomy shared by every crate in the
//! workspace. We use `thiserror` for automatic `Display` and `Error` trait
//! implementations.
//!
//! Logical no-ops (removing an absent key, a declined `try_apply_change`)
//! are not errors and never surface here.

use crate::codec::CodecError;
use thiserror::Error;

/// Result type alias for rowtable operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for rowtable
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying ordered store failed a get, batch write or iteration.
    ///
    /// No durable change occurred; the whole operation may be retried with
    /// a fresh transaction.
    #[error("Store error: {0}")]
    Store(String),

    /// A key or value could not be encoded or decoded by its codec.
    ///
    /// Decode failures indicate corrupted state or a schema mismatch and
    /// must not be retried blindly.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Invalid table or index configuration, rejected at construction time
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Invalid operation or state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// A configuration file could not be read or parsed
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Create a store error from anything printable
    pub fn store(message: impl Into<String>) -> Self {
        Error::Store(message.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Error::InvalidConfiguration(message.into())
    }

    /// Create an invalid operation error
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Error::InvalidOperation(message.into())
    }

    /// Check if this error came from the underlying store
    pub fn is_store_error(&self) -> bool {
        matches!(self, Error::Store(_))
    }

    /// Check if this error came from a codec
    pub fn is_codec_error(&self) -> bool {
        matches!(self, Error::Codec(_))
    }

    /// Check if retrying the whole operation with a fresh transaction may succeed
    ///
    /// Store failures are transient from the caller's point of view. Codec and
    /// configuration errors will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        self.is_store_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_store() {
        let err = Error::store("write failed");
        let msg = err.to_string();
        assert!(msg.contains("Store error"));
        assert!(msg.contains("write failed"));
    }

    #[test]
    fn test_error_display_codec() {
        let err: Error = CodecError::Decode("truncated".to_string()).into();
        let msg = err.to_string();
        assert!(msg.contains("Codec error"));
        assert!(msg.contains("truncated"));
    }

    #[test]
    fn test_error_display_invalid_configuration() {
        let err = Error::invalid_configuration("lock_count must be greater than zero");
        let msg = err.to_string();
        assert!(msg.contains("Invalid configuration"));
        assert!(msg.contains("lock_count"));
    }

    #[test]
    fn test_error_display_invalid_operation() {
        let err = Error::invalid_operation("transaction belongs to another store");
        assert!(err.to_string().contains("Invalid operation"));
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::store("x").is_store_error());
        assert!(Error::store("x").is_retryable());

        let codec: Error = CodecError::Decode("x".into()).into();
        assert!(codec.is_codec_error());
        assert!(!codec.is_retryable());

        assert!(!Error::invalid_configuration("x").is_retryable());
        assert!(!Error::Config("x".into()).is_store_error());
    }

    #[test]
    fn test_result_type() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }

        fn returns_err() -> Result<i32> {
            Err(Error::invalid_operation("test"))
        }

        assert_eq!(returns_ok().unwrap(), 42);
        assert!(returns_err().is_err());
    }
}
