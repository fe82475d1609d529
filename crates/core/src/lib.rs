//! Core types and traits for rowtable
//!
//! This crate defines the foundational pieces shared by every layer:
//! - Error: error taxonomy and `Result` alias
//! - Codec: typed encode/decode contract plus built-in codecs
//! - ChangeConsumer: change-notification contract
//! - Options: table and index options, store pass-through options
//! - Config: TOML mirror of the options

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod change;
pub mod codec;
pub mod config;
pub mod error;
pub mod options;

pub use change::ChangeConsumer;
pub use codec::{
    BincodeCodec, BytesCodec, Codec, CodecError, I32LeCodec, I64BeCodec, U64BeCodec, Utf8Codec,
};
pub use config::{IndexConfig, TableConfig};
pub use error::{Error, Result};
pub use options::{
    IndexOptions, NamespaceOptions, SeekMode, TableOptions, ValueStoreMode, WriteOptions,
    DEFAULT_LOCK_COUNT,
};
