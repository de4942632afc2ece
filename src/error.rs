//! # Error Taxonomy
//!
//! This module defines the four error categories surfaced by volant. All
//! fallible functions in the crate return `eyre::Result`; the types below are
//! constructed at the failure site and converted into the report, so callers
//! can discriminate categories with `Report::downcast_ref`:
//!
//! | Category | Raised by | Meaning |
//! |----------|-----------|---------|
//! | [`EncodingError`] | binary and text encoders | value shape does not match the schema |
//! | [`DecodingError`] | decoder, resolver | malformed or truncated byte stream |
//! | [`SchemaResolutionError`] | resolver | reader schema cannot be satisfied from writer data |
//! | [`CorruptFileError`] | container reader | header or block framing violation |
//!
//! ## Fatality Scope
//!
//! - `EncodingError` is fatal for the record being appended; previously
//!   flushed blocks are unaffected and the writer stays usable.
//! - `DecodingError` is fatal for the current read; the stream position is
//!   unreliable afterwards.
//! - `SchemaResolutionError` is fatal for the current record only.
//! - `CorruptFileError` is fatal for the whole file; there is no
//!   skip-to-next-block recovery.
//!
//! Errors are never retried internally and there is no global error state;
//! every operation reports failure through its own result.
//!
//! ## Example
//!
//! ```ignore
//! match reader.next() {
//!     Ok(value) => consume(value),
//!     Err(report) if report.downcast_ref::<CorruptFileError>().is_some() => {
//!         // the file is unusable, abandon it
//!     }
//!     Err(report) => return Err(report),
//! }
//! ```

use thiserror::Error;

/// Value/schema shape mismatch detected at write time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("value kind {value} does not match schema kind {schema}")]
    TypeMismatch {
        schema: &'static str,
        value: &'static str,
    },

    #[error("missing value for record field `{0}`")]
    MissingField(String),

    #[error("no union branch matches value kind {0}")]
    NoMatchingBranch(&'static str),

    #[error("value nesting exceeds maximum depth {0}")]
    DepthExceeded(usize),
}

/// Malformed or truncated byte stream detected at read time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodingError {
    #[error("unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("varint continues past {0} bytes")]
    VarintOverflow(usize),

    #[error("invalid boolean byte {0:#04x}")]
    InvalidBoolean(u8),

    #[error("int value {0} out of 32-bit range")]
    IntOutOfRange(i64),

    #[error("string data is not valid UTF-8")]
    InvalidUtf8,

    #[error("union branch index {index} out of range for {branches} branches")]
    UnionIndexOutOfRange { index: u64, branches: usize },

    #[error("array block declares {count} items, exceeding the per-block limit {limit}")]
    BlockTooLarge { count: u64, limit: usize },

    #[error("{0} trailing bytes after decoded value")]
    TrailingBytes(usize),

    #[error("value nesting exceeds maximum depth {0}")]
    DepthExceeded(usize),
}

/// Reader schema cannot be satisfied from data written under the writer
/// schema.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaResolutionError {
    #[error("cannot resolve writer schema {writer} against reader schema {reader}")]
    Incompatible {
        writer: &'static str,
        reader: &'static str,
    },

    #[error("reader field `{field}` of record `{record}` has no writer counterpart and no default")]
    MissingDefault { record: String, field: String },

    #[error("no branch of reader union accepts writer schema {0}")]
    NoReaderBranch(&'static str),
}

/// Container-level framing violation. Fatal for the file.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CorruptFileError {
    #[error("invalid container magic")]
    BadMagic,

    #[error("unsupported container version {0}")]
    UnsupportedVersion(u32),

    #[error("truncated container header")]
    TruncatedHeader,

    #[error("header field of {0} bytes exceeds the limit {1}")]
    OversizedHeader(u64, usize),

    #[error("truncated block {0}")]
    TruncatedBlock(u64),

    #[error("sync marker mismatch after block {0}")]
    SyncMismatch(u64),

    #[error("block {block} declares {len} payload bytes, exceeding the limit {limit}")]
    OversizedBlock { block: u64, len: u64, limit: usize },
}
