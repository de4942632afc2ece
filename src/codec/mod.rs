//! # Record Codec
//!
//! Serialization of (schema, value) pairs. Three modes share the data model:
//!
//! - [`encode`] / [`encode_into`]: compact binary form, writer-schema mode.
//! - [`decode`] / [`Decoder`]: byte stream back to values, writer-schema
//!   mode (baseline same-schema round trip).
//! - [`decode_resolved`]: byte stream produced under one schema, read
//!   through a different but compatible reader schema. See `resolver` for
//!   the resolution rules.
//! - [`encode_text`]: human-readable JSON rendering for inspection and
//!   export, writer-schema mode only.
//!
//! ## Binary Layout
//!
//! ```text
//! null            (no bytes)
//! boolean         1 byte, 0 or 1
//! int / long      zig-zag base-128 varint
//! float / double  4 / 8 bytes, IEEE-754 little-endian
//! bytes / string  varint length, then raw bytes (strings UTF-8)
//! array           { varint count > 0, items... }* , varint 0
//! union           varint branch index, then branch encoding
//! record          fields in schema order, no names or separators
//! ```
//!
//! Record encoding is positional: decoding depends entirely on knowing the
//! exact writer schema, which is why container files embed it.
//!
//! ## Safety Bounds
//!
//! Decoding is driven by untrusted bytes, so two bounds apply: value nesting
//! deeper than [`MAX_DEPTH`] and array blocks declaring more than
//! [`MAX_BLOCK_ITEMS`] items both fail with a `DecodingError` instead of
//! exhausting the stack or memory. The encoder enforces the same depth bound
//! so every encodable value is decodable.

pub mod decoder;
pub mod encoder;
pub mod resolver;
pub mod text;


pub use decoder::{decode, Decoder};
pub use encoder::{encode, encode_into};
pub use resolver::decode_resolved;
pub use text::encode_text;

pub(crate) use encoder::union_branch;

/// Maximum value-tree nesting accepted by the encoders and decoders.
pub const MAX_DEPTH: usize = 256;

/// Maximum items a single array block may declare.
pub const MAX_BLOCK_ITEMS: usize = 1 << 24;
