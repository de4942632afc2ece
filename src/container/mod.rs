//! # Container File Format
//!
//! Self-describing files holding a sequence of binary-encoded records. The
//! header embeds the writer schema as JSON text and arbitrary key/value
//! metadata, so a reader needs nothing but the file; records are grouped
//! into blocks bounded by a random sync marker fixed at creation time.
//!
//! ## File Layout
//!
//! ```text
//! +--------------------------+
//! | Prelude (16B)            |  magic, version, flags (zerocopy struct)
//! +--------------------------+
//! | Schema text              |  varint length + canonical JSON
//! +--------------------------+
//! | Metadata                 |  { varint key len > 0, key,
//! |                          |    varint value len, value }*
//! |                          |  varint 0 terminates
//! +--------------------------+
//! | Sync marker (16B)        |  random, fixed at creation
//! +--------------------------+
//! | Block                    |  varint record count
//! |                          |  varint payload length
//! |                          |  concatenated record encodings
//! |                          |  sync marker repeated verbatim
//! +--------------------------+
//! | Block ...                |
//! +--------------------------+
//! ```
//!
//! ## Integrity Model
//!
//! Every block ends with the header's sync marker repeated verbatim. The
//! reader compares the trailing marker of each block against the header's;
//! any mismatch is a fatal
//! [`CorruptFileError`](crate::error::CorruptFileError) with no
//! skip-to-next-block recovery. Truncation anywhere inside a block is
//! equally fatal.
//!
//! ## Concurrency
//!
//! A writer handle is single-writer: all appends are serialized by the
//! caller, and the file grows append-only until `close` flushes the final
//! block. Any number of readers may open a completed file concurrently;
//! each holds independent state.

pub mod header;
pub mod reader;
pub mod writer;

pub use header::ContainerHeader;
pub use reader::ContainerReader;
pub use writer::{ContainerWriter, ContainerWriterBuilder};

pub const CONTAINER_MAGIC: &[u8; 8] = b"volant\x00\x00";
pub const CONTAINER_VERSION: u32 = 1;

/// Size of the fixed header prelude.
pub const PRELUDE_SIZE: usize = 16;

pub const SYNC_MARKER_SIZE: usize = 16;

/// Buffered encoded bytes at which the writer seals the current block.
pub const DEFAULT_BLOCK_SIZE: usize = 16 * 1024;

/// Upper bound on a declared block payload; a corrupt length prefix must
/// not drive allocation.
pub const MAX_BLOCK_BYTES: usize = 1 << 30;

/// Upper bound on declared schema-text and metadata lengths in the header.
pub const MAX_HEADER_FIELD_BYTES: usize = 1 << 24;
