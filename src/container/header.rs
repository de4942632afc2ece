//! # Container Header
//!
//! The header makes a container file self-describing: a fixed zerocopy
//! prelude carrying magic bytes and a version, the writer schema as
//! canonical JSON text, ordered key/value metadata, and the sync marker
//! repeated after every block. The writer schema and metadata are fixed at
//! file-creation time and apply to every block in the file.
//!
//! All multi-byte prelude fields are little-endian; the zerocopy wrapper
//! types handle conversion. Variable-length header fields use the same
//! varint encoding as record bodies.

use std::io::Read;

use eyre::{ensure, Result, WrapErr};
use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::codec::encoder::write_varint;
use crate::container::{
    CONTAINER_MAGIC, CONTAINER_VERSION, MAX_HEADER_FIELD_BYTES, PRELUDE_SIZE, SYNC_MARKER_SIZE,
};
use crate::error::{CorruptFileError, DecodingError};
use crate::schema::Schema;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct ContainerPrelude {
    magic: [u8; 8],
    version: U32,
    flags: U32,
}

const _: () = assert!(std::mem::size_of::<ContainerPrelude>() == PRELUDE_SIZE);

impl ContainerPrelude {
    pub fn new() -> Self {
        Self {
            magic: *CONTAINER_MAGIC,
            version: U32::new(CONTAINER_VERSION),
            flags: U32::new(0),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        if bytes.len() < PRELUDE_SIZE {
            return Err(CorruptFileError::TruncatedHeader.into());
        }
        let prelude = Self::ref_from_bytes(&bytes[..PRELUDE_SIZE])
            .map_err(|_| CorruptFileError::TruncatedHeader)?;

        if &prelude.magic != CONTAINER_MAGIC {
            return Err(CorruptFileError::BadMagic.into());
        }
        if prelude.version.get() != CONTAINER_VERSION {
            return Err(CorruptFileError::UnsupportedVersion(prelude.version.get()).into());
        }
        Ok(prelude)
    }

    pub fn version(&self) -> u32 {
        self.version.get()
    }
}

impl Default for ContainerPrelude {
    fn default() -> Self {
        Self::new()
    }
}

/// Parsed header contents shared by the writer and the reader.
#[derive(Debug)]
pub struct ContainerHeader {
    pub schema: Schema,
    pub metadata: Vec<(String, Vec<u8>)>,
    pub sync_marker: [u8; SYNC_MARKER_SIZE],
}

impl ContainerHeader {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.extend_from_slice(ContainerPrelude::new().as_bytes());

        let schema_text = self.schema.to_text()?;
        write_varint(&mut out, schema_text.len() as u64);
        out.extend_from_slice(schema_text.as_bytes());

        for (key, value) in &self.metadata {
            // A zero key length terminates the list, so keys must be
            // non-empty.
            ensure!(!key.is_empty(), "metadata key must be non-empty");
            write_varint(&mut out, key.len() as u64);
            out.extend_from_slice(key.as_bytes());
            write_varint(&mut out, value.len() as u64);
            out.extend_from_slice(value);
        }
        write_varint(&mut out, 0);

        out.extend_from_slice(&self.sync_marker);
        Ok(out)
    }

    pub fn read_from(r: &mut impl Read) -> Result<ContainerHeader> {
        let mut prelude_bytes = [0u8; PRELUDE_SIZE];
        read_exact_or(r, &mut prelude_bytes, CorruptFileError::TruncatedHeader)?;
        ContainerPrelude::from_bytes(&prelude_bytes)?;

        let schema_bytes = read_header_field(r)?;
        let schema_text = std::str::from_utf8(&schema_bytes)
            .map_err(|_| DecodingError::InvalidUtf8)
            .wrap_err("embedded schema text")?;
        let schema = Schema::from_text(schema_text).wrap_err("embedded schema text")?;

        let mut metadata = Vec::new();
        loop {
            let key_len = read_varint_opt(r)?.ok_or(CorruptFileError::TruncatedHeader)?;
            if key_len == 0 {
                break;
            }
            ensure_header_len(key_len)?;
            let mut key = vec![0u8; key_len as usize];
            read_exact_or(r, &mut key, CorruptFileError::TruncatedHeader)?;
            let key = String::from_utf8(key)
                .map_err(|_| DecodingError::InvalidUtf8)
                .wrap_err("metadata key")?;

            let value_len = read_varint_opt(r)?.ok_or(CorruptFileError::TruncatedHeader)?;
            ensure_header_len(value_len)?;
            let mut value = vec![0u8; value_len as usize];
            read_exact_or(r, &mut value, CorruptFileError::TruncatedHeader)?;

            metadata.push((key, value));
        }

        let mut sync_marker = [0u8; SYNC_MARKER_SIZE];
        read_exact_or(r, &mut sync_marker, CorruptFileError::TruncatedHeader)?;

        Ok(ContainerHeader {
            schema,
            metadata,
            sync_marker,
        })
    }
}

fn read_header_field(r: &mut impl Read) -> Result<Vec<u8>> {
    let len = read_varint_opt(r)?.ok_or(CorruptFileError::TruncatedHeader)?;
    ensure_header_len(len)?;
    let mut buf = vec![0u8; len as usize];
    read_exact_or(r, &mut buf, CorruptFileError::TruncatedHeader)?;
    Ok(buf)
}

fn ensure_header_len(len: u64) -> Result<()> {
    if len > MAX_HEADER_FIELD_BYTES as u64 {
        return Err(CorruptFileError::OversizedHeader(len, MAX_HEADER_FIELD_BYTES).into());
    }
    Ok(())
}

/// `read_exact` that converts a clean or mid-read EOF into the given
/// container error.
pub(crate) fn read_exact_or(
    r: &mut impl Read,
    buf: &mut [u8],
    on_eof: CorruptFileError,
) -> Result<()> {
    match r.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(on_eof.into()),
        Err(e) => Err(e).wrap_err("container read failed"),
    }
}

/// Reads one varint from a byte stream. Returns `None` on a clean EOF
/// before the first byte; an EOF mid-varint is an error.
pub(crate) fn read_varint_opt(r: &mut impl Read) -> Result<Option<u64>> {
    let mut value = 0u64;
    let mut shift = 0u32;
    let mut bytes_read = 0usize;

    loop {
        let mut byte = [0u8; 1];
        let n = loop {
            match r.read(&mut byte) {
                Ok(n) => break n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).wrap_err("container read failed"),
            }
        };
        if n == 0 {
            if bytes_read == 0 {
                return Ok(None);
            }
            return Err(DecodingError::UnexpectedEof {
                needed: 1,
                remaining: 0,
            }
            .into());
        }

        if bytes_read >= crate::encoding::varint::MAX_VARINT_LEN
            || (bytes_read == crate::encoding::varint::MAX_VARINT_LEN - 1 && byte[0] > 0x01)
        {
            return Err(DecodingError::VarintOverflow(
                crate::encoding::varint::MAX_VARINT_LEN,
            )
            .into());
        }

        value |= u64::from(byte[0] & 0x7F) << shift;
        bytes_read += 1;

        if byte[0] & 0x80 == 0 {
            return Ok(Some(value));
        }
        shift += 7;
    }
}
