//! # Container Reader
//!
//! Opens a container file, parses the embedded writer schema and metadata,
//! and streams records one at a time across block boundaries. Reading is
//! sequential, forward-only, and not restartable without reopening.
//!
//! ## Read Protocol
//!
//! 1. Read the block's record count and payload length
//! 2. Read the payload and the trailing sync marker
//! 3. Compare the marker against the header's; any mismatch is a fatal
//!    [`CorruptFileError`](crate::error::CorruptFileError); there is no
//!    skip-to-next-block heuristic
//! 4. Decode records out of the payload on demand
//!
//! [`ContainerReader::next`] decodes under the embedded writer schema;
//! [`ContainerReader::next_resolved`] decodes through a caller-supplied
//! reader schema, applying the full resolution rules per record. The two
//! can be mixed freely within one pass.

use std::fs::File;
use std::path::Path;

use eyre::{ensure, Result, WrapErr};
use tracing::{debug, trace};

use crate::codec::Decoder;
use crate::container::header::{read_exact_or, read_varint_opt, ContainerHeader};
use crate::container::{MAX_BLOCK_BYTES, SYNC_MARKER_SIZE};
use crate::error::{CorruptFileError, DecodingError};
use crate::schema::Schema;
use crate::value::Value;

pub struct ContainerReader {
    file: File,
    schema: Schema,
    metadata: Vec<(String, Vec<u8>)>,
    sync_marker: [u8; SYNC_MARKER_SIZE],
    block: Vec<u8>,
    block_pos: usize,
    block_remaining: u64,
    blocks_read: u64,
    finished: bool,
}

impl ContainerReader {
    /// Opens a container and parses its header, positioning at the first
    /// block.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)
            .wrap_err_with(|| format!("failed to open container at {:?}", path))?;

        let header = ContainerHeader::read_from(&mut file)?;
        debug!(path = %path.display(), "opened container");

        Ok(Self {
            file,
            schema: header.schema,
            metadata: header.metadata,
            sync_marker: header.sync_marker,
            block: Vec::new(),
            block_pos: 0,
            block_remaining: 0,
            blocks_read: 0,
            finished: false,
        })
    }

    /// The writer schema embedded in the file.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Header metadata in written order.
    pub fn metadata(&self) -> &[(String, Vec<u8>)] {
        &self.metadata
    }

    pub fn metadata_value(&self, key: &str) -> Option<&[u8]> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    /// Whether another record is available, loading the next block if the
    /// current one is exhausted.
    pub fn has_next(&mut self) -> Result<bool> {
        if self.block_remaining > 0 {
            return Ok(true);
        }
        if self.block_pos < self.block.len() {
            // The block declared fewer records than its payload holds.
            return Err(
                DecodingError::TrailingBytes(self.block.len() - self.block_pos).into(),
            );
        }
        if self.finished {
            return Ok(false);
        }

        loop {
            if !self.load_next_block()? {
                self.finished = true;
                return Ok(false);
            }
            if self.block_remaining > 0 {
                return Ok(true);
            }
            if !self.block.is_empty() {
                return Err(DecodingError::TrailingBytes(self.block.len()).into());
            }
        }
    }

    /// Decodes the next record under the writer schema.
    pub fn next(&mut self) -> Result<Value> {
        ensure!(self.has_next()?, "no more records in container");

        let mut dec = Decoder::new(&self.block[self.block_pos..]);
        let value = dec.decode(&self.schema)?;
        self.block_pos += dec.position();
        self.block_remaining -= 1;
        Ok(value)
    }

    /// Decodes the next record through `reader_schema`, applying schema
    /// resolution against the embedded writer schema.
    pub fn next_resolved(&mut self, reader_schema: &Schema) -> Result<Value> {
        ensure!(self.has_next()?, "no more records in container");

        let mut dec = Decoder::new(&self.block[self.block_pos..]);
        let value = dec.decode_resolved(&self.schema, reader_schema)?;
        self.block_pos += dec.position();
        self.block_remaining -= 1;
        Ok(value)
    }

    fn load_next_block(&mut self) -> Result<bool> {
        // A clean EOF before the first byte of a block is the end of the
        // file; anything later is truncation.
        let count = match read_varint_opt(&mut self.file)? {
            Some(count) => count,
            None => return Ok(false),
        };
        let len = read_varint_opt(&mut self.file)?
            .ok_or(CorruptFileError::TruncatedBlock(self.blocks_read))?;
        if len > MAX_BLOCK_BYTES as u64 {
            return Err(CorruptFileError::OversizedBlock {
                block: self.blocks_read,
                len,
                limit: MAX_BLOCK_BYTES,
            }
            .into());
        }

        self.block.resize(len as usize, 0);
        read_exact_or(
            &mut self.file,
            &mut self.block,
            CorruptFileError::TruncatedBlock(self.blocks_read),
        )?;

        let mut trailer = [0u8; SYNC_MARKER_SIZE];
        read_exact_or(
            &mut self.file,
            &mut trailer,
            CorruptFileError::TruncatedBlock(self.blocks_read),
        )?;
        if trailer != self.sync_marker {
            return Err(CorruptFileError::SyncMismatch(self.blocks_read).into());
        }

        trace!(
            block = self.blocks_read,
            records = count,
            bytes = len,
            "loaded container block"
        );

        self.block_pos = 0;
        self.block_remaining = count;
        self.blocks_read += 1;
        Ok(true)
    }
}
