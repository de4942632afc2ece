//! # Container Writer
//!
//! Creates a container file and appends records to it. The header (writer
//! schema, metadata, sync marker) is written eagerly at creation; appended
//! records are encoded into an in-memory block buffer that is sealed and
//! written once it reaches the block-size threshold, and again on `close`.
//!
//! ## Write Protocol
//!
//! 1. Encode the record into a scratch buffer (a failed encode leaves the
//!    current block untouched)
//! 2. Move the encoding into the block buffer
//! 3. When the buffer reaches the threshold, write count, length, payload,
//!    and sync marker in one sequence
//! 4. `close` seals the final partial block and fsyncs
//!
//! The file grows monotonically; nothing is rewritten in place. A handle
//! must not be shared across threads; appends are serialized by the
//! caller. Dropping an unclosed writer seals the buffered block
//! best-effort, but `close` is the contract: only a closed writer is known
//! to be durable.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use eyre::{ensure, Result, WrapErr};
use rand::RngCore;
use tracing::{debug, trace};

use crate::codec::encoder::{encode_into, write_varint};
use crate::container::header::ContainerHeader;
use crate::container::{DEFAULT_BLOCK_SIZE, SYNC_MARKER_SIZE};
use crate::schema::Schema;
use crate::value::Value;

pub struct ContainerWriter {
    file: File,
    path: PathBuf,
    schema: Schema,
    sync_marker: [u8; SYNC_MARKER_SIZE],
    block_size: usize,
    block_buf: Vec<u8>,
    block_records: u64,
    records_appended: u64,
    blocks_written: u64,
    scratch: Vec<u8>,
    closed: bool,
}

impl ContainerWriter {
    /// Creates a container at `path` with no metadata and the default block
    /// size.
    pub fn create(path: impl AsRef<Path>, schema: Schema) -> Result<Self> {
        Self::builder(path, schema).create()
    }

    pub fn builder(path: impl AsRef<Path>, schema: Schema) -> ContainerWriterBuilder {
        ContainerWriterBuilder {
            path: path.as_ref().to_path_buf(),
            schema,
            metadata: Vec::new(),
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records_appended(&self) -> u64 {
        self.records_appended
    }

    /// Encodes `value` against the writer schema and buffers it into the
    /// current block. A shape mismatch fails without touching the block.
    pub fn append(&mut self, value: &Value) -> Result<()> {
        self.scratch.clear();
        encode_into(&self.schema, value, &mut self.scratch)
            .wrap_err("value does not conform to the writer schema")?;

        self.block_buf.extend_from_slice(&self.scratch);
        self.block_records += 1;
        self.records_appended += 1;

        if self.block_buf.len() >= self.block_size {
            self.seal_block()?;
        }
        Ok(())
    }

    fn seal_block(&mut self) -> Result<()> {
        if self.block_records == 0 {
            return Ok(());
        }

        let mut frame = Vec::with_capacity(self.block_buf.len() + SYNC_MARKER_SIZE + 20);
        write_varint(&mut frame, self.block_records);
        write_varint(&mut frame, self.block_buf.len() as u64);
        frame.extend_from_slice(&self.block_buf);
        frame.extend_from_slice(&self.sync_marker);

        self.file
            .write_all(&frame)
            .wrap_err("failed to write container block")?;

        trace!(
            records = self.block_records,
            bytes = self.block_buf.len(),
            "sealed container block"
        );

        self.blocks_written += 1;
        self.block_records = 0;
        self.block_buf.clear();
        Ok(())
    }

    /// Seals the buffered block (if any) and flushes file buffers.
    pub fn flush(&mut self) -> Result<()> {
        self.seal_block()?;
        self.file
            .flush()
            .wrap_err("failed to flush container file")
    }

    /// Seals the final block, fsyncs, and finalizes the file.
    pub fn close(mut self) -> Result<()> {
        self.seal_block()?;
        self.file
            .sync_all()
            .wrap_err("failed to sync container file")?;
        self.closed = true;
        debug!(
            path = %self.path.display(),
            records = self.records_appended,
            blocks = self.blocks_written,
            "closed container"
        );
        Ok(())
    }
}

impl Drop for ContainerWriter {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.seal_block();
            let _ = self.file.flush();
        }
    }
}

pub struct ContainerWriterBuilder {
    path: PathBuf,
    schema: Schema,
    metadata: Vec<(String, Vec<u8>)>,
    block_size: usize,
}

impl ContainerWriterBuilder {
    /// Adds a metadata pair; pairs are written in insertion order.
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }

    pub fn block_size(mut self, bytes: usize) -> Self {
        self.block_size = bytes;
        self
    }

    pub fn create(self) -> Result<ContainerWriter> {
        self.schema.validate()?;
        ensure!(self.block_size > 0, "block size must be non-zero");

        let mut sync_marker = [0u8; SYNC_MARKER_SIZE];
        rand::thread_rng().fill_bytes(&mut sync_marker);

        let header = ContainerHeader {
            schema: self.schema,
            metadata: self.metadata,
            sync_marker,
        };
        let header_bytes = header.encode()?;

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
            .wrap_err_with(|| format!("failed to create container at {:?}", self.path))?;

        file.write_all(&header_bytes)
            .wrap_err("failed to write container header")?;

        debug!(path = %self.path.display(), "created container");

        Ok(ContainerWriter {
            file,
            path: self.path,
            schema: header.schema,
            sync_marker,
            block_size: self.block_size,
            block_buf: Vec::new(),
            block_records: 0,
            records_appended: 0,
            blocks_written: 0,
            scratch: Vec::new(),
            closed: false,
        })
    }
}
