//! # Binary Decoder
//!
//! Decodes bytes produced by the [encoder](crate::codec::encoder) back into
//! values, using only the writer schema. This is the baseline same-schema
//! mode; reading through a different schema is the
//! [resolver](crate::codec::resolver)'s job.
//!
//! ## Cursor Design
//!
//! [`Decoder`] is a cursor over a byte slice. Container blocks concatenate
//! record encodings with no separators, so the consumed length of every
//! decode must be observable; [`Decoder::position`] exposes it. The
//! convenience [`decode`] function additionally requires the input to be
//! fully consumed.
//!
//! All reads bounds-check before slicing; malformed or truncated input
//! fails with a typed [`DecodingError`], never a panic.

use eyre::{Result, WrapErr};

use crate::codec::{MAX_BLOCK_ITEMS, MAX_DEPTH};
use crate::encoding::varint::{decode_varint, zigzag_decode};
use crate::error::DecodingError;
use crate::schema::{Names, Schema};
use crate::value::Value;

/// Decodes one value, requiring `bytes` to be exactly one encoding.
pub fn decode(writer: &Schema, bytes: &[u8]) -> Result<Value> {
    let mut decoder = Decoder::new(bytes);
    let value = decoder.decode(writer)?;
    if decoder.remaining() > 0 {
        return Err(DecodingError::TrailingBytes(decoder.remaining()).into());
    }
    Ok(value)
}

/// Cursor over a byte slice holding one or more concatenated encodings.
#[derive(Debug)]
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Decodes the next value under the writer schema, advancing the cursor
    /// exactly past its encoding.
    pub fn decode(&mut self, writer: &Schema) -> Result<Value> {
        let names = Names::collect(writer);
        decode_value(writer, &names, self, 0)
    }

    pub(crate) fn take(&mut self, needed: usize) -> Result<&'a [u8]> {
        if needed > self.remaining() {
            return Err(DecodingError::UnexpectedEof {
                needed,
                remaining: self.remaining(),
            }
            .into());
        }
        let slice = &self.buf[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(slice)
    }

    pub(crate) fn read_varint(&mut self) -> Result<u64> {
        let (value, consumed) = decode_varint(&self.buf[self.pos..])?;
        self.pos += consumed;
        Ok(value)
    }

    pub(crate) fn read_zigzag(&mut self) -> Result<i64> {
        Ok(zigzag_decode(self.read_varint()?))
    }

    /// Reads a length prefix and checks it against the remaining input, so a
    /// corrupt length cannot trigger an oversized allocation.
    pub(crate) fn read_len(&mut self) -> Result<usize> {
        let len = self.read_varint()?;
        if len > self.remaining() as u64 {
            return Err(DecodingError::UnexpectedEof {
                needed: len as usize,
                remaining: self.remaining(),
            }
            .into());
        }
        Ok(len as usize)
    }
}

pub(crate) fn decode_value<'a>(
    schema: &'a Schema,
    names: &Names<'a>,
    dec: &mut Decoder,
    depth: usize,
) -> Result<Value> {
    if depth > MAX_DEPTH {
        return Err(DecodingError::DepthExceeded(MAX_DEPTH).into());
    }
    let schema = names.resolve(schema)?;

    Ok(match schema {
        Schema::Null => Value::Null,
        Schema::Boolean => match dec.take(1)?[0] {
            0 => Value::Boolean(false),
            1 => Value::Boolean(true),
            other => return Err(DecodingError::InvalidBoolean(other).into()),
        },
        Schema::Int => {
            let v = dec.read_zigzag()?;
            let v = i32::try_from(v).map_err(|_| DecodingError::IntOutOfRange(v))?;
            Value::Int(v)
        }
        Schema::Long => Value::Long(dec.read_zigzag()?),
        Schema::Float => {
            let bytes: [u8; 4] = dec.take(4)?.try_into().unwrap(); // INVARIANT: take returned exactly 4 bytes
            Value::Float(f32::from_le_bytes(bytes))
        }
        Schema::Double => {
            let bytes: [u8; 8] = dec.take(8)?.try_into().unwrap(); // INVARIANT: take returned exactly 8 bytes
            Value::Double(f64::from_le_bytes(bytes))
        }
        Schema::Bytes => {
            let len = dec.read_len()?;
            Value::Bytes(dec.take(len)?.to_vec())
        }
        Schema::String => {
            let len = dec.read_len()?;
            let text = std::str::from_utf8(dec.take(len)?)
                .map_err(|_| DecodingError::InvalidUtf8)?;
            Value::String(text.to_owned())
        }
        Schema::Array(items) => {
            let mut elems = Vec::new();
            loop {
                let count = dec.read_varint()?;
                if count == 0 {
                    break;
                }
                if count > MAX_BLOCK_ITEMS as u64 {
                    return Err(DecodingError::BlockTooLarge {
                        count,
                        limit: MAX_BLOCK_ITEMS,
                    }
                    .into());
                }
                for _ in 0..count {
                    elems.push(decode_value(items, names, dec, depth + 1)?);
                }
            }
            Value::Array(elems)
        }
        Schema::Union(branches) => {
            let index = dec.read_varint()?;
            let branch = branches.get(index as usize).ok_or(
                DecodingError::UnionIndexOutOfRange {
                    index,
                    branches: branches.len(),
                },
            )?;
            decode_value(branch, names, dec, depth + 1)?
        }
        Schema::Record(record) => {
            let mut fields = Vec::with_capacity(record.fields().len());
            for field in record.fields() {
                let value =
                    decode_value(field.schema(), names, dec, depth + 1).wrap_err_with(|| {
                        format!(
                            "while decoding field `{}` of record `{}`",
                            field.name(),
                            record.name()
                        )
                    })?;
                fields.push((field.name().to_owned(), value));
            }
            Value::Record(fields)
        }
        Schema::Ref(_) => unreachable!("references are resolved before matching"),
    })
}
