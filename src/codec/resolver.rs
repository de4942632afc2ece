//! # Schema Resolver
//!
//! Decodes bytes produced under a writer schema into values shaped by a
//! different reader schema. The byte stream's layout is dictated solely by
//! the writer schema's field order and types, while the output must conform
//! to the reader schema's field set and types, so resolution walks both
//! schemas in lockstep.
//!
//! ## Record Rule
//!
//! Writer fields are consumed in writer order; the stream has no field
//! markers, so consumption is mandatory whether or not the reader wants the
//! field:
//!
//! - a same-named reader field receives the value, converted to the
//!   reader's declared type,
//! - a field unknown to the reader is decoded and discarded (readers ignore
//!   fields they don't care about),
//! - a reader field with no writer counterpart is filled from its default;
//!   no default is a [`SchemaResolutionError`]; old data satisfies newly
//!   added fields only through declared defaults, never guessed zeros.
//!
//! ## Type Promotion
//!
//! When names match but declared types differ:
//!
//! | Writer | Reader | Result |
//! |--------|--------|--------|
//! | int | long, float, double | numeric widening |
//! | long | float, double | numeric widening |
//! | float | double | numeric widening |
//! | string | bytes | UTF-8 bytes as-is |
//! | bytes | string | validated UTF-8 |
//! | any T | union containing T | first compatible branch |
//! | union | non-union T | legal only if the encoded branch resolves to T |
//!
//! Widening never raises a precision-loss error even though float/double
//! may lose integer precision. Anything outside the table is a
//! [`SchemaResolutionError`]; there is no best-effort coercion.
//!
//! Arrays recurse item resolution; records match by name inside unions and
//! recurse per-field; named references resolve through their own side's
//! registry.

use eyre::{Result, WrapErr};

use crate::codec::decoder::{decode_value, Decoder};
use crate::codec::MAX_DEPTH;
use crate::error::{DecodingError, SchemaResolutionError};
use crate::schema::{Names, Schema};
use crate::value::Value;

/// Decodes one value written under `writer`, shaped by `reader`. Requires
/// `bytes` to be exactly one encoding.
pub fn decode_resolved(writer: &Schema, reader: &Schema, bytes: &[u8]) -> Result<Value> {
    let mut decoder = Decoder::new(bytes);
    let value = decoder.decode_resolved(writer, reader)?;
    if decoder.remaining() > 0 {
        return Err(DecodingError::TrailingBytes(decoder.remaining()).into());
    }
    Ok(value)
}

impl Decoder<'_> {
    /// Resolution-mode counterpart of [`Decoder::decode`]: consumes exactly
    /// the writer encoding of one value, producing a reader-shaped value.
    pub fn decode_resolved(&mut self, writer: &Schema, reader: &Schema) -> Result<Value> {
        let writer_names = Names::collect(writer);
        let reader_names = Names::collect(reader);
        resolve_value(writer, reader, &writer_names, &reader_names, self, 0)
    }
}

fn resolve_value<'w, 'r>(
    writer: &'w Schema,
    reader: &'r Schema,
    writer_names: &Names<'w>,
    reader_names: &Names<'r>,
    dec: &mut Decoder,
    depth: usize,
) -> Result<Value> {
    if depth > MAX_DEPTH {
        return Err(DecodingError::DepthExceeded(MAX_DEPTH).into());
    }
    let writer = writer_names.resolve(writer)?;
    let reader = reader_names.resolve(reader)?;

    Ok(match (writer, reader) {
        // A written union resolves through the branch that was actually
        // encoded; this must run before the reader-union rule so that
        // union-to-union reads pick the reader branch per record.
        (Schema::Union(branches), _) => {
            let index = dec.read_varint()?;
            let branch = branches.get(index as usize).ok_or(
                DecodingError::UnionIndexOutOfRange {
                    index,
                    branches: branches.len(),
                },
            )?;
            resolve_value(branch, reader, writer_names, reader_names, dec, depth + 1)?
        }
        (writer, Schema::Union(branches)) => {
            let branch = branches
                .iter()
                .find(|branch| compatible(writer, branch, writer_names, reader_names))
                .ok_or_else(|| SchemaResolutionError::NoReaderBranch(writer.kind_name()))?;
            resolve_value(writer, branch, writer_names, reader_names, dec, depth + 1)?
        }
        (Schema::Null, Schema::Null) => Value::Null,
        (Schema::Boolean, Schema::Boolean)
        | (Schema::Int, Schema::Int)
        | (Schema::Long, Schema::Long)
        | (Schema::Float, Schema::Float)
        | (Schema::Double, Schema::Double)
        | (Schema::Bytes, Schema::Bytes)
        | (Schema::String, Schema::String) => decode_value(writer, writer_names, dec, depth)?,
        (Schema::Int, Schema::Long) => Value::Long(read_int(dec)?.into()),
        (Schema::Int, Schema::Float) => Value::Float(read_int(dec)? as f32),
        (Schema::Int, Schema::Double) => Value::Double(f64::from(read_int(dec)?)),
        (Schema::Long, Schema::Float) => Value::Float(dec.read_zigzag()? as f32),
        (Schema::Long, Schema::Double) => Value::Double(dec.read_zigzag()? as f64),
        (Schema::Float, Schema::Double) => match decode_value(writer, writer_names, dec, depth)? {
            Value::Float(v) => Value::Double(f64::from(v)),
            _ => unreachable!("float schema decodes to float"),
        },
        (Schema::String, Schema::Bytes) => {
            let len = dec.read_len()?;
            Value::Bytes(dec.take(len)?.to_vec())
        }
        (Schema::Bytes, Schema::String) => {
            let len = dec.read_len()?;
            let text = std::str::from_utf8(dec.take(len)?)
                .map_err(|_| DecodingError::InvalidUtf8)?;
            Value::String(text.to_owned())
        }
        (Schema::Array(writer_items), Schema::Array(reader_items)) => {
            let mut elems = Vec::new();
            loop {
                let count = dec.read_varint()?;
                if count == 0 {
                    break;
                }
                if count > crate::codec::MAX_BLOCK_ITEMS as u64 {
                    return Err(DecodingError::BlockTooLarge {
                        count,
                        limit: crate::codec::MAX_BLOCK_ITEMS,
                    }
                    .into());
                }
                for _ in 0..count {
                    elems.push(resolve_value(
                        writer_items,
                        reader_items,
                        writer_names,
                        reader_names,
                        dec,
                        depth + 1,
                    )?);
                }
            }
            Value::Array(elems)
        }
        (Schema::Record(writer_record), Schema::Record(reader_record)) => {
            let reader_fields = reader_record.fields();
            let mut resolved: Vec<Option<Value>> = vec![None; reader_fields.len()];

            for writer_field in writer_record.fields() {
                let reader_idx = reader_fields
                    .iter()
                    .position(|rf| rf.name() == writer_field.name());
                match reader_idx {
                    Some(idx) => {
                        let value = resolve_value(
                            writer_field.schema(),
                            reader_fields[idx].schema(),
                            writer_names,
                            reader_names,
                            dec,
                            depth + 1,
                        )
                        .wrap_err_with(|| {
                            format!(
                                "while resolving field `{}` of record `{}`",
                                writer_field.name(),
                                writer_record.name()
                            )
                        })?;
                        resolved[idx] = Some(value);
                    }
                    None => {
                        // The reader doesn't know this field; its bytes
                        // still have to be consumed.
                        decode_value(writer_field.schema(), writer_names, dec, depth + 1)
                            .wrap_err_with(|| {
                                format!(
                                    "while skipping field `{}` of record `{}`",
                                    writer_field.name(),
                                    writer_record.name()
                                )
                            })?;
                    }
                }
            }

            let mut fields = Vec::with_capacity(reader_fields.len());
            for (idx, reader_field) in reader_fields.iter().enumerate() {
                let value = match resolved[idx].take() {
                    Some(value) => value,
                    None => match reader_field.default() {
                        Some(default) => default.clone(),
                        None => {
                            return Err(SchemaResolutionError::MissingDefault {
                                record: reader_record.name().to_owned(),
                                field: reader_field.name().to_owned(),
                            }
                            .into())
                        }
                    },
                };
                fields.push((reader_field.name().to_owned(), value));
            }
            Value::Record(fields)
        }
        (writer, reader) => {
            return Err(SchemaResolutionError::Incompatible {
                writer: writer.kind_name(),
                reader: reader.kind_name(),
            }
            .into())
        }
    })
}

fn read_int(dec: &mut Decoder) -> Result<i32> {
    let v = dec.read_zigzag()?;
    i32::try_from(v).map_err(|_| DecodingError::IntOutOfRange(v).into())
}

/// Schema-level compatibility used to pick a reader union branch before any
/// bytes are consumed. Mirrors the promotion table; records match by name.
fn compatible<'w, 'r>(
    writer: &'w Schema,
    reader: &'r Schema,
    writer_names: &Names<'w>,
    reader_names: &Names<'r>,
) -> bool {
    let writer = match writer_names.resolve(writer) {
        Ok(schema) => schema,
        Err(_) => return false,
    };
    let reader = match reader_names.resolve(reader) {
        Ok(schema) => schema,
        Err(_) => return false,
    };

    match (writer, reader) {
        (Schema::Union(branches), reader) => branches
            .iter()
            .any(|branch| compatible(branch, reader, writer_names, reader_names)),
        (writer, Schema::Union(branches)) => branches
            .iter()
            .any(|branch| compatible(writer, branch, writer_names, reader_names)),
        (Schema::Null, Schema::Null)
        | (Schema::Boolean, Schema::Boolean)
        | (Schema::Int, Schema::Int | Schema::Long | Schema::Float | Schema::Double)
        | (Schema::Long, Schema::Long | Schema::Float | Schema::Double)
        | (Schema::Float, Schema::Float | Schema::Double)
        | (Schema::Double, Schema::Double)
        | (Schema::Bytes, Schema::Bytes | Schema::String)
        | (Schema::String, Schema::String | Schema::Bytes) => true,
        (Schema::Array(writer_items), Schema::Array(reader_items)) => {
            compatible(writer_items, reader_items, writer_names, reader_names)
        }
        (Schema::Record(writer_record), Schema::Record(reader_record)) => {
            writer_record.name() == reader_record.name()
        }
        _ => false,
    }
}
