//! # Binary Encoder
//!
//! Serializes a [`Value`] against a [`Schema`] into the compact binary form
//! described in the [codec docs](crate::codec). Encoding is a pure function
//! over its inputs: no global state, no side effects.
//!
//! A shape mismatch between value and schema fails with a typed
//! [`EncodingError`]; the error report names the record field being encoded
//! when the mismatch is nested.

use eyre::{Result, WrapErr};

use crate::codec::MAX_DEPTH;
use crate::encoding::varint::{encode_varint, encode_zigzag, MAX_VARINT_LEN};
use crate::error::EncodingError;
use crate::schema::{Names, Schema};
use crate::value::Value;

/// Encodes `value` against `schema` into a fresh buffer.
pub fn encode(schema: &Schema, value: &Value) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    encode_into(schema, value, &mut out)?;
    Ok(out)
}

/// Encodes `value` against `schema`, appending to `out`. On error `out` may
/// hold a partial encoding; callers that reuse buffers should stage into a
/// scratch buffer first.
pub fn encode_into(schema: &Schema, value: &Value, out: &mut Vec<u8>) -> Result<()> {
    let names = Names::collect(schema);
    encode_value(schema, value, &names, out, 0)
}

pub(crate) fn write_varint(out: &mut Vec<u8>, value: u64) {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let len = encode_varint(value, &mut buf);
    out.extend_from_slice(&buf[..len]);
}

fn write_zigzag(out: &mut Vec<u8>, value: i64) {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let len = encode_zigzag(value, &mut buf);
    out.extend_from_slice(&buf[..len]);
}

fn encode_value<'a>(
    schema: &'a Schema,
    value: &Value,
    names: &Names<'a>,
    out: &mut Vec<u8>,
    depth: usize,
) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(EncodingError::DepthExceeded(MAX_DEPTH).into());
    }
    let schema = names.resolve(schema)?;

    match (schema, value) {
        (Schema::Null, Value::Null) => Ok(()),
        (Schema::Boolean, Value::Boolean(v)) => {
            out.push(u8::from(*v));
            Ok(())
        }
        (Schema::Int, Value::Int(v)) => {
            write_zigzag(out, i64::from(*v));
            Ok(())
        }
        (Schema::Long, Value::Long(v)) => {
            write_zigzag(out, *v);
            Ok(())
        }
        (Schema::Float, Value::Float(v)) => {
            out.extend_from_slice(&v.to_le_bytes());
            Ok(())
        }
        (Schema::Double, Value::Double(v)) => {
            out.extend_from_slice(&v.to_le_bytes());
            Ok(())
        }
        (Schema::Bytes, Value::Bytes(v)) => {
            write_varint(out, v.len() as u64);
            out.extend_from_slice(v);
            Ok(())
        }
        (Schema::String, Value::String(v)) => {
            write_varint(out, v.len() as u64);
            out.extend_from_slice(v.as_bytes());
            Ok(())
        }
        (Schema::Array(items), Value::Array(elems)) => {
            // Single full-count block; a zero count terminates.
            if !elems.is_empty() {
                write_varint(out, elems.len() as u64);
                for elem in elems {
                    encode_value(items, elem, names, out, depth + 1)?;
                }
            }
            write_varint(out, 0);
            Ok(())
        }
        (Schema::Union(branches), value) => {
            let idx = union_branch(branches, value, names)?;
            write_varint(out, idx as u64);
            encode_value(&branches[idx], value, names, out, depth + 1)
        }
        (Schema::Record(record), value @ Value::Record(_)) => {
            for field in record.fields() {
                let field_value = value.field(field.name()).ok_or_else(|| {
                    eyre::Report::from(EncodingError::MissingField(field.name().to_owned()))
                })?;
                encode_value(field.schema(), field_value, names, out, depth + 1).wrap_err_with(
                    || {
                        format!(
                            "while encoding field `{}` of record `{}`",
                            field.name(),
                            record.name()
                        )
                    },
                )?;
            }
            Ok(())
        }
        (schema, value) => Err(EncodingError::TypeMismatch {
            schema: schema.kind_name(),
            value: value.kind_name(),
        }
        .into()),
    }
}

/// Picks the first union branch whose kind matches the value. Matching is
/// strict: no numeric widening at write time, that is the resolver's job.
pub(crate) fn union_branch<'a>(
    branches: &'a [Schema],
    value: &Value,
    names: &Names<'a>,
) -> Result<usize> {
    for (idx, branch) in branches.iter().enumerate() {
        if branch_matches(names.resolve(branch)?, value) {
            return Ok(idx);
        }
    }
    Err(EncodingError::NoMatchingBranch(value.kind_name()).into())
}

fn branch_matches(branch: &Schema, value: &Value) -> bool {
    matches!(
        (branch, value),
        (Schema::Null, Value::Null)
            | (Schema::Boolean, Value::Boolean(_))
            | (Schema::Int, Value::Int(_))
            | (Schema::Long, Value::Long(_))
            | (Schema::Float, Value::Float(_))
            | (Schema::Double, Value::Double(_))
            | (Schema::Bytes, Value::Bytes(_))
            | (Schema::String, Value::String(_))
            | (Schema::Array(_), Value::Array(_))
            | (Schema::Record(_), Value::Record(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, RecordSchema};

    #[test]
    fn null_encodes_to_no_bytes() {
        assert_eq!(encode(&Schema::Null, &Value::Null).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn boolean_encodes_to_single_byte() {
        assert_eq!(encode(&Schema::Boolean, &Value::Boolean(true)).unwrap(), vec![1]);
        assert_eq!(encode(&Schema::Boolean, &Value::Boolean(false)).unwrap(), vec![0]);
    }

    #[test]
    fn int_uses_zigzag_varint() {
        assert_eq!(encode(&Schema::Int, &Value::Int(0)).unwrap(), vec![0]);
        assert_eq!(encode(&Schema::Int, &Value::Int(-1)).unwrap(), vec![1]);
        assert_eq!(encode(&Schema::Int, &Value::Int(1)).unwrap(), vec![2]);
        assert_eq!(encode(&Schema::Int, &Value::Int(64)).unwrap(), vec![0x80, 0x01]);
    }

    #[test]
    fn string_is_length_prefixed_utf8() {
        assert_eq!(
            encode(&Schema::String, &Value::from("abc")).unwrap(),
            vec![3, b'a', b'b', b'c']
        );
    }

    #[test]
    fn empty_array_is_single_zero_count() {
        let schema = Schema::Array(Box::new(Schema::Int));
        assert_eq!(encode(&schema, &Value::Array(vec![])).unwrap(), vec![0]);
    }

    #[test]
    fn array_is_one_counted_block_plus_terminator() {
        let schema = Schema::Array(Box::new(Schema::Int));
        let value = Value::Array(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(encode(&schema, &value).unwrap(), vec![2, 2, 4, 0]);
    }

    #[test]
    fn union_writes_branch_index_then_branch() {
        let schema = Schema::nullable(Schema::Int);
        assert_eq!(encode(&schema, &Value::Null).unwrap(), vec![0]);
        assert_eq!(encode(&schema, &Value::Int(1)).unwrap(), vec![1, 2]);
    }

    #[test]
    fn record_is_positional() {
        let schema = Schema::Record(
            RecordSchema::new(
                "Pair",
                vec![Field::new("a", Schema::Int), Field::new("b", Schema::Boolean)],
            )
            .unwrap(),
        );
        let value = Value::record(vec![("a", Value::Int(3)), ("b", Value::Boolean(true))]);
        assert_eq!(encode(&schema, &value).unwrap(), vec![6, 1]);
    }

    #[test]
    fn record_ignores_extra_value_fields() {
        let schema = Schema::Record(
            RecordSchema::new("One", vec![Field::new("a", Schema::Int)]).unwrap(),
        );
        let value = Value::record(vec![("a", Value::Int(1)), ("extra", Value::Boolean(true))]);
        assert_eq!(encode(&schema, &value).unwrap(), vec![2]);
    }

    #[test]
    fn missing_field_is_typed_error() {
        let schema = Schema::Record(
            RecordSchema::new("One", vec![Field::new("a", Schema::Int)]).unwrap(),
        );
        let err = encode(&schema, &Value::record::<String>(vec![])).unwrap_err();
        assert_eq!(
            err.downcast_ref::<EncodingError>(),
            Some(&EncodingError::MissingField("a".into()))
        );
    }

    #[test]
    fn type_mismatch_is_typed_error() {
        let err = encode(&Schema::Long, &Value::from("oops")).unwrap_err();
        assert_eq!(
            err.downcast_ref::<EncodingError>(),
            Some(&EncodingError::TypeMismatch {
                schema: "long",
                value: "string"
            })
        );
    }

    #[test]
    fn unmatched_union_value_is_typed_error() {
        let schema = Schema::nullable(Schema::Int);
        let err = encode(&schema, &Value::from("oops")).unwrap_err();
        assert_eq!(
            err.downcast_ref::<EncodingError>(),
            Some(&EncodingError::NoMatchingBranch("string"))
        );
    }

    #[test]
    fn int_value_does_not_match_long_branch() {
        let schema = Schema::Union(vec![Schema::Null, Schema::Long]);
        let err = encode(&schema, &Value::Int(1)).unwrap_err();
        assert!(err.downcast_ref::<EncodingError>().is_some());
    }
}
