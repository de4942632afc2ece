//! Fuzz testing for the binary decoder and resolver.
//!
//! This fuzz target feeds arbitrary byte sequences to `decode` and
//! `decode_resolved` under a mix of schemas to ensure malformed input is
//! rejected gracefully without panicking or hanging.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use volant::{decode, decode_resolved, Field, RecordSchema, Schema, Value};

#[derive(Debug, Arbitrary)]
struct DecodeInput {
    schema: FuzzSchema,
    data: Vec<u8>,
}

#[derive(Debug, Arbitrary, Clone, Copy)]
enum FuzzSchema {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    IntArray,
    NullableString,
    Employee,
}

fn build_schema(fs: FuzzSchema) -> Schema {
    match fs {
        FuzzSchema::Null => Schema::Null,
        FuzzSchema::Boolean => Schema::Boolean,
        FuzzSchema::Int => Schema::Int,
        FuzzSchema::Long => Schema::Long,
        FuzzSchema::Float => Schema::Float,
        FuzzSchema::Double => Schema::Double,
        FuzzSchema::Bytes => Schema::Bytes,
        FuzzSchema::String => Schema::String,
        FuzzSchema::IntArray => Schema::Array(Box::new(Schema::Int)),
        FuzzSchema::NullableString => Schema::nullable(Schema::String),
        FuzzSchema::Employee => Schema::Record(
            RecordSchema::new(
                "Employee",
                vec![
                    Field::new("name", Schema::String),
                    Field::new("age", Schema::Int),
                    Field::new("emails", Schema::Array(Box::new(Schema::String))),
                    Field::new("boss", Schema::nullable(Schema::Ref("Employee".into()))),
                ],
            )
            .unwrap(),
        ),
    }
}

fn reader_counterpart(fs: FuzzSchema) -> Schema {
    match fs {
        FuzzSchema::Int => Schema::Double,
        FuzzSchema::String => Schema::Bytes,
        FuzzSchema::Employee => Schema::Record(
            RecordSchema::new(
                "Employee",
                vec![
                    Field::new("name", Schema::String),
                    Field::new("age", Schema::Long),
                    Field::with_default("gender", Schema::String, Value::from("unknown")),
                ],
            )
            .unwrap(),
        ),
        other => build_schema(other),
    }
}

fuzz_target!(|input: DecodeInput| {
    if input.data.len() > 1 << 16 {
        return;
    }

    let writer = build_schema(input.schema);
    let _ = decode(&writer, &input.data);

    let reader = reader_counterpart(input.schema);
    let _ = decode_resolved(&writer, &reader, &input.data);
});
