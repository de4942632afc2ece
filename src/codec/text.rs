//! # Text Encoder
//!
//! Renders a (schema, value) pair as structured JSON text for inspection
//! and export. The rendering follows the same field order as the binary
//! encoder; there is no schema-resolution concept here, and text output only
//! ever runs in writer-schema mode.
//!
//! Records render as objects, arrays as lists, bytes as base64 strings, and
//! union values as the encoded branch's value directly. Shape mismatches
//! fail with the same [`EncodingError`](crate::error::EncodingError)s the
//! binary encoder raises.

use eyre::Result;

use crate::schema::json::value_to_json;
use crate::schema::{Names, Schema};
use crate::value::Value;

/// Renders `value` against `schema` as one line of JSON text.
pub fn encode_text(schema: &Schema, value: &Value) -> Result<String> {
    let names = Names::collect(schema);
    Ok(value_to_json(schema, value, &names, 0)?.to_string())
}
