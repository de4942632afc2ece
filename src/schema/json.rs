//! # Canonical JSON Schema Text
//!
//! Container files are self-describing: the header embeds the writer schema
//! as JSON text, and [`ContainerReader::open`](crate::ContainerReader::open)
//! parses it back. This module owns that canonical form plus the
//! schema-guided conversion between [`Value`] and JSON used for field
//! defaults and the text encoder.
//!
//! ## Form
//!
//! - primitives: `"null"`, `"boolean"`, `"int"`, `"long"`, `"float"`,
//!   `"double"`, `"bytes"`, `"string"`
//! - arrays: `{"type": "array", "items": <schema>}`
//! - unions: `[<schema>, ...]`
//! - records: `{"type": "record", "name": <n>, "fields": [{"name": ..,
//!   "type": <schema>, "default": <json>?}, ...]}`
//! - named references: any other bare string
//!
//! A record appearing in several places of one tree is emitted in full each
//! time; parsing registers the first definition of each name, so the text
//! round-trips.
//!
//! ## Defaults
//!
//! A field default is JSON interpreted against the field schema. For a
//! union-typed field the default targets the union's first branch (so
//! nullable fields default from `null`). `bytes` defaults are base64
//! strings. Defaults whose field type is a named reference are rejected;
//! inline record defaults work.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use eyre::{bail, ensure, Result, WrapErr};
use serde_json::{Map, Number, Value as Json};

use crate::error::EncodingError;
use crate::schema::{Field, Names, RecordSchema, Schema};
use crate::value::Value;

impl Schema {
    pub fn to_json(&self) -> Result<Json> {
        let names = Names::collect(self);
        schema_to_json(self, &names)
    }

    /// Renders the canonical JSON text embedded in container headers.
    pub fn to_text(&self) -> Result<String> {
        Ok(self.to_json()?.to_string())
    }

    pub fn from_json(json: &Json) -> Result<Schema> {
        schema_from_json(json)
    }

    /// Parses canonical JSON text and validates the resulting tree.
    pub fn from_text(text: &str) -> Result<Schema> {
        let json: Json =
            serde_json::from_str(text).wrap_err("schema text is not valid JSON")?;
        let schema = schema_from_json(&json)?;
        schema.validate()?;
        Ok(schema)
    }
}

fn schema_to_json<'a>(schema: &'a Schema, names: &Names<'a>) -> Result<Json> {
    Ok(match schema {
        Schema::Null
        | Schema::Boolean
        | Schema::Int
        | Schema::Long
        | Schema::Float
        | Schema::Double
        | Schema::Bytes
        | Schema::String => Json::String(schema.kind_name().to_owned()),
        Schema::Array(items) => {
            let mut obj = Map::new();
            obj.insert("type".to_owned(), Json::String("array".to_owned()));
            obj.insert("items".to_owned(), schema_to_json(items, names)?);
            Json::Object(obj)
        }
        Schema::Union(branches) => {
            let mut out = Vec::with_capacity(branches.len());
            for branch in branches {
                out.push(schema_to_json(branch, names)?);
            }
            Json::Array(out)
        }
        Schema::Record(record) => {
            let mut fields = Vec::with_capacity(record.fields().len());
            for field in record.fields() {
                let mut obj = Map::new();
                obj.insert("name".to_owned(), Json::String(field.name().to_owned()));
                obj.insert("type".to_owned(), schema_to_json(field.schema(), names)?);
                if let Some(default) = field.default() {
                    let json = default_to_json(field.schema(), default, names)
                        .wrap_err_with(|| {
                            format!(
                                "default of field `{}` in record `{}`",
                                field.name(),
                                record.name()
                            )
                        })?;
                    obj.insert("default".to_owned(), json);
                }
                fields.push(Json::Object(obj));
            }

            let mut obj = Map::new();
            obj.insert("type".to_owned(), Json::String("record".to_owned()));
            obj.insert("name".to_owned(), Json::String(record.name().to_owned()));
            obj.insert("fields".to_owned(), Json::Array(fields));
            Json::Object(obj)
        }
        Schema::Ref(name) => Json::String(name.clone()),
    })
}

fn schema_from_json(json: &Json) -> Result<Schema> {
    match json {
        Json::String(name) => Ok(match name.as_str() {
            "null" => Schema::Null,
            "boolean" => Schema::Boolean,
            "int" => Schema::Int,
            "long" => Schema::Long,
            "float" => Schema::Float,
            "double" => Schema::Double,
            "bytes" => Schema::Bytes,
            "string" => Schema::String,
            _ => Schema::Ref(name.clone()),
        }),
        Json::Array(branches) => {
            let mut out = Vec::with_capacity(branches.len());
            for branch in branches {
                out.push(schema_from_json(branch)?);
            }
            Ok(Schema::Union(out))
        }
        Json::Object(obj) => {
            let kind = obj
                .get("type")
                .and_then(Json::as_str)
                .ok_or_else(|| eyre::eyre!("schema object missing string `type`"))?;
            match kind {
                "array" => {
                    let items = obj
                        .get("items")
                        .ok_or_else(|| eyre::eyre!("array schema missing `items`"))?;
                    Ok(Schema::Array(Box::new(schema_from_json(items)?)))
                }
                "record" => {
                    let name = obj
                        .get("name")
                        .and_then(Json::as_str)
                        .ok_or_else(|| eyre::eyre!("record schema missing string `name`"))?;
                    let fields_json = obj
                        .get("fields")
                        .and_then(Json::as_array)
                        .ok_or_else(|| eyre::eyre!("record schema missing `fields` array"))?;

                    let mut fields = Vec::with_capacity(fields_json.len());
                    for field_json in fields_json {
                        fields.push(field_from_json(field_json).wrap_err_with(|| {
                            format!("in a field of record `{}`", name)
                        })?);
                    }
                    Ok(Schema::Record(RecordSchema::new(name, fields)?))
                }
                other => schema_from_json(&Json::String(other.to_owned())),
            }
        }
        other => bail!("unexpected JSON {} in schema position", json_kind(other)),
    }
}

fn field_from_json(json: &Json) -> Result<Field> {
    let obj = match json {
        Json::Object(obj) => obj,
        other => bail!("record field must be an object, got {}", json_kind(other)),
    };

    let name = obj
        .get("name")
        .and_then(Json::as_str)
        .ok_or_else(|| eyre::eyre!("field missing string `name`"))?;
    let schema_json = obj
        .get("type")
        .ok_or_else(|| eyre::eyre!("field `{}` missing `type`", name))?;
    let schema = schema_from_json(schema_json)?;

    match obj.get("default") {
        Some(default_json) => {
            let default = default_from_json(&schema, default_json)
                .wrap_err_with(|| format!("default of field `{}`", name))?;
            Ok(Field::with_default(name, schema, default))
        }
        None => Ok(Field::new(name, schema)),
    }
}

/// Converts a field default to JSON. Union-typed fields target the first
/// branch.
fn default_to_json<'a>(schema: &'a Schema, default: &Value, names: &Names<'a>) -> Result<Json> {
    let target = match schema {
        Schema::Union(branches) => branches
            .first()
            .ok_or_else(|| eyre::eyre!("union must have at least one branch"))?,
        other => other,
    };
    value_to_json(target, default, names, 0)
}

/// Parses a field default from JSON against the field schema. Runs before
/// the enclosing tree is complete, so named references cannot be followed.
fn default_from_json(schema: &Schema, json: &Json) -> Result<Value> {
    let target = match schema {
        Schema::Union(branches) => branches
            .first()
            .ok_or_else(|| eyre::eyre!("union must have at least one branch"))?,
        other => other,
    };

    Ok(match target {
        Schema::Null => {
            ensure!(json.is_null(), "expected null default, got {}", json_kind(json));
            Value::Null
        }
        Schema::Boolean => Value::Boolean(
            json.as_bool()
                .ok_or_else(|| eyre::eyre!("expected boolean default, got {}", json_kind(json)))?,
        ),
        Schema::Int => {
            let n = json
                .as_i64()
                .ok_or_else(|| eyre::eyre!("expected integer default, got {}", json_kind(json)))?;
            let n = i32::try_from(n).wrap_err("int default out of 32-bit range")?;
            Value::Int(n)
        }
        Schema::Long => Value::Long(
            json.as_i64()
                .ok_or_else(|| eyre::eyre!("expected integer default, got {}", json_kind(json)))?,
        ),
        Schema::Float => {
            let n = json
                .as_f64()
                .ok_or_else(|| eyre::eyre!("expected number default, got {}", json_kind(json)))?;
            Value::Float(n as f32)
        }
        Schema::Double => Value::Double(
            json.as_f64()
                .ok_or_else(|| eyre::eyre!("expected number default, got {}", json_kind(json)))?,
        ),
        Schema::Bytes => {
            let text = json
                .as_str()
                .ok_or_else(|| eyre::eyre!("expected base64 string default, got {}", json_kind(json)))?;
            Value::Bytes(BASE64.decode(text).wrap_err("invalid base64 in bytes default")?)
        }
        Schema::String => Value::String(
            json.as_str()
                .ok_or_else(|| eyre::eyre!("expected string default, got {}", json_kind(json)))?
                .to_owned(),
        ),
        Schema::Array(items) => {
            let elems = json
                .as_array()
                .ok_or_else(|| eyre::eyre!("expected array default, got {}", json_kind(json)))?;
            let mut out = Vec::with_capacity(elems.len());
            for elem in elems {
                out.push(default_from_json(items, elem)?);
            }
            Value::Array(out)
        }
        Schema::Record(record) => {
            let obj = json
                .as_object()
                .ok_or_else(|| eyre::eyre!("expected object default, got {}", json_kind(json)))?;
            let mut fields = Vec::with_capacity(record.fields().len());
            for field in record.fields() {
                let field_json = obj
                    .get(field.name())
                    .ok_or_else(|| eyre::eyre!("record default missing field `{}`", field.name()))?;
                fields.push((
                    field.name().to_owned(),
                    default_from_json(field.schema(), field_json)?,
                ));
            }
            Value::Record(fields)
        }
        Schema::Ref(name) => bail!(
            "default for named reference `{}` is not supported; inline the record",
            name
        ),
        Schema::Union(_) => unreachable!("first branch of a union is never a union"),
    })
}

/// Renders a value as JSON in schema field order. Shared by the text
/// encoder and default serialization; shape mismatches fail with the same
/// [`EncodingError`]s as the binary encoder.
pub(crate) fn value_to_json<'a>(
    schema: &'a Schema,
    value: &Value,
    names: &Names<'a>,
    depth: usize,
) -> Result<Json> {
    if depth > crate::codec::MAX_DEPTH {
        return Err(EncodingError::DepthExceeded(crate::codec::MAX_DEPTH).into());
    }
    let schema = names.resolve(schema)?;

    Ok(match (schema, value) {
        (Schema::Null, Value::Null) => Json::Null,
        (Schema::Boolean, Value::Boolean(v)) => Json::Bool(*v),
        (Schema::Int, Value::Int(v)) => Json::Number((*v).into()),
        (Schema::Long, Value::Long(v)) => Json::Number((*v).into()),
        (Schema::Float, Value::Float(v)) => float_to_json(f64::from(*v))?,
        (Schema::Double, Value::Double(v)) => float_to_json(*v)?,
        (Schema::Bytes, Value::Bytes(v)) => Json::String(BASE64.encode(v)),
        (Schema::String, Value::String(v)) => Json::String(v.clone()),
        (Schema::Array(items), Value::Array(elems)) => {
            let mut out = Vec::with_capacity(elems.len());
            for elem in elems {
                out.push(value_to_json(items, elem, names, depth + 1)?);
            }
            Json::Array(out)
        }
        (Schema::Union(branches), value) => {
            let idx = crate::codec::union_branch(branches, value, names)?;
            value_to_json(&branches[idx], value, names, depth + 1)?
        }
        (Schema::Record(record), value @ Value::Record(_)) => {
            let mut obj = Map::new();
            for field in record.fields() {
                let field_value = value.field(field.name()).ok_or_else(|| {
                    eyre::Report::from(EncodingError::MissingField(field.name().to_owned()))
                })?;
                let json = value_to_json(field.schema(), field_value, names, depth + 1)
                    .wrap_err_with(|| {
                        format!(
                            "while rendering field `{}` of record `{}`",
                            field.name(),
                            record.name()
                        )
                    })?;
                obj.insert(field.name().to_owned(), json);
            }
            Json::Object(obj)
        }
        (schema, value) => {
            return Err(EncodingError::TypeMismatch {
                schema: schema.kind_name(),
                value: value.kind_name(),
            }
            .into())
        }
    })
}

fn float_to_json(value: f64) -> Result<Json> {
    match Number::from_f64(value) {
        Some(n) => Ok(Json::Number(n)),
        None => bail!("non-finite float {} cannot be rendered as JSON", value),
    }
}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
