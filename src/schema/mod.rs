//! # Schema Model
//!
//! This module provides the in-memory representation of a type description.
//! A schema is an immutable tree of primitive, array, union, and record
//! nodes; recursion is expressed through named references resolved against a
//! registry collected from the tree.
//!
//! ## Schema Kinds
//!
//! | Kind | Wire form | Notes |
//! |------|-----------|-------|
//! | `Null` | zero bytes | only matches the `Null` value |
//! | `Boolean` | 1 byte | |
//! | `Int` | zig-zag varint | 32-bit range |
//! | `Long` | zig-zag varint | 64-bit range |
//! | `Float` | 4 bytes LE | IEEE-754 |
//! | `Double` | 8 bytes LE | IEEE-754 |
//! | `Bytes` | varint length + raw | |
//! | `String` | varint length + UTF-8 | |
//! | `Array` | counted blocks | zero count terminates |
//! | `Union` | varint branch index + branch | nullability is `[null, T]` |
//! | `Record` | fields in declared order | positional, no names on the wire |
//! | `Ref` | as the referenced record | self/named reference |
//!
//! ## Recursive Records
//!
//! A record field typed as its enclosing record (an employee's boss is
//! itself an employee) cannot be built as an owned subtree. Instead the
//! field uses `Schema::Ref("Employee")`, and every codec walk resolves
//! references through a [`Names`] registry collected once from the root
//! schema. A record name is registered before its field types are consulted,
//! so construction never expands infinitely.
//!
//! ## Invariants
//!
//! - Field names within a record are unique (enforced by
//!   [`RecordSchema::new`]).
//! - Unions are non-empty and never directly contain another union
//!   (enforced by [`Schema::validate`]).
//! - Every `Ref` resolves to a record in the same tree (enforced by
//!   [`Schema::validate`]; codec walks fail on unknown references either
//!   way).
//!
//! ## Lifecycles
//!
//! Schemas are constructed once and treated as immutable for the lifetime of
//! any read or write session. [`Names`] borrows from the schema it was
//! collected from and is rebuilt per operation; collection is a cheap finite
//! walk.

pub(crate) mod json;

use eyre::{bail, ensure, Result, WrapErr};
use hashbrown::{HashMap, HashSet};

use crate::value::Value;

/// A type description. See the module docs for the wire form of each kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Array(Box<Schema>),
    Union(Vec<Schema>),
    Record(RecordSchema),
    /// Named reference to a record defined elsewhere in the same tree.
    Ref(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    name: String,
    fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    schema: Schema,
    default: Option<Value>,
}

impl Schema {
    /// Shorthand for the `[null, inner]` union used for optional fields.
    pub fn nullable(inner: Schema) -> Schema {
        Schema::Union(vec![Schema::Null, inner])
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Schema::Null => "null",
            Schema::Boolean => "boolean",
            Schema::Int => "int",
            Schema::Long => "long",
            Schema::Float => "float",
            Schema::Double => "double",
            Schema::Bytes => "bytes",
            Schema::String => "string",
            Schema::Array(_) => "array",
            Schema::Union(_) => "union",
            Schema::Record(_) => "record",
            Schema::Ref(_) => "ref",
        }
    }

    /// Checks structural invariants across the whole tree: unions are
    /// non-empty and not directly nested, and every named reference resolves.
    pub fn validate(&self) -> Result<()> {
        let names = Names::collect(self);
        validate_node(self, &names)
    }
}

fn validate_node(schema: &Schema, names: &Names) -> Result<()> {
    match schema {
        Schema::Array(items) => validate_node(items, names),
        Schema::Union(branches) => {
            ensure!(!branches.is_empty(), "union must have at least one branch");
            for branch in branches {
                ensure!(
                    !matches!(branch, Schema::Union(_)),
                    "union must not directly contain another union"
                );
                validate_node(branch, names)?;
            }
            Ok(())
        }
        Schema::Record(record) => {
            for field in record.fields() {
                validate_node(field.schema(), names)
                    .wrap_err_with(|| format!("in field `{}` of record `{}`", field.name(), record.name()))?;
            }
            Ok(())
        }
        Schema::Ref(name) => {
            ensure!(
                names.get(name).is_some(),
                "unresolved schema reference `{}`",
                name
            );
            Ok(())
        }
        _ => Ok(()),
    }
}

impl RecordSchema {
    /// Builds a record schema, rejecting duplicate field names.
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Result<Self> {
        let name = name.into();
        let mut seen = HashSet::new();
        for field in &fields {
            ensure!(
                seen.insert(field.name.clone()),
                "duplicate field `{}` in record `{}`",
                field.name,
                name
            );
        }
        Ok(Self { name, fields })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl Field {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            default: None,
        }
    }

    pub fn with_default(name: impl Into<String>, schema: Schema, default: Value) -> Self {
        Self {
            name: name.into(),
            schema,
            default: Some(default),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

/// Registry of record names collected from one schema tree, used to resolve
/// [`Schema::Ref`] nodes during encoding, decoding, and resolution.
pub struct Names<'a> {
    map: HashMap<&'a str, &'a Schema>,
}

impl<'a> Names<'a> {
    pub fn collect(root: &'a Schema) -> Names<'a> {
        let mut names = Names {
            map: HashMap::new(),
        };
        names.walk(root);
        names
    }

    fn walk(&mut self, schema: &'a Schema) {
        match schema {
            Schema::Array(items) => self.walk(items),
            Schema::Union(branches) => {
                for branch in branches {
                    self.walk(branch);
                }
            }
            Schema::Record(record) => {
                // Register the name before the fields so self-references
                // terminate.
                self.map.entry(record.name.as_str()).or_insert(schema);
                for field in &record.fields {
                    self.walk(&field.schema);
                }
            }
            _ => {}
        }
    }

    pub fn get(&self, name: &str) -> Option<&'a Schema> {
        self.map.get(name).copied()
    }

    /// Follows a named reference to its record definition; any other schema
    /// node is returned unchanged.
    pub fn resolve(&self, schema: &'a Schema) -> Result<&'a Schema> {
        match schema {
            Schema::Ref(name) => match self.get(name) {
                Some(record) => Ok(record),
                None => bail!("unresolved schema reference `{}`", name),
            },
            other => Ok(other),
        }
    }
}
