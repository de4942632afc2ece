//! # volant - Schema-Evolution Binary Serialization
//!
//! volant is a schema-driven binary serialization library built around one
//! hard problem: data written under one schema (the *writer schema*) must
//! be readable correctly under a structurally different but compatible
//! schema (the *reader schema*). Fields can be reordered, added with
//! defaults, removed, or widened, and old files keep reading.
//!
//! ## Quick Start
//!
//! ```ignore
//! use volant::{ContainerReader, ContainerWriter, Field, RecordSchema, Schema, Value};
//!
//! let schema = Schema::Record(RecordSchema::new(
//!     "Employee",
//!     vec![
//!         Field::new("name", Schema::String),
//!         Field::new("age", Schema::Int),
//!     ],
//! )?);
//!
//! let mut writer = ContainerWriter::builder("employees.vc", schema)
//!     .metadata("Meta-Key0", "Meta-Value0")
//!     .create()?;
//! writer.append(&Value::record(vec![
//!     ("name", Value::from("Joe")),
//!     ("age", Value::Int(31)),
//! ]))?;
//! writer.close()?;
//!
//! let mut reader = ContainerReader::open("employees.vc")?;
//! while reader.has_next()? {
//!     let employee = reader.next()?;
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! application values
//!        │  (adapter, outside the core)
//!        ▼
//! ┌─────────────────────────────────────┐
//! │   Value Model (schema-tagged)        │
//! ├─────────────────────────────────────┤
//! │   Binary / Text Encoders             │
//! ├─────────────────────────────────────┤
//! │   Decoder + Schema Resolver          │
//! ├─────────────────────────────────────┤
//! │   Container Files (blocks + sync)    │
//! └─────────────────────────────────────┘
//! ```
//!
//! Records are encoded positionally (no field names on the wire), so the
//! byte stream is only meaningful alongside the exact writer schema.
//! Container files embed that schema as JSON text, making every file
//! self-describing. At read time the resolver walks writer and reader
//! schemas in lockstep, consuming bytes in writer layout while producing
//! values in reader shape.
//!
//! ## Module Overview
//!
//! - [`schema`]: schema model, named references, canonical JSON text form
//! - [`value`]: dynamic schema-tagged values
//! - [`encoding`]: variable-length integer primitives
//! - [`codec`]: binary encoder/decoder, schema resolver, text encoder
//! - [`container`]: self-describing block file writer and reader
//! - [`error`]: the typed error taxonomy carried inside `eyre` reports
//!
//! ## Concurrency Model
//!
//! Encoding and decoding single records are pure, non-blocking
//! computations. Only container I/O touches the filesystem. A writer
//! handle is single-threaded; any number of readers may open one completed
//! file concurrently.

pub mod codec;
pub mod container;
pub mod encoding;
pub mod error;
pub mod schema;
pub mod value;

pub use codec::{decode, decode_resolved, encode, encode_into, encode_text, Decoder};
pub use container::{ContainerReader, ContainerWriter, ContainerWriterBuilder};
pub use error::{CorruptFileError, DecodingError, EncodingError, SchemaResolutionError};
pub use schema::{Field, Names, RecordSchema, Schema};
pub use value::Value;
