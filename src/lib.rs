//! # cbuf: schema parser and binary codec for CBuf messages
//!
//! CBuf is a compact binary message format described by a small schema language.
//! This crate parses schema text into message definitions, derives a 64-bit
//! structural hash per definition (the only type id on the wire), and decodes
//! (and encodes) messages against a hash-keyed registry.
//!
//! ## Schema language
//!
//! - `struct Name { ... }`, optionally `naked struct` or `struct Name @naked`
//! - Scalars: `bool`, `s8`..`s64` (also `i8`, `int8_t`, ...), `u8`..`u64`, `f32`/`float`,
//!   `f64`/`double`, `string`, `short_string`
//! - Arrays: `T x[N]` fixed, `T x[]` dynamic, `T x[N] @compact` compact (at most `N`)
//! - `namespace ns { ... }`, `enum E { A, B = 4 }`, `const u32 N = 8;`, initializers `T x = v;`
//!
//! ```text
//! struct Point { f64 x; f64 y; }
//! struct Path { Point pts[]; }
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! let schema = cbuf::parse_schema("struct Point { f64 x; f64 y; }").unwrap();
//! let registry = cbuf::to_hash_map(&schema).unwrap();
//! let bytes: Vec<u8> = std::fs::read("points.bin").unwrap();
//! let msg = cbuf::decode(&registry, &bytes, 0).unwrap();
//! println!("{}", cbuf::dump::message_to_dump(&registry, &msg));
//! ```

pub mod ast;
pub mod codec;
pub mod diagnostic;
pub mod dump;
pub mod frame;
pub mod hash;
pub mod lexer;
pub mod parser;
pub mod registry;
pub mod value;

pub use ast::{ArrayKind, EnumDefinition, FieldDescriptor, MessageDefinition, ScalarKind, SchemaMap};
pub use codec::{decode, Codec, DecodeError, DecodedMessage, EncodeError, MessageHeader};
pub use frame::{decode_stream, StreamDecodeResult};
pub use lexer::LexError;
pub use parser::{parse_schema, parse_schema_report, ParseReport, SchemaError, MAX_NESTING_DEPTH};
pub use registry::{to_hash_map, HashRegistry, RegistryError};
pub use value::{Value, ValueMap};
