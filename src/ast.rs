//! Message definitions produced by the schema parser.
//!
//! A [`MessageDefinition`] is immutable once built and is shared as
//! `Arc<MessageDefinition>` between the name-keyed [`SchemaMap`] and the
//! hash-keyed [`HashRegistry`](crate::registry::HashRegistry).

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Fully qualified type name → definition, in declaration order.
pub type SchemaMap = IndexMap<String, Arc<MessageDefinition>>;

/// Width of a `short_string` field on the wire.
pub const SHORT_STRING_LEN: usize = 16;

/// Element type of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    /// Length-prefixed text.
    String,
    /// Fixed 16-byte, NUL-padded text.
    ShortString,
    /// Enumeration, stored as `i32`.
    Enum(Arc<EnumDefinition>),
    Struct(NestedRef),
}

impl ScalarKind {
    /// Map a schema keyword (`u8`, `s32`, `float64`, ...) to its kind.
    pub fn from_keyword(s: &str) -> Option<Self> {
        let kind = match s {
            "bool" => ScalarKind::Bool,
            "s8" | "i8" | "int8" | "int8_t" => ScalarKind::I8,
            "s16" | "i16" | "int16" | "int16_t" => ScalarKind::I16,
            "s32" | "i32" | "int32" | "int32_t" => ScalarKind::I32,
            "s64" | "i64" | "int64" | "int64_t" => ScalarKind::I64,
            "u8" | "uint8" | "uint8_t" => ScalarKind::U8,
            "u16" | "uint16" | "uint16_t" => ScalarKind::U16,
            "u32" | "uint32" | "uint32_t" => ScalarKind::U32,
            "u64" | "uint64" | "uint64_t" => ScalarKind::U64,
            "f32" | "float" | "float32" => ScalarKind::F32,
            "f64" | "double" | "float64" => ScalarKind::F64,
            "string" => ScalarKind::String,
            "short_string" => ScalarKind::ShortString,
            _ => return None,
        };
        Some(kind)
    }

    /// Byte width on the wire, `None` for variable-size or struct kinds.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            ScalarKind::Bool | ScalarKind::I8 | ScalarKind::U8 => Some(1),
            ScalarKind::I16 | ScalarKind::U16 => Some(2),
            ScalarKind::I32 | ScalarKind::U32 | ScalarKind::F32 | ScalarKind::Enum(_) => Some(4),
            ScalarKind::I64 | ScalarKind::U64 | ScalarKind::F64 => Some(8),
            ScalarKind::ShortString => Some(SHORT_STRING_LEN),
            ScalarKind::String | ScalarKind::Struct(_) => None,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ScalarKind::I8
                | ScalarKind::I16
                | ScalarKind::I32
                | ScalarKind::I64
                | ScalarKind::U8
                | ScalarKind::U16
                | ScalarKind::U32
                | ScalarKind::U64
        )
    }

    pub fn nested(&self) -> Option<&NestedRef> {
        match self {
            ScalarKind::Struct(r) => Some(r),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScalarKind::Bool => "bool",
            ScalarKind::I8 => "s8",
            ScalarKind::I16 => "s16",
            ScalarKind::I32 => "s32",
            ScalarKind::I64 => "s64",
            ScalarKind::U8 => "u8",
            ScalarKind::U16 => "u16",
            ScalarKind::U32 => "u32",
            ScalarKind::U64 => "u64",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
            ScalarKind::String => "string",
            ScalarKind::ShortString => "short_string",
            ScalarKind::Enum(e) => e.type_name.as_str(),
            ScalarKind::Struct(r) => r.type_name.as_str(),
        };
        f.write_str(s)
    }
}

/// Reference to a nested struct: its fully qualified name and structural hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedRef {
    pub type_name: String,
    pub hash: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayKind {
    None,
    /// Exactly `n` elements, no length prefix.
    Fixed(u32),
    /// `u32` length prefix, then that many elements.
    Dynamic,
    /// At most `upper_bound` elements at runtime; encoded like a dynamic array.
    Compact { upper_bound: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    /// Unsigned literals above `i64::MAX`.
    UInt(u64),
    Float(f64),
    Bool(bool),
    String(String),
    /// Enum variant name.
    Ident(String),
}

impl Literal {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Literal::Int(i) => Some(*i),
            Literal::UInt(u) => (*u).try_into().ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Literal::Int(i) => (*i).try_into().ok(),
            Literal::UInt(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Float(x) => Some(*x),
            Literal::Int(i) => Some(*i as f64),
            Literal::UInt(u) => Some(*u as f64),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: ScalarKind,
    pub array: ArrayKind,
    /// Initializer from the schema (`u32 x = 5;`); used by the encoder for missing values.
    pub default: Option<Literal>,
    pub line: u32,
    pub column: u32,
}

impl FieldDescriptor {
    /// Maximum element count, only for compact arrays.
    pub fn array_upper_bound(&self) -> Option<u32> {
        match self.array {
            ArrayKind::Compact { upper_bound } => Some(upper_bound),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        self.array != ArrayKind::None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageDefinition {
    pub type_name: String,
    pub fields: Vec<FieldDescriptor>,
    pub hash_value: u64,
    pub line: u32,
    pub column: u32,
    /// Never preceded by a message header on the wire.
    pub naked: bool,
    /// On-wire layout is a packed record with no strings or variable-length arrays.
    pub simple: bool,
    /// This struct, or one nested in it, has a compact array.
    pub has_compact: bool,
    /// Packed payload size in bytes; set iff `simple`.
    pub fixed_size: Option<usize>,
}

impl MessageDefinition {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Last path segment of the type name (`Point` for `geo::Point`).
    pub fn short_name(&self) -> &str {
        self.type_name.rsplit("::").next().unwrap_or(&self.type_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDefinition {
    pub type_name: String,
    pub variants: Vec<(String, i32)>,
    pub line: u32,
    pub column: u32,
}

impl EnumDefinition {
    pub fn variant_name(&self, value: i32) -> Option<&str> {
        self.variants
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(n, _)| n.as_str())
    }

    pub fn variant_value(&self, name: &str) -> Option<i32> {
        self.variants.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }
}
