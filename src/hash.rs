//! Structural hash of a message definition.
//!
//! The hash is `xxh3_64` over a canonical little-endian encoding of the field layout:
//!
//! ```text
//! u32 field_count
//! per field:
//!   u8  scalar tag
//!   u8  array tag
//!   u32 fixed length / compact bound (0 otherwise)
//!   u64 nested hash                        (struct fields)
//!   u32 variant count, i32 value per variant (enum fields)
//! ```
//!
//! Names, comments, source positions, defaults and the `naked` flag do not take part,
//! so structurally identical types hash identically. Because nested structs contribute
//! their own hash, dependencies must be hashed before their dependents.

use crate::ast::{ArrayKind, FieldDescriptor, MessageDefinition, ScalarKind};
use byteorder::{LittleEndian, WriteBytesExt};
use xxhash_rust::xxh3::xxh3_64;

fn scalar_tag(kind: &ScalarKind) -> u8 {
    match kind {
        ScalarKind::Bool => 1,
        ScalarKind::I8 => 2,
        ScalarKind::I16 => 3,
        ScalarKind::I32 => 4,
        ScalarKind::I64 => 5,
        ScalarKind::U8 => 6,
        ScalarKind::U16 => 7,
        ScalarKind::U32 => 8,
        ScalarKind::U64 => 9,
        ScalarKind::F32 => 10,
        ScalarKind::F64 => 11,
        ScalarKind::String => 12,
        ScalarKind::ShortString => 13,
        ScalarKind::Enum(_) => 14,
        ScalarKind::Struct(_) => 15,
    }
}

fn array_tag(array: ArrayKind) -> (u8, u32) {
    match array {
        ArrayKind::None => (0, 0),
        ArrayKind::Fixed(n) => (1, n),
        ArrayKind::Dynamic => (2, 0),
        ArrayKind::Compact { upper_bound } => (3, upper_bound),
    }
}

/// Canonical byte encoding of a field list (the hash input).
pub fn canonical_layout(fields: &[FieldDescriptor]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + fields.len() * 16);
    // Writes into a Vec<u8> cannot fail.
    let _ = write_layout(&mut out, fields);
    out
}

fn write_layout(out: &mut Vec<u8>, fields: &[FieldDescriptor]) -> std::io::Result<()> {
    out.write_u32::<LittleEndian>(fields.len() as u32)?;
    for f in fields {
        out.write_u8(scalar_tag(&f.kind))?;
        let (tag, len) = array_tag(f.array);
        out.write_u8(tag)?;
        out.write_u32::<LittleEndian>(len)?;
        match &f.kind {
            ScalarKind::Struct(nested) => out.write_u64::<LittleEndian>(nested.hash)?,
            ScalarKind::Enum(e) => {
                out.write_u32::<LittleEndian>(e.variants.len() as u32)?;
                for (_, v) in &e.variants {
                    out.write_i32::<LittleEndian>(*v)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Hash a field list whose nested references already carry their hashes.
pub fn hash_fields(fields: &[FieldDescriptor]) -> u64 {
    xxh3_64(&canonical_layout(fields))
}

/// Recompute the structural hash of a definition. Equal to `def.hash_value` for
/// every definition produced by the parser.
pub fn structural_hash(def: &MessageDefinition) -> u64 {
    hash_fields(&def.fields)
}
