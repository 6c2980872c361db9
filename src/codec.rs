//! Encode/decode CBuf messages from parsed definitions.
//!
//! A message on the wire is a 24-byte header followed by the payload of its
//! definition. Payload fields are packed in declared order, little-endian, with no
//! padding. Strings and dynamic/compact arrays carry a `u32` length prefix; nested
//! structs are inlined without a header.

use crate::ast::*;
use crate::registry::HashRegistry;
use crate::value::{Value, ValueMap};
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read};

/// Bytes in a message header.
pub const HEADER_SIZE: usize = 24;
/// First header word of every message.
pub const MAGIC: u32 = 0x5644_4E54;
/// Largest message size the 27-bit size field can carry.
pub const MAX_MESSAGE_SIZE: u32 = (1 << 27) - 1;

const SIZE_MASK: u32 = MAX_MESSAGE_SIZE;
const VARIANT_SHIFT: u32 = 27;

/// Message preamble.
///
/// | offset | width | field |
/// |--------|-------|-------|
/// | 0  | 4 | magic |
/// | 4  | 4 | total size (low 27 bits), variant (high 5 bits) |
/// | 8  | 8 | structural hash |
/// | 16 | 8 | timestamp, `f64` seconds |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MessageHeader {
    /// Header plus payload bytes.
    pub size: u32,
    pub variant: u8,
    pub hash: u64,
    pub timestamp: f64,
}

impl MessageHeader {
    /// Read a header at `offset`; fails on short input or a wrong magic word.
    pub fn read(bytes: &[u8], offset: usize) -> Result<Self, DecodeError> {
        let end = offset
            .checked_add(HEADER_SIZE)
            .filter(|end| *end <= bytes.len())
            .ok_or(DecodeError::Truncated {
                offset: bytes.len().max(offset),
            })?;
        let h = &bytes[offset..end];
        let magic = LittleEndian::read_u32(&h[0..4]);
        if magic != MAGIC {
            return Err(DecodeError::BadMagic { found: magic, offset });
        }
        let word = LittleEndian::read_u32(&h[4..8]);
        Ok(MessageHeader {
            size: word & SIZE_MASK,
            variant: (word >> VARIANT_SHIFT) as u8,
            hash: LittleEndian::read_u64(&h[8..16]),
            timestamp: LittleEndian::read_f64(&h[16..24]),
        })
    }

    pub fn write(&self, w: &mut Vec<u8>) -> Result<(), EncodeError> {
        if self.size > MAX_MESSAGE_SIZE {
            return Err(EncodeError::TooLarge { size: self.size as usize });
        }
        w.write_u32::<LittleEndian>(MAGIC)?;
        w.write_u32::<LittleEndian>(self.size | (u32::from(self.variant & 0x1f) << VARIANT_SHIFT))?;
        w.write_u64::<LittleEndian>(self.hash)?;
        w.write_f64::<LittleEndian>(self.timestamp)?;
        Ok(())
    }
}

/// One decoded top-level message. Owns its values; holds no reference into the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    pub type_name: String,
    pub hash_value: u64,
    /// Header plus payload bytes consumed.
    pub size: usize,
    pub variant: u8,
    pub timestamp: f64,
    pub message: ValueMap,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("buffer truncated at byte {offset}")]
    Truncated { offset: usize },
    #[error("unknown message hash {hash:#018x} ({size} bytes)")]
    UnknownType { hash: u64, size: u32 },
    #[error("`{type_name}` refers to a definition missing from the registry")]
    InconsistentSchema { type_name: String },
    #[error("bad magic {found:#010x} at byte {offset}")]
    BadMagic { found: u32, offset: usize },
    #[error("compact array `{field}` holds {count} elements, bound is {bound}")]
    BoundExceeded { field: String, count: u32, bound: u32 },
    #[error("header declares {declared} bytes, payload layout needs {actual}")]
    SizeMismatch { declared: u32, actual: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("field `{field}`: expected {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: &'static str,
    },
    #[error("field `{field}`: {len} elements, at most {max} allowed")]
    TooManyElements { field: String, len: usize, max: u32 },
    #[error("field `{field}`: string of {len} bytes does not fit")]
    StringTooLong { field: String, len: usize },
    #[error("message of {size} bytes exceeds the size field")]
    TooLarge { size: usize },
    #[error("`{type_name}` refers to a definition missing from the registry")]
    InconsistentSchema { type_name: String },
}

/// Decode the message whose header starts at `offset`.
pub fn decode(registry: &HashRegistry, bytes: &[u8], offset: usize) -> Result<DecodedMessage, DecodeError> {
    let header = MessageHeader::read(bytes, offset)?;
    let def = registry.get(header.hash).ok_or(DecodeError::UnknownType {
        hash: header.hash,
        size: header.size,
    })?;
    let declared = header.size as usize;
    if declared < HEADER_SIZE {
        return Err(DecodeError::SizeMismatch {
            declared: header.size,
            actual: HEADER_SIZE,
        });
    }
    let end = offset
        .checked_add(declared)
        .filter(|end| *end <= bytes.len())
        .ok_or(DecodeError::Truncated { offset: bytes.len() })?;

    let mut r = Cursor::new(&bytes[..end]);
    r.set_position((offset + HEADER_SIZE) as u64);
    let message = decode_struct(registry, &mut r, def)?;
    let consumed = r.position() as usize - offset;
    if consumed != declared {
        return Err(DecodeError::SizeMismatch {
            declared: header.size,
            actual: consumed,
        });
    }
    tracing::trace!(
        type_name = %def.type_name,
        offset,
        size = consumed,
        simple = def.simple,
        "decoded cbuf message"
    );
    Ok(DecodedMessage {
        type_name: def.type_name.clone(),
        hash_value: header.hash,
        size: consumed,
        variant: header.variant,
        timestamp: header.timestamp,
        message,
    })
}

/// Decoder/encoder bound to one hash registry. Cheap to clone and safe to share.
#[derive(Debug, Clone, Default)]
pub struct Codec {
    registry: HashRegistry,
}

impl Codec {
    pub fn new(registry: HashRegistry) -> Self {
        Codec { registry }
    }

    pub fn registry(&self) -> &HashRegistry {
        &self.registry
    }

    /// Decode the message whose header starts at `offset`; see [`decode`].
    pub fn decode_message(&self, bytes: &[u8], offset: usize) -> Result<DecodedMessage, DecodeError> {
        decode(&self.registry, bytes, offset)
    }

    /// Decode a header-less payload of `def` at `offset`. Returns the values and the
    /// number of bytes consumed.
    pub fn decode_naked(
        &self,
        def: &MessageDefinition,
        bytes: &[u8],
        offset: usize,
    ) -> Result<(ValueMap, usize), DecodeError> {
        if offset > bytes.len() {
            return Err(DecodeError::Truncated { offset: bytes.len() });
        }
        let mut r = Cursor::new(bytes);
        r.set_position(offset as u64);
        let values = decode_struct(&self.registry, &mut r, def)?;
        Ok((values, r.position() as usize - offset))
    }

    /// Encode `values` as a full message (header and payload). Missing fields take
    /// their schema initializer, or zero.
    pub fn encode_message(
        &self,
        def: &MessageDefinition,
        values: &ValueMap,
        timestamp: f64,
    ) -> Result<Vec<u8>, EncodeError> {
        let mut payload = Vec::new();
        self.encode_fields(&mut payload, def, values)?;
        let size = HEADER_SIZE + payload.len();
        if size > MAX_MESSAGE_SIZE as usize {
            return Err(EncodeError::TooLarge { size });
        }
        let mut out = Vec::with_capacity(size);
        MessageHeader {
            size: size as u32,
            variant: 0,
            hash: def.hash_value,
            timestamp,
        }
        .write(&mut out)?;
        out.extend_from_slice(&payload);
        Ok(out)
    }

    /// Encode only the payload of `def`, as it appears when nested.
    pub fn encode_naked(&self, def: &MessageDefinition, values: &ValueMap) -> Result<Vec<u8>, EncodeError> {
        let mut out = Vec::new();
        self.encode_fields(&mut out, def, values)?;
        Ok(out)
    }

    fn encode_fields(&self, w: &mut Vec<u8>, def: &MessageDefinition, values: &ValueMap) -> Result<(), EncodeError> {
        for f in &def.fields {
            match values.get(&f.name) {
                Some(v) => self.encode_field(w, f, v)?,
                None => self.encode_field(w, f, &default_value(f))?,
            }
        }
        Ok(())
    }

    fn encode_field(&self, w: &mut Vec<u8>, f: &FieldDescriptor, v: &Value) -> Result<(), EncodeError> {
        let max = match f.array {
            ArrayKind::None => return self.encode_scalar(w, f, &f.kind, v),
            ArrayKind::Fixed(n) | ArrayKind::Compact { upper_bound: n } => Some(n),
            ArrayKind::Dynamic => None,
        };
        let items = v.as_list().ok_or_else(|| mismatch(f, "list", v))?;
        if let Some(max) = max {
            if items.len() > max as usize {
                return Err(EncodeError::TooManyElements {
                    field: f.name.clone(),
                    len: items.len(),
                    max,
                });
            }
        }
        if let ArrayKind::Fixed(n) = f.array {
            for item in items {
                self.encode_scalar(w, f, &f.kind, item)?;
            }
            let zero = zero_value(&f.kind);
            for _ in items.len()..n as usize {
                self.encode_scalar(w, f, &f.kind, &zero)?;
            }
            return Ok(());
        }
        let count = u32::try_from(items.len()).map_err(|_| EncodeError::TooLarge { size: items.len() })?;
        w.write_u32::<LittleEndian>(count)?;
        for item in items {
            self.encode_scalar(w, f, &f.kind, item)?;
        }
        Ok(())
    }

    fn encode_scalar(&self, w: &mut Vec<u8>, f: &FieldDescriptor, kind: &ScalarKind, v: &Value) -> Result<(), EncodeError> {
        match kind {
            ScalarKind::Bool => w.write_u8(v.as_bool().ok_or_else(|| mismatch(f, "bool", v))? as u8)?,
            ScalarKind::I8 => w.write_i8(int_value(f, kind, v)?)?,
            ScalarKind::I16 => w.write_i16::<LittleEndian>(int_value(f, kind, v)?)?,
            ScalarKind::I32 => w.write_i32::<LittleEndian>(int_value(f, kind, v)?)?,
            ScalarKind::I64 => w.write_i64::<LittleEndian>(int_value(f, kind, v)?)?,
            ScalarKind::U8 => w.write_u8(int_value(f, kind, v)?)?,
            ScalarKind::U16 => w.write_u16::<LittleEndian>(int_value(f, kind, v)?)?,
            ScalarKind::U32 => w.write_u32::<LittleEndian>(int_value(f, kind, v)?)?,
            ScalarKind::U64 => w.write_u64::<LittleEndian>(int_value(f, kind, v)?)?,
            ScalarKind::F32 => w.write_f32::<LittleEndian>(float_value(f, v)? as f32)?,
            ScalarKind::F64 => w.write_f64::<LittleEndian>(float_value(f, v)?)?,
            ScalarKind::String => {
                let s = v.as_str().ok_or_else(|| mismatch(f, "string", v))?;
                let len = u32::try_from(s.len()).map_err(|_| EncodeError::StringTooLong {
                    field: f.name.clone(),
                    len: s.len(),
                })?;
                w.write_u32::<LittleEndian>(len)?;
                w.extend_from_slice(s.as_bytes());
            }
            ScalarKind::ShortString => {
                let s = v.as_str().ok_or_else(|| mismatch(f, "short_string", v))?;
                if s.len() >= SHORT_STRING_LEN {
                    return Err(EncodeError::StringTooLong {
                        field: f.name.clone(),
                        len: s.len(),
                    });
                }
                let mut buf = [0u8; SHORT_STRING_LEN];
                buf[..s.len()].copy_from_slice(s.as_bytes());
                w.extend_from_slice(&buf);
            }
            ScalarKind::Enum(e) => {
                let value = match v {
                    Value::String(name) => e.variant_value(name).ok_or_else(|| mismatch(f, &e.type_name, v))?,
                    _ => int_value(f, kind, v)?,
                };
                w.write_i32::<LittleEndian>(value)?;
            }
            ScalarKind::Struct(nested) => {
                let def = self.registry.get(nested.hash).ok_or_else(|| EncodeError::InconsistentSchema {
                    type_name: nested.type_name.clone(),
                })?;
                let map = v.as_struct().ok_or_else(|| mismatch(f, &nested.type_name, v))?;
                self.encode_fields(w, def, map)?;
            }
        }
        Ok(())
    }
}

// ==================== Decoding ====================

fn decode_struct(
    registry: &HashRegistry,
    r: &mut Cursor<&[u8]>,
    def: &MessageDefinition,
) -> Result<ValueMap, DecodeError> {
    match def.fixed_size {
        Some(size) if def.simple => {
            let start = r.position() as usize;
            let buf = *r.get_ref();
            if remaining(r) < size {
                return Err(DecodeError::Truncated { offset: buf.len() });
            }
            let mut off = 0;
            let values = decode_packed(registry, &buf[start..start + size], &mut off, def)?;
            r.set_position((start + size) as u64);
            Ok(values)
        }
        _ => decode_fieldwise(registry, r, def),
    }
}

fn decode_fieldwise(
    registry: &HashRegistry,
    r: &mut Cursor<&[u8]>,
    def: &MessageDefinition,
) -> Result<ValueMap, DecodeError> {
    let mut out = ValueMap::with_capacity(def.fields.len());
    for f in &def.fields {
        let v = match f.array {
            ArrayKind::None => decode_scalar(registry, r, &f.kind)?,
            ArrayKind::Fixed(n) => decode_list(registry, r, &f.kind, n)?,
            ArrayKind::Dynamic => {
                let count = read_u32(r)?;
                decode_list(registry, r, &f.kind, count)?
            }
            ArrayKind::Compact { upper_bound } => {
                let count = read_u32(r)?;
                if count > upper_bound {
                    return Err(DecodeError::BoundExceeded {
                        field: f.name.clone(),
                        count,
                        bound: upper_bound,
                    });
                }
                decode_list(registry, r, &f.kind, count)?
            }
        };
        out.insert(f.name.clone(), v);
    }
    Ok(out)
}

fn decode_list(
    registry: &HashRegistry,
    r: &mut Cursor<&[u8]>,
    kind: &ScalarKind,
    count: u32,
) -> Result<Value, DecodeError> {
    // Parsed schemas have no zero-width element types, so each element needs a byte.
    if count as usize > remaining(r) {
        return Err(DecodeError::Truncated { offset: r.get_ref().len() });
    }
    let mut items = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let before = r.position();
        items.push(decode_scalar(registry, r, kind)?);
        if r.position() == before {
            return Err(DecodeError::InconsistentSchema {
                type_name: kind.to_string(),
            });
        }
    }
    Ok(Value::List(items))
}

fn decode_scalar(registry: &HashRegistry, r: &mut Cursor<&[u8]>, kind: &ScalarKind) -> Result<Value, DecodeError> {
    let at = r.position() as usize;
    let eof = |_| DecodeError::Truncated { offset: at };
    let v = match kind {
        ScalarKind::Bool => Value::Bool(r.read_u8().map_err(eof)? != 0),
        ScalarKind::I8 => Value::I8(r.read_i8().map_err(eof)?),
        ScalarKind::I16 => Value::I16(r.read_i16::<LittleEndian>().map_err(eof)?),
        ScalarKind::I32 | ScalarKind::Enum(_) => Value::I32(r.read_i32::<LittleEndian>().map_err(eof)?),
        ScalarKind::I64 => Value::I64(r.read_i64::<LittleEndian>().map_err(eof)?),
        ScalarKind::U8 => Value::U8(r.read_u8().map_err(eof)?),
        ScalarKind::U16 => Value::U16(r.read_u16::<LittleEndian>().map_err(eof)?),
        ScalarKind::U32 => Value::U32(r.read_u32::<LittleEndian>().map_err(eof)?),
        ScalarKind::U64 => Value::U64(r.read_u64::<LittleEndian>().map_err(eof)?),
        ScalarKind::F32 => Value::F32(r.read_f32::<LittleEndian>().map_err(eof)?),
        ScalarKind::F64 => Value::F64(r.read_f64::<LittleEndian>().map_err(eof)?),
        ScalarKind::String => {
            let len = read_u32(r)? as usize;
            if remaining(r) < len {
                return Err(DecodeError::Truncated {
                    offset: r.get_ref().len(),
                });
            }
            let mut buf = vec![0u8; len];
            r.read_exact(&mut buf).map_err(eof)?;
            Value::String(String::from_utf8_lossy(&buf).into_owned())
        }
        ScalarKind::ShortString => {
            let mut buf = [0u8; SHORT_STRING_LEN];
            r.read_exact(&mut buf).map_err(eof)?;
            Value::String(short_string(&buf))
        }
        ScalarKind::Struct(nested) => {
            let def = lookup_nested(registry, nested)?;
            Value::Struct(decode_struct(registry, r, def)?)
        }
    };
    Ok(v)
}

/// Read a simple struct from a slice already known to hold `def.fixed_size` bytes.
fn decode_packed(
    registry: &HashRegistry,
    buf: &[u8],
    off: &mut usize,
    def: &MessageDefinition,
) -> Result<ValueMap, DecodeError> {
    let mut out = ValueMap::with_capacity(def.fields.len());
    for f in &def.fields {
        let v = match f.array {
            ArrayKind::Fixed(n) => {
                let mut items = Vec::with_capacity((n as usize).min(buf.len().saturating_sub(*off)));
                for _ in 0..n {
                    let before = *off;
                    items.push(packed_scalar(registry, buf, off, &f.kind)?);
                    if *off == before {
                        return Err(DecodeError::InconsistentSchema {
                            type_name: f.kind.to_string(),
                        });
                    }
                }
                Value::List(items)
            }
            _ => packed_scalar(registry, buf, off, &f.kind)?,
        };
        out.insert(f.name.clone(), v);
    }
    Ok(out)
}

fn packed_scalar(
    registry: &HashRegistry,
    buf: &[u8],
    off: &mut usize,
    kind: &ScalarKind,
) -> Result<Value, DecodeError> {
    if let ScalarKind::Struct(nested) = kind {
        let def = lookup_nested(registry, nested)?;
        return decode_packed(registry, buf, off, def).map(Value::Struct);
    }
    let at = *off;
    let Some(width) = kind.fixed_width() else {
        return Err(DecodeError::InconsistentSchema {
            type_name: kind.to_string(),
        });
    };
    let b = buf.get(at..at + width).ok_or(DecodeError::Truncated { offset: at + width })?;
    *off += width;
    let v = match kind {
        ScalarKind::Bool => Value::Bool(b[0] != 0),
        ScalarKind::I8 => Value::I8(b[0] as i8),
        ScalarKind::U8 => Value::U8(b[0]),
        ScalarKind::I16 => Value::I16(LittleEndian::read_i16(b)),
        ScalarKind::U16 => Value::U16(LittleEndian::read_u16(b)),
        ScalarKind::I32 | ScalarKind::Enum(_) => Value::I32(LittleEndian::read_i32(b)),
        ScalarKind::U32 => Value::U32(LittleEndian::read_u32(b)),
        ScalarKind::I64 => Value::I64(LittleEndian::read_i64(b)),
        ScalarKind::U64 => Value::U64(LittleEndian::read_u64(b)),
        ScalarKind::F32 => Value::F32(LittleEndian::read_f32(b)),
        ScalarKind::F64 => Value::F64(LittleEndian::read_f64(b)),
        ScalarKind::ShortString => Value::String(short_string(b)),
        ScalarKind::String | ScalarKind::Struct(_) => {
            return Err(DecodeError::InconsistentSchema {
                type_name: kind.to_string(),
            })
        }
    };
    Ok(v)
}

fn lookup_nested<'r>(registry: &'r HashRegistry, nested: &NestedRef) -> Result<&'r MessageDefinition, DecodeError> {
    registry
        .get(nested.hash)
        .map(|d| d.as_ref())
        .ok_or_else(|| DecodeError::InconsistentSchema {
            type_name: nested.type_name.clone(),
        })
}

fn read_u32(r: &mut Cursor<&[u8]>) -> Result<u32, DecodeError> {
    let at = r.position() as usize;
    r.read_u32::<LittleEndian>()
        .map_err(|_| DecodeError::Truncated { offset: at })
}

fn remaining(r: &Cursor<&[u8]>) -> usize {
    r.get_ref().len().saturating_sub(r.position() as usize)
}

fn short_string(buf: &[u8]) -> String {
    let end = buf.iter().position(|b| *b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

// ==================== Encoding helpers ====================

fn mismatch(f: &FieldDescriptor, expected: &str, found: &Value) -> EncodeError {
    EncodeError::TypeMismatch {
        field: f.name.clone(),
        expected: expected.to_string(),
        found: found.type_label(),
    }
}

fn int_value<T>(f: &FieldDescriptor, kind: &ScalarKind, v: &Value) -> Result<T, EncodeError>
where
    T: TryFrom<i64> + TryFrom<u64>,
{
    let converted = match v {
        Value::U64(x) => <T as TryFrom<u64>>::try_from(*x).ok(),
        other => other.as_i64().and_then(|x| <T as TryFrom<i64>>::try_from(x).ok()),
    };
    converted.ok_or_else(|| mismatch(f, &kind.to_string(), v))
}

fn float_value(f: &FieldDescriptor, v: &Value) -> Result<f64, EncodeError> {
    v.as_f64()
        .or_else(|| v.as_i64().map(|x| x as f64))
        .ok_or_else(|| mismatch(f, "float", v))
}

/// Zero of a scalar kind; structs become an empty map so nested fields take their own defaults.
pub fn zero_value(kind: &ScalarKind) -> Value {
    match kind {
        ScalarKind::Bool => Value::Bool(false),
        ScalarKind::I8 => Value::I8(0),
        ScalarKind::I16 => Value::I16(0),
        ScalarKind::I32 | ScalarKind::Enum(_) => Value::I32(0),
        ScalarKind::I64 => Value::I64(0),
        ScalarKind::U8 => Value::U8(0),
        ScalarKind::U16 => Value::U16(0),
        ScalarKind::U32 => Value::U32(0),
        ScalarKind::U64 => Value::U64(0),
        ScalarKind::F32 => Value::F32(0.0),
        ScalarKind::F64 => Value::F64(0.0),
        ScalarKind::String | ScalarKind::ShortString => Value::String(String::new()),
        ScalarKind::Struct(_) => Value::Struct(ValueMap::new()),
    }
}

/// Value used by the encoder when a field is absent: its initializer, else zero.
pub fn default_value(f: &FieldDescriptor) -> Value {
    match f.array {
        ArrayKind::None => {}
        _ => return Value::List(Vec::new()),
    }
    let Some(lit) = &f.default else {
        return zero_value(&f.kind);
    };
    let converted = match (&f.kind, lit) {
        (ScalarKind::Bool, Literal::Bool(b)) => Some(Value::Bool(*b)),
        (ScalarKind::I8, _) => lit.as_i64().and_then(|x| i8::try_from(x).ok()).map(Value::I8),
        (ScalarKind::I16, _) => lit.as_i64().and_then(|x| i16::try_from(x).ok()).map(Value::I16),
        (ScalarKind::I32, _) => lit.as_i64().and_then(|x| i32::try_from(x).ok()).map(Value::I32),
        (ScalarKind::I64, _) => lit.as_i64().map(Value::I64),
        (ScalarKind::U8, _) => lit.as_u64().and_then(|x| u8::try_from(x).ok()).map(Value::U8),
        (ScalarKind::U16, _) => lit.as_u64().and_then(|x| u16::try_from(x).ok()).map(Value::U16),
        (ScalarKind::U32, _) => lit.as_u64().and_then(|x| u32::try_from(x).ok()).map(Value::U32),
        (ScalarKind::U64, _) => lit.as_u64().map(Value::U64),
        (ScalarKind::F32, _) => lit.as_f64().map(|x| Value::F32(x as f32)),
        (ScalarKind::F64, _) => lit.as_f64().map(Value::F64),
        (ScalarKind::String | ScalarKind::ShortString, Literal::String(s)) => Some(Value::String(s.clone())),
        (ScalarKind::Enum(e), Literal::Ident(name)) => e
            .variant_value(name.rsplit("::").next().unwrap_or(name))
            .map(Value::I32),
        (ScalarKind::Enum(_), _) => lit.as_i64().and_then(|x| i32::try_from(x).ok()).map(Value::I32),
        _ => None,
    };
    converted.unwrap_or_else(|| zero_value(&f.kind))
}
