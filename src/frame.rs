//! Stream handling: decode a buffer holding back-to-back messages.
//!
//! A message that has a valid header but cannot be decoded (unknown hash, payload
//! error) is skipped using the size declared in its header, and the walk continues
//! with the next message. A bad magic word or a header that runs past the end of
//! the buffer leaves no way to find the next boundary, so the walk stops there.

use crate::codec::{Codec, DecodeError, DecodedMessage, MessageHeader, HEADER_SIZE};

/// Result of walking a stream: decoded messages, skipped messages, and why the walk
/// ended early (if it did).
#[derive(Debug, Default)]
pub struct StreamDecodeResult {
    pub messages: Vec<FramedMessage>,
    pub skipped: Vec<SkippedMessage>,
    /// Bytes walked, decoded or skipped.
    pub consumed: usize,
    /// Set when the walk stopped before the end of the buffer.
    pub stopped: Option<DecodeError>,
}

#[derive(Debug)]
pub struct FramedMessage {
    pub byte_range: (usize, usize),
    pub message: DecodedMessage,
}

#[derive(Debug)]
pub struct SkippedMessage {
    pub byte_range: (usize, usize),
    pub hash: u64,
    pub error: DecodeError,
}

/// Read the header at `offset` without decoding the payload.
pub fn read_header(bytes: &[u8], offset: usize) -> Result<MessageHeader, DecodeError> {
    MessageHeader::read(bytes, offset)
}

/// Decode every message in `bytes`, starting at offset 0.
pub fn decode_stream(codec: &Codec, bytes: &[u8]) -> StreamDecodeResult {
    let mut result = StreamDecodeResult::default();
    let mut offset = 0;

    while offset < bytes.len() {
        let header = match read_header(bytes, offset) {
            Ok(h) => h,
            Err(e) => {
                result.stopped = Some(e);
                break;
            }
        };
        let size = header.size as usize;
        if size < HEADER_SIZE {
            result.stopped = Some(DecodeError::SizeMismatch {
                declared: header.size,
                actual: HEADER_SIZE,
            });
            break;
        }
        let end = offset + size;
        if end > bytes.len() {
            result.stopped = Some(DecodeError::Truncated { offset: bytes.len() });
            break;
        }
        match codec.decode_message(bytes, offset) {
            Ok(message) => result.messages.push(FramedMessage {
                byte_range: (offset, end),
                message,
            }),
            Err(error) => {
                tracing::debug!(offset, size, %error, "skipping undecodable cbuf message");
                result.skipped.push(SkippedMessage {
                    byte_range: (offset, end),
                    hash: header.hash,
                    error,
                });
            }
        }
        offset = end;
    }

    result.consumed = offset;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_schema;
    use crate::registry::to_hash_map;
    use crate::value::{Value, ValueMap};
    use byteorder::{ByteOrder, LittleEndian};

    fn setup() -> (Codec, Vec<u8>, Vec<u8>) {
        let schema = parse_schema("struct A { u32 a; } struct B { string s; }").expect("parse");
        let codec = Codec::new(to_hash_map(&schema).expect("registry"));
        let mut va = ValueMap::new();
        va.insert("a".into(), Value::U32(1));
        let a = codec.encode_message(&schema["A"], &va, 1.0).unwrap();
        let mut vb = ValueMap::new();
        vb.insert("s".into(), Value::String("xyz".into()));
        let b = codec.encode_message(&schema["B"], &vb, 2.0).unwrap();
        (codec, a, b)
    }

    #[test]
    fn decodes_back_to_back() {
        let (codec, a, b) = setup();
        let bytes = [a.clone(), b.clone(), a.clone()].concat();
        let res = decode_stream(&codec, &bytes);
        assert_eq!(res.messages.len(), 3);
        assert!(res.skipped.is_empty());
        assert!(res.stopped.is_none());
        assert_eq!(res.consumed, bytes.len());
        assert_eq!(res.messages[1].message.type_name, "B");
        assert_eq!(res.messages[1].byte_range, (a.len(), a.len() + b.len()));
    }

    #[test]
    fn skips_unknown_hash_by_declared_size() {
        let (codec, a, b) = setup();
        let mut unknown = b.clone();
        LittleEndian::write_u64(&mut unknown[8..16], 0xDEAD_BEEF);
        let bytes = [a.clone(), unknown, a.clone()].concat();
        let res = decode_stream(&codec, &bytes);
        assert_eq!(res.messages.len(), 2);
        assert_eq!(res.skipped.len(), 1);
        assert_eq!(res.skipped[0].hash, 0xDEAD_BEEF);
        assert!(matches!(res.skipped[0].error, DecodeError::UnknownType { .. }));
        assert_eq!(res.skipped[0].byte_range, (a.len(), a.len() + b.len()));
    }

    #[test]
    fn stops_on_bad_magic_and_short_tail() {
        let (codec, a, _) = setup();
        let mut bytes = a.clone();
        bytes.extend_from_slice(&[0u8; HEADER_SIZE]);
        let res = decode_stream(&codec, &bytes);
        assert_eq!(res.messages.len(), 1);
        assert!(matches!(res.stopped, Some(DecodeError::BadMagic { .. })));
        assert_eq!(res.consumed, a.len());

        let mut bytes = a.clone();
        bytes.extend_from_slice(&a[..a.len() - 1]);
        let res = decode_stream(&codec, &bytes);
        assert_eq!(res.messages.len(), 1);
        assert!(matches!(res.stopped, Some(DecodeError::Truncated { .. })));
    }

    #[test]
    fn read_header_only() {
        let (_, a, _) = setup();
        let h = read_header(&a, 0).unwrap();
        assert_eq!(h.size as usize, a.len());
        assert_eq!(h.timestamp, 1.0);
    }
}
