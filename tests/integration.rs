//! Integration tests: parse schema, build wire bytes by hand, decode, encode, and walk streams.

use byteorder::{LittleEndian, WriteBytesExt};
use cbuf::codec::{HEADER_SIZE, MAGIC};
use cbuf::frame::decode_stream;
use cbuf::{decode, parse_schema, to_hash_map, Codec, DecodeError, HashRegistry, SchemaMap, Value, ValueMap};
use std::io::Write;

const PATH_SCHEMA: &str = r#"
struct Point { float64 x; float64 y; }
struct Path { Point pts[]; }
"#;

const TELEMETRY: &str = r#"
namespace tm {
  enum Status { IDLE, BUSY = 3, FAULT }
  const u32 MAX_SAMPLES = 10;

  struct Sample @naked { u16 channel; f32 value; }

  struct Frame {
    u64 seq;
    s64 offset;
    Status status;
    short_string source;
    string note;
    Sample samples[MAX_SAMPLES] @compact;
    bool flags[3];
  }
}
"#;

fn setup(src: &str) -> (SchemaMap, HashRegistry) {
    let schema = parse_schema(src).expect("parse");
    let registry = to_hash_map(&schema).expect("registry");
    (schema, registry)
}

fn header(hash: u64, size: usize, timestamp: f64) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_u32::<LittleEndian>(MAGIC).unwrap();
    out.write_u32::<LittleEndian>(size as u32).unwrap();
    out.write_u64::<LittleEndian>(hash).unwrap();
    out.write_f64::<LittleEndian>(timestamp).unwrap();
    out
}

fn point(x: f64, y: f64) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_f64::<LittleEndian>(x).unwrap();
    out.write_f64::<LittleEndian>(y).unwrap();
    out
}

fn path_message(hash: u64, points: &[(f64, f64)], timestamp: f64) -> Vec<u8> {
    let size = HEADER_SIZE + 4 + 16 * points.len();
    let mut out = header(hash, size, timestamp);
    out.write_u32::<LittleEndian>(points.len() as u32).unwrap();
    for (x, y) in points {
        out.extend(point(*x, *y));
    }
    out
}

// ==================== End-to-end decode ====================

#[test]
fn test_point_path_end_to_end() {
    let (schema, registry) = setup(PATH_SCHEMA);
    assert!(schema["Point"].simple);
    assert!(!schema["Path"].simple);
    assert!(!schema["Path"].naked);

    let bytes = path_message(schema["Path"].hash_value, &[(1.0, 2.0), (-3.5, 4.25)], 1700000000.5);
    let msg = decode(&registry, &bytes, 0).expect("decode");
    assert_eq!(msg.type_name, "Path");
    assert_eq!(msg.hash_value, schema["Path"].hash_value);
    assert_eq!(msg.size, HEADER_SIZE + 4 + 32);
    assert_eq!(msg.timestamp, 1700000000.5);

    let pts = msg.message["pts"].as_list().expect("list");
    assert_eq!(pts.len(), 2);
    let p0 = pts[0].as_struct().expect("struct");
    assert_eq!(p0["x"], Value::F64(1.0));
    assert_eq!(p0["y"], Value::F64(2.0));
    let p1 = pts[1].as_struct().expect("struct");
    assert_eq!(p1["x"].as_f64(), Some(-3.5));
    assert_eq!(p1["y"].as_f64(), Some(4.25));
}

#[test]
fn test_decode_at_offset() {
    let (schema, registry) = setup(PATH_SCHEMA);
    let mut bytes = vec![0xAA; 7];
    bytes.extend(path_message(schema["Path"].hash_value, &[(0.5, 0.5)], 0.0));
    let msg = decode(&registry, &bytes, 7).expect("decode");
    assert_eq!(msg.size, HEADER_SIZE + 4 + 16);
    assert!(matches!(decode(&registry, &bytes, 0), Err(DecodeError::BadMagic { offset: 0, .. })));
}

#[test]
fn test_simple_top_level_message() {
    let (schema, registry) = setup(PATH_SCHEMA);
    let mut bytes = header(schema["Point"].hash_value, HEADER_SIZE + 16, 2.0);
    bytes.extend(point(9.0, -9.0));
    let msg = decode(&registry, &bytes, 0).expect("decode");
    assert_eq!(msg.type_name, "Point");
    assert_eq!(msg.message["x"], Value::F64(9.0));
    assert_eq!(msg.message["y"], Value::F64(-9.0));
}

#[test]
fn test_compact_array_yields_wire_length() {
    let (schema, registry) = setup("struct C { u32 vals[10] @compact; u8 tail; }");
    let def = &schema["C"];
    assert!(def.has_compact);
    let mut bytes = header(def.hash_value, HEADER_SIZE + 4 + 12 + 1, 0.0);
    bytes.write_u32::<LittleEndian>(3).unwrap();
    for v in [7u32, 8, 9] {
        bytes.write_u32::<LittleEndian>(v).unwrap();
    }
    bytes.push(0x5A);
    let msg = decode(&registry, &bytes, 0).expect("decode");
    assert_eq!(
        msg.message["vals"],
        Value::List(vec![Value::U32(7), Value::U32(8), Value::U32(9)])
    );
    assert_eq!(msg.message["tail"], Value::U8(0x5A));
}

#[test]
fn test_wide_integers_keep_width_and_sign() {
    let (schema, registry) = setup("struct W { u64 a; s64 b; s8 c; u16 d; }");
    let mut bytes = header(schema["W"].hash_value, HEADER_SIZE + 8 + 8 + 1 + 2, 0.0);
    bytes.write_u64::<LittleEndian>(u64::MAX).unwrap();
    bytes.write_i64::<LittleEndian>(i64::MIN).unwrap();
    bytes.write_i8(-5).unwrap();
    bytes.write_u16::<LittleEndian>(65535).unwrap();
    let msg = decode(&registry, &bytes, 0).expect("decode");
    assert_eq!(msg.message["a"], Value::U64(u64::MAX));
    assert_eq!(msg.message["b"], Value::I64(i64::MIN));
    assert_eq!(msg.message["c"], Value::I8(-5));
    assert_eq!(msg.message["d"], Value::U16(65535));
}

// ==================== Decode errors ====================

#[test]
fn test_unknown_hash() {
    let (_, registry) = setup(PATH_SCHEMA);
    let bytes = path_message(0x1234_5678, &[(1.0, 1.0)], 0.0);
    let err = decode(&registry, &bytes, 0).unwrap_err();
    assert_eq!(
        err,
        DecodeError::UnknownType {
            hash: 0x1234_5678,
            size: (HEADER_SIZE + 4 + 16) as u32
        }
    );
}

#[test]
fn test_truncated_buffers() {
    let (schema, registry) = setup(PATH_SCHEMA);
    let bytes = path_message(schema["Path"].hash_value, &[(1.0, 2.0), (3.0, 4.0)], 0.0);
    for cut in [0, 10, HEADER_SIZE, HEADER_SIZE + 3, bytes.len() - 1] {
        let err = decode(&registry, &bytes[..cut], 0).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { .. }), "cut {}: {:?}", cut, err);
    }

    // Header claims fewer elements' worth of bytes than the count prefix needs.
    let mut short = header(schema["Path"].hash_value, HEADER_SIZE + 4 + 16, 0.0);
    short.write_u32::<LittleEndian>(2).unwrap();
    short.extend(point(1.0, 2.0));
    let err = decode(&registry, &short, 0).unwrap_err();
    assert!(matches!(err, DecodeError::Truncated { .. }));
}

#[test]
fn test_truncated_string() {
    let (schema, registry) = setup("struct S { string s; }");
    let mut bytes = header(schema["S"].hash_value, HEADER_SIZE + 4 + 2, 0.0);
    bytes.write_u32::<LittleEndian>(100).unwrap();
    bytes.extend_from_slice(b"hi");
    assert!(matches!(decode(&registry, &bytes, 0), Err(DecodeError::Truncated { .. })));
}

#[test]
fn test_failed_decode_does_not_affect_next() {
    let (schema, registry) = setup(PATH_SCHEMA);
    let good = path_message(schema["Path"].hash_value, &[(5.0, 6.0)], 0.0);
    assert!(decode(&registry, &good[..good.len() - 2], 0).is_err());
    let msg = decode(&registry, &good, 0).expect("decode");
    assert_eq!(msg.message["pts"].as_list().map(|l| l.len()), Some(1));
}

#[test]
fn test_nested_definition_missing_from_registry() {
    let (schema, full) = setup(PATH_SCHEMA);
    let mut partial = SchemaMap::new();
    partial.insert("Path".to_string(), schema["Path"].clone());
    let registry = to_hash_map(&partial).expect("registry");
    let bytes = path_message(schema["Path"].hash_value, &[(1.0, 2.0)], 0.0);
    assert!(decode(&full, &bytes, 0).is_ok());
    assert_eq!(
        decode(&registry, &bytes, 0).unwrap_err(),
        DecodeError::InconsistentSchema {
            type_name: "Point".to_string()
        }
    );
}

// ==================== Hash properties ====================

#[test]
fn test_hash_is_stable_across_parses() {
    let a = parse_schema(PATH_SCHEMA).expect("parse");
    let b = parse_schema(PATH_SCHEMA).expect("parse");
    assert_eq!(a["Path"].hash_value, b["Path"].hash_value);

    let renamed = parse_schema("struct P2 { double a; double b; } struct Track { P2 points[]; }").expect("parse");
    assert_eq!(a["Path"].hash_value, renamed["Track"].hash_value);

    // Messages written with one naming decode with the other.
    let registry = to_hash_map(&renamed).expect("registry");
    let bytes = path_message(a["Path"].hash_value, &[(1.0, 2.0)], 0.0);
    let msg = decode(&registry, &bytes, 0).expect("decode");
    assert_eq!(msg.type_name, "Track");
    assert!(msg.message.contains_key("points"));
}

#[test]
fn test_structural_aliases_share_registry_entry() {
    let (schema, registry) = setup("struct A { f64 x; f64 y; } struct B { f64 u; f64 v; } struct C { u8 z; }");
    assert_eq!(schema["A"].hash_value, schema["B"].hash_value);
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.get(schema["B"].hash_value).unwrap().type_name, "A");
}

// ==================== Encode ====================

#[test]
fn test_encode_decode_roundtrip() {
    let (schema, registry) = setup(TELEMETRY);
    let def = &schema["tm::Frame"];
    assert!(def.has_compact);
    assert!(schema["tm::Sample"].naked);
    let codec = Codec::new(registry);

    let sample = |channel: u16, value: f32| {
        let mut m = ValueMap::new();
        m.insert("channel".into(), Value::U16(channel));
        m.insert("value".into(), Value::F32(value));
        Value::Struct(m)
    };
    let mut values = ValueMap::new();
    values.insert("seq".into(), Value::U64(u64::MAX - 1));
    values.insert("offset".into(), Value::I64(-42));
    values.insert("status".into(), Value::String("BUSY".into()));
    values.insert("source".into(), Value::String("probe-7".into()));
    values.insert("note".into(), Value::String("héllo".into()));
    values.insert("samples".into(), Value::List(vec![sample(1, 0.5), sample(2, -1.25)]));
    values.insert("flags".into(), Value::List(vec![Value::Bool(true), Value::Bool(false), Value::Bool(true)]));

    let bytes = codec.encode_message(def, &values, 99.0).expect("encode");
    let expected_size = HEADER_SIZE + 8 + 8 + 4 + 16 + (4 + "héllo".len()) + (4 + 2 * 6) + 3;
    assert_eq!(bytes.len(), expected_size);

    let msg = codec.decode_message(&bytes, 0).expect("decode");
    assert_eq!(msg.type_name, "tm::Frame");
    assert_eq!(msg.size, expected_size);
    assert_eq!(msg.timestamp, 99.0);
    assert_eq!(msg.message["seq"], Value::U64(u64::MAX - 1));
    assert_eq!(msg.message["offset"], Value::I64(-42));
    assert_eq!(msg.message["status"], Value::I32(3));
    assert_eq!(msg.message["source"], Value::String("probe-7".into()));
    assert_eq!(msg.message["note"], Value::String("héllo".into()));
    assert_eq!(msg.message["samples"], Value::List(vec![sample(1, 0.5), sample(2, -1.25)]));
    assert_eq!(msg.message["flags"], values["flags"]);
    let keys: Vec<&str> = msg.message.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["seq", "offset", "status", "source", "note", "samples", "flags"]);
}

#[test]
fn test_encode_matches_hand_built_bytes() {
    let (schema, registry) = setup(PATH_SCHEMA);
    let codec = Codec::new(registry);
    let pt = |x: f64, y: f64| {
        let mut m = ValueMap::new();
        m.insert("x".into(), Value::F64(x));
        m.insert("y".into(), Value::F64(y));
        Value::Struct(m)
    };
    let mut values = ValueMap::new();
    values.insert("pts".into(), Value::List(vec![pt(1.0, 2.0), pt(3.0, 4.0)]));
    let encoded = codec.encode_message(&schema["Path"], &values, 5.5).expect("encode");
    let hand = path_message(schema["Path"].hash_value, &[(1.0, 2.0), (3.0, 4.0)], 5.5);
    assert_eq!(encoded, hand);
}

#[test]
fn test_naked_roundtrip() {
    let (schema, registry) = setup(TELEMETRY);
    let codec = Codec::new(registry);
    let def = &schema["tm::Sample"];
    let mut values = ValueMap::new();
    values.insert("channel".into(), Value::U16(12));
    values.insert("value".into(), Value::F32(3.5));
    let bytes = codec.encode_naked(def, &values).expect("encode");
    assert_eq!(bytes.len(), 6);
    let (decoded, used) = codec.decode_naked(def, &bytes, 0).expect("decode");
    assert_eq!(used, 6);
    assert_eq!(decoded, values);
}

// ==================== Streams ====================

#[test]
fn test_stream_skips_unknown_message() {
    let (schema, registry) = setup(PATH_SCHEMA);
    let codec = Codec::new(registry);
    let hash = schema["Path"].hash_value;
    let mut bytes = path_message(hash, &[(1.0, 1.0)], 1.0);
    let unknown_at = bytes.len();
    bytes.extend(path_message(0xFEED, &[(2.0, 2.0), (3.0, 3.0)], 2.0));
    bytes.extend(path_message(hash, &[], 3.0));

    let result = decode_stream(&codec, &bytes);
    assert_eq!(result.messages.len(), 2);
    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].byte_range.0, unknown_at);
    assert_eq!(result.skipped[0].hash, 0xFEED);
    assert!(result.stopped.is_none());
    assert_eq!(result.consumed, bytes.len());
    assert_eq!(result.messages[1].message.timestamp, 3.0);
    assert_eq!(result.messages[1].message.message["pts"], Value::List(vec![]));
}

// ==================== Files and threads ====================

#[test]
fn test_schema_and_data_files() {
    let mut schema_file = tempfile::NamedTempFile::new().expect("tempfile");
    schema_file.write_all(PATH_SCHEMA.as_bytes()).unwrap();
    let text = std::fs::read_to_string(schema_file.path()).unwrap();
    let (schema, registry) = setup(&text);

    let dir = tempfile::tempdir().expect("tempdir");
    let data_path = dir.path().join("paths.bin");
    let mut data = path_message(schema["Path"].hash_value, &[(1.0, 2.0)], 0.0);
    data.extend(path_message(schema["Path"].hash_value, &[(3.0, 4.0)], 1.0));
    std::fs::write(&data_path, &data).unwrap();

    let read_back = std::fs::read(&data_path).unwrap();
    let result = decode_stream(&Codec::new(registry), &read_back);
    assert_eq!(result.messages.len(), 2);
    assert!(result.skipped.is_empty());
}

#[test]
fn test_registry_shared_across_threads() {
    let (schema, registry) = setup(PATH_SCHEMA);
    let hash = schema["Path"].hash_value;
    std::thread::scope(|s| {
        for i in 0..4 {
            let registry = &registry;
            s.spawn(move || {
                let bytes = path_message(hash, &[(i as f64, 0.0)], i as f64);
                let msg = decode(registry, &bytes, 0).expect("decode");
                assert_eq!(msg.timestamp, i as f64);
            });
        }
    });
}
