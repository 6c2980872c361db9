//! Decoder fuzz target: arbitrary bytes against a fixed schema covering every field kind.
//! Decoding must not panic or allocate beyond the input size.
//! Build with: cargo fuzz run decode_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
const SCHEMA: &str = r#"
enum Kind { A, B, C }
struct Point { f64 x; f64 y; }
struct Any {
  bool b; s8 i8v; u16 u16v; s64 i64v;
  Kind kind;
  short_string tag;
  string text;
  Point fixed[2];
  Point dynamic[];
  u32 bounded[4] @compact;
}
"#;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let schema = cbuf::parse_schema(SCHEMA).expect("schema");
    let codec = cbuf::Codec::new(cbuf::to_hash_map(&schema).expect("registry"));
    let _ = codec.decode_message(data, 0);
    let _ = codec.decode_naked(&schema["Any"], data, 0);
    let _ = cbuf::frame::decode_stream(&codec, data);
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run decode_fuzz");
}
