//! Parser fuzz target: feed arbitrary text to the schema parser.
//! The parser must not panic; it returns the schema or a positioned error.
//! Build with: cargo fuzz run parser_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let s = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };
    if let Ok(schema) = cbuf::parse_schema(s) {
        let _ = cbuf::to_hash_map(&schema);
    } else {
        let _ = cbuf::parse_schema_report(s);
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run parser_fuzz");
}
