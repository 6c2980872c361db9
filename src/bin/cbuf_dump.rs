//! Decode a file of CBuf messages against a schema and print them.
//!
//! Usage:
//!   cbuf_dump [OPTIONS] SCHEMA.cbuf DATA.bin
//!
//! Options:
//!   --offset=N     Start decoding at byte N of DATA
//!   --dump=PATH    Write the dump to PATH instead of stdout
//!   --verbose, -v  Also print each message's bytes in hex
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use anyhow::Context;
use cbuf::dump::message_to_dump;
use cbuf::frame::decode_stream;
use cbuf::{parse_schema, to_hash_map, Codec};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn write_hex_with_offset(w: &mut dyn Write, bytes: &[u8], base: usize) -> std::io::Result<()> {
    const COLS: usize = 16;
    for (i, chunk) in bytes.chunks(COLS).enumerate() {
        let hex_line = chunk.iter().map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(" ");
        writeln!(w, "  offset {:6}: {}", base + i * COLS, hex_line)?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut raw_args: Vec<String> = std::env::args().skip(1).collect();
    let verbose = if let Some(pos) = raw_args.iter().position(|a| a == "--verbose" || a == "-v") {
        raw_args.remove(pos);
        true
    } else {
        false
    };
    let dump_path: Option<PathBuf> = raw_args
        .iter()
        .position(|a| a.starts_with("--dump="))
        .and_then(|pos| raw_args.remove(pos).strip_prefix("--dump=").map(PathBuf::from));
    let start: usize = match raw_args.iter().position(|a| a.starts_with("--offset=")) {
        Some(pos) => {
            let arg = raw_args.remove(pos);
            let n = arg.trim_start_matches("--offset=");
            n.parse().with_context(|| format!("invalid offset `{}`", n))?
        }
        None => 0,
    };
    let mut args = raw_args.into_iter();
    let (Some(schema_path), Some(data_path)) = (args.next().map(PathBuf::from), args.next().map(PathBuf::from)) else {
        anyhow::bail!("usage: cbuf_dump [--offset=N] [--dump=PATH] [--verbose] SCHEMA DATA");
    };

    let src = std::fs::read_to_string(&schema_path)
        .with_context(|| format!("reading schema {}", schema_path.display()))?;
    let schema = parse_schema(&src)
        .map_err(|e| anyhow::anyhow!("{}: {}", schema_path.display(), e.render(&src)))?;
    let registry = to_hash_map(&schema)?;
    tracing::info!(
        schema = %schema_path.display(),
        definitions = schema.len(),
        "loaded schema"
    );

    let data = std::fs::read(&data_path).with_context(|| format!("reading data {}", data_path.display()))?;
    if start > data.len() {
        anyhow::bail!("offset {} is past the end of {} ({} bytes)", start, data_path.display(), data.len());
    }
    let codec = Codec::new(registry);
    let result = decode_stream(&codec, &data[start..]);

    let mut out: Box<dyn Write> = match &dump_path {
        Some(p) => Box::new(File::create(p).with_context(|| format!("creating {}", p.display()))?),
        None => Box::new(std::io::stdout().lock()),
    };
    for framed in &result.messages {
        let (from, to) = framed.byte_range;
        writeln!(out, "@{} {}", start + from, message_to_dump(codec.registry(), &framed.message))?;
        if verbose {
            write_hex_with_offset(&mut out, &data[start + from..start + to], start + from)?;
        }
    }
    for skipped in &result.skipped {
        let (from, to) = skipped.byte_range;
        tracing::warn!(
            offset = start + from,
            size = to - from,
            hash = %format_args!("{:#018x}", skipped.hash),
            error = %skipped.error,
            "skipped message"
        );
    }
    if let Some(e) = &result.stopped {
        tracing::warn!(offset = start + result.consumed, error = %e, "stopped before end of data");
    }
    out.flush()?;
    tracing::info!(
        decoded = result.messages.len(),
        skipped = result.skipped.len(),
        bytes = result.consumed,
        "done"
    );
    Ok(())
}
