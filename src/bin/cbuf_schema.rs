//! Check CBuf schema files and list their definitions.
//!
//! Usage:
//!   cbuf_schema [OPTIONS] [FILE.cbuf ...]
//!   cbuf_schema < file.cbuf
//!
//! For each file, prints either the first error (`path:line:col: error: message`) or one
//! line per struct with its hash and flags.
//!
//! Options:
//!   --human, -H  Human-readable output (source excerpt for errors, fields for structs)

use cbuf::{parse_schema, to_hash_map, MessageDefinition, SchemaError};
use std::io::{self, Read};
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone, Copy)]
enum OutputStyle {
    Compact,
    Human,
}

fn flags(def: &MessageDefinition) -> String {
    let mut out = Vec::new();
    if def.naked {
        out.push("naked");
    }
    if def.simple {
        out.push("simple");
    }
    if def.has_compact {
        out.push("compact");
    }
    out.join(",")
}

fn print_error(path: &str, src: &str, e: &SchemaError, style: OutputStyle) {
    let (line, column) = e.position();
    match style {
        OutputStyle::Compact => println!("{}:{}:{}: error: {}", path, line, column, e),
        OutputStyle::Human => {
            println!("  {}:", path);
            for l in e.render(src).lines() {
                println!("    {}", l);
            }
        }
    }
}

fn print_definition(def: &MessageDefinition, style: OutputStyle) {
    match style {
        OutputStyle::Compact => {
            let size = def.fixed_size.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string());
            println!("{:#018x} {} size={} [{}]", def.hash_value, def.type_name, size, flags(def));
        }
        OutputStyle::Human => {
            println!("  struct {} ({}:{})", def.type_name, def.line, def.column);
            println!("    hash: {:#018x}", def.hash_value);
            if let Some(n) = def.fixed_size {
                println!("    size: {} bytes", n);
            }
            println!("    flags: {}", flags(def));
            for f in &def.fields {
                let dims = match f.array {
                    cbuf::ArrayKind::None => String::new(),
                    cbuf::ArrayKind::Fixed(n) => format!("[{}]", n),
                    cbuf::ArrayKind::Dynamic => "[]".to_string(),
                    cbuf::ArrayKind::Compact { upper_bound } => format!("[{}] @compact", upper_bound),
                };
                println!("    {} {}{}", f.kind, f.name, dims);
            }
        }
    }
}

/// Returns false when the schema has an error.
fn check(path: &str, src: &str, style: OutputStyle) -> bool {
    let schema = match parse_schema(src) {
        Ok(s) => s,
        Err(e) => {
            print_error(path, src, &e, style);
            return false;
        }
    };
    if let Err(e) = to_hash_map(&schema) {
        println!("{}: error: {}", path, e);
        return false;
    }
    for def in schema.values() {
        print_definition(def, style);
    }
    true
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let style = if let Some(pos) = args.iter().position(|a| a == "--human" || a == "-H") {
        args.remove(pos);
        OutputStyle::Human
    } else {
        OutputStyle::Compact
    };

    let mut errors = 0usize;
    if args.is_empty() {
        let mut src = String::new();
        io::stdin().read_to_string(&mut src)?;
        if !check("<stdin>", &src, style) {
            errors += 1;
        }
    } else {
        for path in &args {
            let path = Path::new(path);
            let src = match std::fs::read_to_string(path) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("{}: {}", path.display(), e);
                    errors += 1;
                    continue;
                }
            };
            if !check(&path.display().to_string(), &src, style) {
                errors += 1;
            }
        }
    }

    if errors > 0 {
        eprintln!("cbuf_schema: {} file(s) with errors", errors);
        std::process::exit(1);
    }
    Ok(())
}
