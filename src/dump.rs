//! Format decoded messages for display. Uses the registry for field order and enum names.

use crate::ast::ScalarKind;
use crate::codec::DecodedMessage;
use crate::registry::HashRegistry;
use crate::value::Value;

/// Raw scalar string. Strings are quoted.
pub fn format_scalar_raw(v: &Value) -> String {
    match v {
        Value::U8(x) => format!("{}", x),
        Value::U16(x) => format!("{}", x),
        Value::U32(x) => format!("{}", x),
        Value::U64(x) => format!("{}", x),
        Value::I8(x) => format!("{}", x),
        Value::I16(x) => format!("{}", x),
        Value::I32(x) => format!("{}", x),
        Value::I64(x) => format!("{}", x),
        Value::Bool(x) => format!("{}", x),
        Value::F32(x) => format!("{}", x),
        Value::F64(x) => format!("{}", x),
        Value::String(s) => format!("{:?}", s),
        _ => format!("{:?}", v),
    }
}

/// Scalar string, with enum values shown as their variant name when one matches.
fn format_scalar(kind: Option<&ScalarKind>, v: &Value) -> String {
    if let (Some(ScalarKind::Enum(e)), Some(n)) = (kind, v.as_i64()) {
        if let Some(name) = i32::try_from(n).ok().and_then(|n| e.variant_name(n)) {
            return name.to_string();
        }
    }
    format_scalar_raw(v)
}

fn field_line(registry: &HashRegistry, pad: &str, name: &str, kind: Option<&ScalarKind>, v: &Value, indent: usize) -> String {
    let sub = value_to_dump(registry, kind, v, indent);
    format!("{}{}: {}", pad, name, sub.trim_start())
}

/// Format a value for display; multi-line for structs and non-empty lists. `kind` is the
/// field's element kind when known.
pub fn value_to_dump(registry: &HashRegistry, kind: Option<&ScalarKind>, v: &Value, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    match v {
        Value::Struct(m) => {
            let inner = "  ".repeat(indent + 1);
            let def = kind.and_then(ScalarKind::nested).and_then(|n| registry.get(n.hash));
            let mut lines: Vec<String> = vec![format!("{}struct {{", pad)];
            match def {
                Some(def) => {
                    for f in &def.fields {
                        if let Some(val) = m.get(&f.name) {
                            lines.push(field_line(registry, &inner, &f.name, Some(&f.kind), val, indent + 1));
                        }
                    }
                }
                None => {
                    for (k, val) in m {
                        lines.push(field_line(registry, &inner, k, None, val, indent + 1));
                    }
                }
            }
            lines.push(format!("{}}}", pad));
            lines.join("\n")
        }
        Value::List(lst) if lst.is_empty() => format!("{}[]", pad),
        Value::List(lst) => {
            let mut lines: Vec<String> = vec![format!("{}[", pad)];
            for (i, item) in lst.iter().enumerate() {
                let sub = value_to_dump(registry, kind, item, indent + 1);
                lines.push(format!("{}  [{}] {}", pad, i, sub.trim_start()));
            }
            lines.push(format!("{}]", pad));
            lines.join("\n")
        }
        scalar => format!("{}{}", pad, format_scalar(kind, scalar)),
    }
}

/// Multi-line dump of a decoded message: a summary line, then one line (or block) per field.
pub fn message_to_dump(registry: &HashRegistry, msg: &DecodedMessage) -> String {
    let mut lines = vec![format!(
        "{} (hash {:#018x}, {} bytes, timestamp {})",
        msg.type_name, msg.hash_value, msg.size, msg.timestamp
    )];
    match registry.get(msg.hash_value) {
        Some(def) => {
            for f in &def.fields {
                if let Some(v) = msg.message.get(&f.name) {
                    lines.push(field_line(registry, "  ", &f.name, Some(&f.kind), v, 1));
                }
            }
        }
        None => {
            for (k, v) in &msg.message {
                lines.push(field_line(registry, "  ", k, None, v, 1));
            }
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Codec;
    use crate::parser::parse_schema;
    use crate::registry::to_hash_map;
    use crate::value::ValueMap;

    const SCHEMA: &str = r#"
enum Color { RED, GREEN, BLUE }
struct Point { f64 x; f64 y; }
struct Shape {
  Color color;
  string label;
  Point corners[];
  u8 empty[];
}
"#;

    #[test]
    fn dump_uses_field_order_and_enum_names() {
        let schema = parse_schema(SCHEMA).expect("parse");
        let codec = Codec::new(to_hash_map(&schema).expect("registry"));
        let mut p = ValueMap::new();
        p.insert("y".into(), Value::F64(2.0));
        p.insert("x".into(), Value::F64(1.5));
        let mut v = ValueMap::new();
        v.insert("label".into(), Value::String("tri".into()));
        v.insert("corners".into(), Value::List(vec![Value::Struct(p)]));
        v.insert("color".into(), Value::I32(2));
        let bytes = codec.encode_message(&schema["Shape"], &v, 3.0).unwrap();
        let msg = codec.decode_message(&bytes, 0).unwrap();

        let text = message_to_dump(codec.registry(), &msg);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("Shape (hash 0x"));
        assert_eq!(lines[1], "  color: BLUE");
        assert_eq!(lines[2], "  label: \"tri\"");
        assert_eq!(lines[3], "  corners: [");
        assert_eq!(lines[4], "    [0] struct {");
        assert_eq!(lines[5], "      x: 1.5");
        assert_eq!(lines[6], "      y: 2");
        assert_eq!(lines[7], "    }");
        assert_eq!(lines[8], "  ]");
        assert_eq!(lines[9], "  empty: []");
    }

    #[test]
    fn unknown_enum_value_prints_number() {
        let schema = parse_schema(SCHEMA).expect("parse");
        let kind = schema["Shape"].fields[0].kind.clone();
        let reg = to_hash_map(&schema).expect("registry");
        assert_eq!(value_to_dump(&reg, Some(&kind), &Value::I32(9), 0), "9");
        assert_eq!(value_to_dump(&reg, Some(&kind), &Value::I32(0), 0), "RED");
    }
}
