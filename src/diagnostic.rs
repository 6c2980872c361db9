//! Source excerpts for schema errors.

const MARKER: &str = "----------------";

/// Up to two lines before `line`, the line itself, then a marker pointing at `column`.
/// Every output line is prefixed with `>>>>`. Positions are 1-based; a position past
/// the end of the text yields an empty string.
///
/// ```text
/// >>>>struct A {
/// >>>>  f64 x$;
/// >>>>       ^----------------
/// ```
pub fn render_location(source: &str, line: u32, column: u32) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let line = line as usize;
    if line == 0 || line > lines.len() {
        return String::new();
    }
    let mut out = String::new();
    for l in &lines[line.saturating_sub(3)..line] {
        out.push_str(">>>>");
        out.push_str(l);
        out.push('\n');
    }
    let column = column.max(1) as usize;
    if column <= MARKER.len() {
        out.push_str(&format!(">>>>{}^{}\n", " ".repeat(column - 1), MARKER));
    } else {
        out.push_str(&format!(">>>>{}{}^\n", " ".repeat(column - MARKER.len() - 1), MARKER));
    }
    out
}
