//! Parse CBuf schema text into resolved, hashed message definitions.
//!
//! Parsing runs in two passes. The first pass reads every declaration (namespaces,
//! structs, enums, constants) so that a struct may refer to types declared later in
//! the same text. The second pass resolves type references, rejects containment
//! cycles, and builds the definitions in dependency order so that `simple`,
//! `has_compact` and the structural hash are computed bottom-up.
//!
//! ```text
//! namespace geo {
//!   struct Point { f64 x; f64 y; }
//! }
//! const u32 MAX_PTS = 16;
//! struct Track @naked {
//!   geo::Point pts[MAX_PTS] @compact;
//!   string label = "none";
//! }
//! ```

use crate::ast::*;
use crate::diagnostic::render_location;
use crate::hash::hash_fields;
use crate::lexer::{Keyword, LexError, Lexer, Token, TokenKind};
use std::collections::HashMap;
use std::sync::Arc;

/// Longest chain of nested structs a schema may declare.
pub const MAX_NESTING_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("{line}:{column}: {message}")]
    Syntax { message: String, line: u32, column: u32 },
    #[error("{line}:{column}: duplicate definition of `{name}`")]
    Duplicate { name: String, line: u32, column: u32 },
    #[error("{line}:{column}: duplicate member `{member}` in `{owner}`")]
    DuplicateField {
        owner: String,
        member: String,
        line: u32,
        column: u32,
    },
    #[error("{line}:{column}: unknown type `{name}` used in `{owner}`")]
    UnresolvedType {
        name: String,
        owner: String,
        line: u32,
        column: u32,
    },
    #[error("{line}:{column}: recursive struct containment {}", .path.join(" -> "))]
    Cycle { path: Vec<String>, line: u32, column: u32 },
    #[error("{line}:{column}: array field `{field}`: {reason}")]
    InvalidArray {
        field: String,
        reason: String,
        line: u32,
        column: u32,
    },
    #[error("{line}:{column}: `{name}` nests structs more than {limit} levels deep")]
    TooDeep {
        name: String,
        limit: usize,
        line: u32,
        column: u32,
    },
    #[error("{line}:{column}: unknown attribute `@{name}`")]
    InvalidAttribute { name: String, line: u32, column: u32 },
    #[error("{line}:{column}: initializer of `{field}`: {reason}")]
    InvalidDefault {
        field: String,
        reason: String,
        line: u32,
        column: u32,
    },
}

impl SchemaError {
    /// 1-based source position the error points at.
    pub fn position(&self) -> (u32, u32) {
        match self {
            SchemaError::Lex(e) => e.position(),
            SchemaError::Syntax { line, column, .. }
            | SchemaError::Duplicate { line, column, .. }
            | SchemaError::DuplicateField { line, column, .. }
            | SchemaError::UnresolvedType { line, column, .. }
            | SchemaError::Cycle { line, column, .. }
            | SchemaError::InvalidArray { line, column, .. }
            | SchemaError::TooDeep { line, column, .. }
            | SchemaError::InvalidAttribute { line, column, .. }
            | SchemaError::InvalidDefault { line, column, .. } => (*line, *column),
        }
    }

    /// Error message followed by the offending source lines and a column marker.
    pub fn render(&self, source: &str) -> String {
        let (line, column) = self.position();
        format!("{}\n{}", self, render_location(source, line, column))
    }
}

/// Outcome of [`parse_schema_report`]: either an error string or the schema, never both.
#[derive(Debug, Clone, Default)]
pub struct ParseReport {
    pub error: Option<String>,
    pub schema: SchemaMap,
}

/// Parse flattened schema text (includes already expanded) into the name registry.
/// Any lex, grammar or resolution error aborts the whole parse.
pub fn parse_schema(source: &str) -> Result<SchemaMap, SchemaError> {
    let mut parser = Parser::new(source);
    parser.parse_items(None)?;
    let schema = parser.build_schema()?;
    tracing::debug!(
        structs = schema.len(),
        enums = parser.enum_count(),
        "parsed cbuf schema"
    );
    Ok(schema)
}

/// Like [`parse_schema`], but reports failure as a rendered message with an empty schema.
pub fn parse_schema_report(source: &str) -> ParseReport {
    match parse_schema(source) {
        Ok(schema) => ParseReport { error: None, schema },
        Err(e) => ParseReport {
            error: Some(e.render(source)),
            schema: SchemaMap::new(),
        },
    }
}

// ==================== Declarations (pass 1) ====================

#[derive(Debug)]
struct StructDecl {
    name: String,
    namespace: Option<String>,
    fields: Vec<FieldDecl>,
    naked: bool,
    line: u32,
    column: u32,
}

#[derive(Debug)]
struct FieldDecl {
    type_name: String,
    name: String,
    dims: DimsDecl,
    compact: bool,
    default: Option<Literal>,
    line: u32,
    column: u32,
}

#[derive(Debug)]
enum DimsDecl {
    None,
    Dynamic,
    Literal(i64),
    Const(String),
}

#[derive(Debug)]
struct ConstDecl {
    kind: ScalarKind,
    value: Literal,
}

#[derive(Debug, Clone)]
enum TypeEntry {
    Struct(usize),
    Enum(Arc<EnumDefinition>),
}

/// Field type after name resolution; struct references are still indices.
#[derive(Debug, Clone)]
enum FieldType {
    Builtin(ScalarKind),
    Struct(usize),
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    peeked: Option<Token<'a>>,
    last: (u32, u32),
    structs: Vec<StructDecl>,
    types: HashMap<String, TypeEntry>,
    consts: HashMap<String, ConstDecl>,
}

fn qualify(namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(ns) => format!("{}::{}", ns, name),
        None => name.to_string(),
    }
}

/// Bare names are looked up in the enclosing namespace first, then globally.
fn lookup<'m, T>(map: &'m HashMap<String, T>, namespace: Option<&str>, name: &str) -> Option<&'m T> {
    if !name.contains("::") {
        if let Some(ns) = namespace {
            if let Some(v) = map.get(&qualify(Some(ns), name)) {
                return Some(v);
            }
        }
    }
    map.get(name)
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Parser {
            lexer: Lexer::new(source),
            peeked: None,
            last: (1, 1),
            structs: Vec::new(),
            types: HashMap::new(),
            consts: HashMap::new(),
        }
    }

    fn enum_count(&self) -> usize {
        self.types
            .values()
            .filter(|t| matches!(t, TypeEntry::Enum(_)))
            .count()
    }

    fn peek(&mut self) -> Result<Option<Token<'a>>, SchemaError> {
        if self.peeked.is_none() {
            self.peeked = self.lexer.next().transpose()?;
        }
        Ok(self.peeked)
    }

    fn peek_kind(&mut self) -> Result<Option<TokenKind>, SchemaError> {
        Ok(self.peek()?.map(|t| t.kind))
    }

    fn next(&mut self) -> Result<Option<Token<'a>>, SchemaError> {
        let tok = match self.peeked.take() {
            Some(t) => Some(t),
            None => self.lexer.next().transpose()?,
        };
        if let Some(t) = tok {
            self.last = (t.line, t.column + t.text.chars().count() as u32);
        }
        Ok(tok)
    }

    fn eat(&mut self, kind: TokenKind) -> Result<bool, SchemaError> {
        if self.peek_kind()? == Some(kind) {
            self.next()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token<'a>, SchemaError> {
        match self.next()? {
            Some(t) if t.kind == kind => Ok(t),
            Some(t) => Err(unexpected(&t, what)),
            None => Err(self.eof(what)),
        }
    }

    fn eof(&self, what: &str) -> SchemaError {
        SchemaError::Syntax {
            message: format!("expected {}, found end of input", what),
            line: self.last.0,
            column: self.last.1,
        }
    }

    /// `ident ('::' ident)*`
    fn parse_path(&mut self, what: &str) -> Result<(String, Token<'a>), SchemaError> {
        let first = self.expect(TokenKind::Ident, what)?;
        let mut path = first.text.to_string();
        while self.eat(TokenKind::Scope)? {
            let seg = self.expect(TokenKind::Ident, "identifier after `::`")?;
            path.push_str("::");
            path.push_str(seg.text);
        }
        Ok((path, first))
    }

    fn parse_items(&mut self, namespace: Option<&str>) -> Result<(), SchemaError> {
        loop {
            let tok = match self.peek()? {
                Some(t) => t,
                None if namespace.is_none() => return Ok(()),
                None => return Err(self.eof("`}` closing namespace")),
            };
            match tok.kind {
                TokenKind::RBrace if namespace.is_some() => return Ok(()),
                TokenKind::Keyword(Keyword::Namespace) => {
                    if namespace.is_some() {
                        return Err(SchemaError::Syntax {
                            message: "namespaces cannot be nested".to_string(),
                            line: tok.line,
                            column: tok.column,
                        });
                    }
                    self.parse_namespace()?;
                }
                TokenKind::Keyword(Keyword::Struct) => self.parse_struct(namespace, false)?,
                TokenKind::Ident if tok.text == "naked" => {
                    self.next()?;
                    self.parse_struct(namespace, true)?;
                }
                TokenKind::Keyword(Keyword::Enum) => self.parse_enum(namespace)?,
                TokenKind::Keyword(Keyword::Const) => self.parse_const(namespace)?,
                TokenKind::Semicolon => {
                    self.next()?;
                }
                _ => return Err(unexpected(&tok, "`struct`, `enum`, `const` or `namespace`")),
            }
        }
    }

    fn parse_namespace(&mut self) -> Result<(), SchemaError> {
        self.expect(TokenKind::Keyword(Keyword::Namespace), "`namespace`")?;
        let name = self.expect(TokenKind::Ident, "namespace name")?;
        self.expect(TokenKind::LBrace, "`{`")?;
        self.parse_items(Some(name.text))?;
        self.expect(TokenKind::RBrace, "`}`")?;
        Ok(())
    }

    fn declare_type(&mut self, name: String, entry: TypeEntry, tok: &Token<'_>) -> Result<(), SchemaError> {
        if ScalarKind::from_keyword(tok.text).is_some() {
            return Err(SchemaError::Syntax {
                message: format!("`{}` is a builtin type name", tok.text),
                line: tok.line,
                column: tok.column,
            });
        }
        if self.types.contains_key(&name) {
            return Err(SchemaError::Duplicate {
                name,
                line: tok.line,
                column: tok.column,
            });
        }
        self.types.insert(name, entry);
        Ok(())
    }

    fn parse_struct(&mut self, namespace: Option<&str>, mut naked: bool) -> Result<(), SchemaError> {
        let kw = self.expect(TokenKind::Keyword(Keyword::Struct), "`struct`")?;
        let name_tok = self.expect(TokenKind::Ident, "struct name")?;
        let name = qualify(namespace, name_tok.text);
        while self.eat(TokenKind::At)? {
            let attr = self.expect(TokenKind::Ident, "attribute name")?;
            match attr.text {
                "naked" => naked = true,
                other => {
                    return Err(SchemaError::InvalidAttribute {
                        name: other.to_string(),
                        line: attr.line,
                        column: attr.column,
                    })
                }
            }
        }
        let index = self.structs.len();
        self.declare_type(name.clone(), TypeEntry::Struct(index), &name_tok)?;
        self.expect(TokenKind::LBrace, "`{`")?;
        let mut fields: Vec<FieldDecl> = Vec::new();
        while self.peek_kind()? != Some(TokenKind::RBrace) {
            let field = self.parse_field()?;
            if fields.iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateField {
                    owner: name,
                    member: field.name,
                    line: field.line,
                    column: field.column,
                });
            }
            fields.push(field);
        }
        self.expect(TokenKind::RBrace, "`}`")?;
        self.eat(TokenKind::Semicolon)?;
        self.structs.push(StructDecl {
            name,
            namespace: namespace.map(str::to_string),
            fields,
            naked,
            line: kw.line,
            column: kw.column,
        });
        Ok(())
    }

    fn parse_field(&mut self) -> Result<FieldDecl, SchemaError> {
        let (type_name, type_tok) = self.parse_path("field type or `}`")?;
        let name = self.expect(TokenKind::Ident, "field name")?;
        let mut dims = DimsDecl::None;
        if self.eat(TokenKind::LBracket)? {
            dims = match self.peek()? {
                Some(t) if t.kind == TokenKind::RBracket => DimsDecl::Dynamic,
                Some(t) if t.kind == TokenKind::Integer => {
                    self.next()?;
                    let n = parse_integer(&t)?;
                    DimsDecl::Literal(n.as_i64().unwrap_or(i64::MAX))
                }
                Some(t) if t.kind == TokenKind::Ident => DimsDecl::Const(self.parse_path("constant")?.0),
                Some(t) => return Err(unexpected(&t, "array length, constant or `]`")),
                None => return Err(self.eof("`]`")),
            };
            self.expect(TokenKind::RBracket, "`]`")?;
        }
        let mut compact = false;
        while self.eat(TokenKind::At)? {
            let attr = self.expect(TokenKind::Ident, "attribute name")?;
            match attr.text {
                "compact" => compact = true,
                other => {
                    return Err(SchemaError::InvalidAttribute {
                        name: other.to_string(),
                        line: attr.line,
                        column: attr.column,
                    })
                }
            }
        }
        let default = if self.eat(TokenKind::Equals)? {
            Some(self.parse_literal()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon, "`;`")?;
        Ok(FieldDecl {
            type_name,
            name: name.text.to_string(),
            dims,
            compact,
            default,
            line: type_tok.line,
            column: type_tok.column,
        })
    }

    fn parse_literal(&mut self) -> Result<Literal, SchemaError> {
        let tok = match self.next()? {
            Some(t) => t,
            None => return Err(self.eof("literal")),
        };
        match tok.kind {
            TokenKind::Integer => parse_integer(&tok),
            TokenKind::Float => tok.text.parse().map(Literal::Float).map_err(|_| SchemaError::Syntax {
                message: format!("invalid float literal `{}`", tok.text),
                line: tok.line,
                column: tok.column,
            }),
            TokenKind::Str => Ok(Literal::String(unescape(tok.text))),
            TokenKind::Ident => match tok.text {
                "true" => Ok(Literal::Bool(true)),
                "false" => Ok(Literal::Bool(false)),
                _ => {
                    let mut path = tok.text.to_string();
                    while self.eat(TokenKind::Scope)? {
                        let seg = self.expect(TokenKind::Ident, "identifier after `::`")?;
                        path.push_str("::");
                        path.push_str(seg.text);
                    }
                    Ok(Literal::Ident(path))
                }
            },
            _ => Err(unexpected(&tok, "literal")),
        }
    }

    fn parse_enum(&mut self, namespace: Option<&str>) -> Result<(), SchemaError> {
        let kw = self.expect(TokenKind::Keyword(Keyword::Enum), "`enum`")?;
        let name_tok = self.expect(TokenKind::Ident, "enum name")?;
        let name = qualify(namespace, name_tok.text);
        self.expect(TokenKind::LBrace, "`{`")?;
        let mut variants: Vec<(String, i32)> = Vec::new();
        let mut next_value: i64 = 0;
        while self.peek_kind()? != Some(TokenKind::RBrace) {
            let var = self.expect(TokenKind::Ident, "enum variant or `}`")?;
            if self.eat(TokenKind::Equals)? {
                let lit_tok = self.expect(TokenKind::Integer, "integer value")?;
                next_value = parse_integer(&lit_tok)?.as_i64().unwrap_or(i64::MAX);
            }
            let value = i32::try_from(next_value).map_err(|_| SchemaError::Syntax {
                message: format!("enum value of `{}` does not fit in 32 bits", var.text),
                line: var.line,
                column: var.column,
            })?;
            if variants.iter().any(|(n, _)| n == var.text) {
                return Err(SchemaError::DuplicateField {
                    owner: name,
                    member: var.text.to_string(),
                    line: var.line,
                    column: var.column,
                });
            }
            variants.push((var.text.to_string(), value));
            next_value += 1;
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "`}`")?;
        self.eat(TokenKind::Semicolon)?;
        let def = EnumDefinition {
            type_name: name.clone(),
            variants,
            line: kw.line,
            column: kw.column,
        };
        self.declare_type(name, TypeEntry::Enum(Arc::new(def)), &name_tok)
    }

    fn parse_const(&mut self, namespace: Option<&str>) -> Result<(), SchemaError> {
        self.expect(TokenKind::Keyword(Keyword::Const), "`const`")?;
        let type_tok = self.expect(TokenKind::Ident, "constant type")?;
        let kind = ScalarKind::from_keyword(type_tok.text).ok_or_else(|| SchemaError::Syntax {
            message: format!("constant type must be a builtin type, found `{}`", type_tok.text),
            line: type_tok.line,
            column: type_tok.column,
        })?;
        let name_tok = self.expect(TokenKind::Ident, "constant name")?;
        self.expect(TokenKind::Equals, "`=`")?;
        let value = self.parse_literal()?;
        self.expect(TokenKind::Semicolon, "`;`")?;
        check_literal(&kind, &value).map_err(|reason| SchemaError::InvalidDefault {
            field: name_tok.text.to_string(),
            reason,
            line: name_tok.line,
            column: name_tok.column,
        })?;
        let name = qualify(namespace, name_tok.text);
        if self.consts.contains_key(&name) {
            return Err(SchemaError::Duplicate {
                name,
                line: name_tok.line,
                column: name_tok.column,
            });
        }
        self.consts.insert(name, ConstDecl { kind, value });
        Ok(())
    }

    // ==================== Resolution (pass 2) ====================

    fn build_schema(&self) -> Result<SchemaMap, SchemaError> {
        let resolved = self
            .structs
            .iter()
            .map(|s| self.resolve_fields(s))
            .collect::<Result<Vec<_>, _>>()?;
        let order = dependency_order(&self.structs, &resolved)?;

        let mut built: Vec<Option<Arc<MessageDefinition>>> = vec![None; self.structs.len()];
        let mut extents = vec![Extent::default(); self.structs.len()];
        for i in order {
            let (def, extent) = build_definition(&self.structs[i], &resolved[i], &self.structs, &built, &extents)?;
            built[i] = Some(Arc::new(def));
            extents[i] = extent;
        }

        // `built` is indexed like `structs`, so this keeps declaration order.
        let mut schema = SchemaMap::with_capacity(self.structs.len());
        for def in built.into_iter().flatten() {
            schema.insert(def.type_name.clone(), def);
        }
        Ok(schema)
    }

    fn resolve_fields(&self, decl: &StructDecl) -> Result<Vec<(FieldType, ArrayKind)>, SchemaError> {
        let ns = decl.namespace.as_deref();
        let mut out = Vec::with_capacity(decl.fields.len());
        for f in &decl.fields {
            let ty = match ScalarKind::from_keyword(&f.type_name) {
                Some(k) => FieldType::Builtin(k),
                None => match lookup(&self.types, ns, &f.type_name) {
                    Some(TypeEntry::Struct(i)) => FieldType::Struct(*i),
                    Some(TypeEntry::Enum(e)) => FieldType::Builtin(ScalarKind::Enum(e.clone())),
                    None => {
                        return Err(SchemaError::UnresolvedType {
                            name: f.type_name.clone(),
                            owner: decl.name.clone(),
                            line: f.line,
                            column: f.column,
                        })
                    }
                },
            };
            let array = self.resolve_dims(decl, f)?;
            if let Some(default) = &f.default {
                let reason = match (&ty, array) {
                    (_, ArrayKind::Fixed(_) | ArrayKind::Dynamic | ArrayKind::Compact { .. }) => {
                        Some("array fields cannot have an initializer".to_string())
                    }
                    (FieldType::Struct(_), _) => Some("struct fields cannot have an initializer".to_string()),
                    (FieldType::Builtin(kind), ArrayKind::None) => check_literal(kind, default).err(),
                };
                if let Some(reason) = reason {
                    return Err(SchemaError::InvalidDefault {
                        field: f.name.clone(),
                        reason,
                        line: f.line,
                        column: f.column,
                    });
                }
            }
            out.push((ty, array));
        }
        Ok(out)
    }

    fn resolve_dims(&self, decl: &StructDecl, f: &FieldDecl) -> Result<ArrayKind, SchemaError> {
        let invalid = |reason: String| SchemaError::InvalidArray {
            field: f.name.clone(),
            reason,
            line: f.line,
            column: f.column,
        };
        let len = match &f.dims {
            DimsDecl::None | DimsDecl::Dynamic if f.compact => {
                return Err(invalid("`@compact` requires a fixed upper bound".to_string()))
            }
            DimsDecl::None => return Ok(ArrayKind::None),
            DimsDecl::Dynamic => return Ok(ArrayKind::Dynamic),
            DimsDecl::Literal(n) => *n,
            DimsDecl::Const(name) => {
                let c = lookup(&self.consts, decl.namespace.as_deref(), name)
                    .ok_or_else(|| invalid(format!("unknown constant `{}`", name)))?;
                if !c.kind.is_integer() {
                    return Err(invalid(format!("constant `{}` is not an integer", name)));
                }
                c.value.as_i64().unwrap_or(i64::MAX)
            }
        };
        let len = u32::try_from(len)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| invalid(format!("length {} is out of range", len)))?;
        Ok(if f.compact {
            ArrayKind::Compact { upper_bound: len }
        } else {
            ArrayKind::Fixed(len)
        })
    }
}

fn unexpected(tok: &Token<'_>, what: &str) -> SchemaError {
    SchemaError::Syntax {
        message: format!("expected {}, found `{}`", what, tok.text),
        line: tok.line,
        column: tok.column,
    }
}

fn parse_integer(tok: &Token<'_>) -> Result<Literal, SchemaError> {
    let (negative, digits) = match tok.text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, tok.text),
    };
    let magnitude = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else {
        digits.parse::<u64>()
    };
    let out_of_range = || SchemaError::Syntax {
        message: format!("integer literal `{}` out of range", tok.text),
        line: tok.line,
        column: tok.column,
    };
    let magnitude = magnitude.map_err(|_| out_of_range())?;
    if negative {
        let v = -(magnitude as i128);
        i64::try_from(v).map(Literal::Int).map_err(|_| out_of_range())
    } else if let Ok(v) = i64::try_from(magnitude) {
        Ok(Literal::Int(v))
    } else {
        Ok(Literal::UInt(magnitude))
    }
}

fn unescape(quoted: &str) -> String {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

/// Check that a literal can initialize a scalar of `kind`.
fn check_literal(kind: &ScalarKind, lit: &Literal) -> Result<(), String> {
    let ok = match kind {
        ScalarKind::Bool => matches!(lit, Literal::Bool(_)),
        ScalarKind::I8 => lit.as_i64().is_some_and(|v| i8::try_from(v).is_ok()),
        ScalarKind::I16 => lit.as_i64().is_some_and(|v| i16::try_from(v).is_ok()),
        ScalarKind::I32 => lit.as_i64().is_some_and(|v| i32::try_from(v).is_ok()),
        ScalarKind::I64 => lit.as_i64().is_some(),
        ScalarKind::U8 => lit.as_u64().is_some_and(|v| u8::try_from(v).is_ok()),
        ScalarKind::U16 => lit.as_u64().is_some_and(|v| u16::try_from(v).is_ok()),
        ScalarKind::U32 => lit.as_u64().is_some_and(|v| u32::try_from(v).is_ok()),
        ScalarKind::U64 => lit.as_u64().is_some(),
        ScalarKind::F32 | ScalarKind::F64 => lit.as_f64().is_some(),
        ScalarKind::String => matches!(lit, Literal::String(_)),
        ScalarKind::ShortString => matches!(lit, Literal::String(s) if s.len() < SHORT_STRING_LEN),
        ScalarKind::Enum(e) => match lit {
            Literal::Ident(name) => e.variant_value(name.rsplit("::").next().unwrap_or(name)).is_some(),
            other => other.as_i64().is_some_and(|v| i32::try_from(v).is_ok()),
        },
        ScalarKind::Struct(_) => false,
    };
    if ok {
        Ok(())
    } else {
        Err(format!("{:?} is not a valid `{}` value", lit, kind))
    }
}

/// Post-order over struct containment; any cycle is an error.
fn dependency_order(
    structs: &[StructDecl],
    resolved: &[Vec<(FieldType, ArrayKind)>],
) -> Result<Vec<usize>, SchemaError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    let mut marks = vec![Mark::New; structs.len()];
    let mut order = Vec::with_capacity(structs.len());
    // (struct index, next field to visit)
    let mut stack: Vec<(usize, usize)> = Vec::new();
    for root in 0..structs.len() {
        if marks[root] != Mark::New {
            continue;
        }
        marks[root] = Mark::Active;
        stack.push((root, 0));
        while let Some(top) = stack.last_mut() {
            let (i, next) = *top;
            let Some(field) = structs[i].fields.get(next) else {
                stack.pop();
                marks[i] = Mark::Done;
                order.push(i);
                continue;
            };
            top.1 += 1;
            let FieldType::Struct(dep) = &resolved[i][next].0 else { continue };
            let dep = *dep;
            match marks[dep] {
                Mark::Done => {}
                Mark::Active => {
                    let start = stack.iter().position(|&(s, _)| s == dep).unwrap_or(0);
                    let mut path: Vec<String> = stack[start..].iter().map(|&(s, _)| structs[s].name.clone()).collect();
                    path.push(structs[dep].name.clone());
                    return Err(SchemaError::Cycle {
                        path,
                        line: field.line,
                        column: field.column,
                    });
                }
                Mark::New => {
                    marks[dep] = Mark::Active;
                    stack.push((dep, 0));
                }
            }
        }
    }
    Ok(order)
}

/// Layout facts later definitions need about a struct already built.
#[derive(Debug, Clone, Copy, Default)]
struct Extent {
    /// Occupies no bytes on the wire.
    empty: bool,
    /// Structs on the longest containment chain starting here, itself included.
    depth: usize,
}

fn build_definition(
    decl: &StructDecl,
    resolved: &[(FieldType, ArrayKind)],
    structs: &[StructDecl],
    built: &[Option<Arc<MessageDefinition>>],
    extents: &[Extent],
) -> Result<(MessageDefinition, Extent), SchemaError> {
    let mut fields = Vec::with_capacity(decl.fields.len());
    let mut simple = true;
    let mut has_compact = false;
    let mut fixed_size = 0usize;
    let mut extent = Extent { empty: true, depth: 1 };

    for (f, (ty, array)) in decl.fields.iter().zip(resolved) {
        let invalid = |reason: String| SchemaError::InvalidArray {
            field: f.name.clone(),
            reason,
            line: f.line,
            column: f.column,
        };
        let (kind, elem_size, elem_empty) = match ty {
            FieldType::Builtin(k) => (k.clone(), k.fixed_width(), false),
            FieldType::Struct(j) => {
                let nested = built[*j].as_ref().ok_or_else(|| SchemaError::Cycle {
                    path: vec![decl.name.clone(), structs[*j].name.clone()],
                    line: f.line,
                    column: f.column,
                })?;
                has_compact |= nested.has_compact;
                extent.depth = extent.depth.max(extents[*j].depth + 1);
                let kind = ScalarKind::Struct(NestedRef {
                    type_name: nested.type_name.clone(),
                    hash: nested.hash_value,
                });
                (kind, nested.fixed_size, extents[*j].empty)
            }
        };
        if elem_empty && *array != ArrayKind::None {
            return Err(invalid(format!("element type `{}` has no wire size", kind)));
        }
        extent.empty &= elem_empty;
        let count = match array {
            ArrayKind::None => Some(1),
            ArrayKind::Fixed(n) => Some(*n as usize),
            ArrayKind::Dynamic => None,
            ArrayKind::Compact { .. } => {
                has_compact = true;
                None
            }
        };
        match (elem_size, count) {
            (Some(w), Some(n)) if simple => {
                fixed_size = w
                    .checked_mul(n)
                    .and_then(|bytes| fixed_size.checked_add(bytes))
                    .ok_or_else(|| invalid("layout size overflows".to_string()))?;
            }
            _ => simple = false,
        }
        fields.push(FieldDescriptor {
            name: f.name.clone(),
            kind,
            array: *array,
            default: f.default.clone(),
            line: f.line,
            column: f.column,
        });
    }
    if extent.depth > MAX_NESTING_DEPTH {
        return Err(SchemaError::TooDeep {
            name: decl.name.clone(),
            limit: MAX_NESTING_DEPTH,
            line: decl.line,
            column: decl.column,
        });
    }

    let hash_value = hash_fields(&fields);
    let def = MessageDefinition {
        type_name: decl.name.clone(),
        fields,
        hash_value,
        line: decl.line,
        column: decl.column,
        naked: decl.naked,
        simple,
        has_compact,
        fixed_size: simple.then_some(fixed_size),
    };
    Ok((def, extent))
}
