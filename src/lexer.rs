//! Tokenize CBuf schema text.
//!
//! The token set is described by a PEST grammar (`cbuf.pest`); [`Lexer`] walks the
//! resulting pairs lazily and turns them into [`Token`]s with 1-based line/column.
//! Comments and whitespace never reach the parser.

use pest::iterators::Pairs;
use pest::Parser;
use pest_derive::Parser as PestParser;
use std::fmt;

#[derive(PestParser)]
#[grammar = "cbuf.pest"]
struct TokenGrammar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Struct,
    Namespace,
    Enum,
    Const,
}

impl Keyword {
    fn from_ident(s: &str) -> Option<Self> {
        match s {
            "struct" => Some(Keyword::Struct),
            "namespace" => Some(Keyword::Namespace),
            "enum" => Some(Keyword::Enum),
            "const" => Some(Keyword::Const),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Keyword(Keyword),
    Integer,
    Float,
    Str,
    /// `::`
    Scope,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Equals,
    At,
    Comma,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Ident => "identifier",
            TokenKind::Keyword(Keyword::Struct) => "`struct`",
            TokenKind::Keyword(Keyword::Namespace) => "`namespace`",
            TokenKind::Keyword(Keyword::Enum) => "`enum`",
            TokenKind::Keyword(Keyword::Const) => "`const`",
            TokenKind::Integer => "integer literal",
            TokenKind::Float => "float literal",
            TokenKind::Str => "string literal",
            TokenKind::Scope => "`::`",
            TokenKind::LBrace => "`{`",
            TokenKind::RBrace => "`}`",
            TokenKind::LBracket => "`[`",
            TokenKind::RBracket => "`]`",
            TokenKind::Semicolon => "`;`",
            TokenKind::Equals => "`=`",
            TokenKind::At => "`@`",
            TokenKind::Comma => "`,`",
        };
        f.write_str(s)
    }
}

/// One token: kind, the exact source text, and where it starts (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    #[error("unterminated block comment starting at {line}:{column}")]
    UnterminatedComment { line: u32, column: u32 },
    #[error("unterminated string literal starting at {line}:{column}")]
    UnterminatedString { line: u32, column: u32 },
    #[error("invalid character {ch:?} at {line}:{column}")]
    InvalidCharacter { ch: char, line: u32, column: u32 },
}

impl LexError {
    pub fn position(&self) -> (u32, u32) {
        match *self {
            LexError::UnterminatedComment { line, column }
            | LexError::UnterminatedString { line, column }
            | LexError::InvalidCharacter { line, column, .. } => (line, column),
        }
    }
}

/// Lazy token stream over schema text. Create a new `Lexer` to start over from
/// the beginning; after the first error the stream ends.
#[derive(Clone)]
pub struct Lexer<'a> {
    pairs: Option<Pairs<'a, Rule>>,
    failed: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        // The grammar ends with a catch-all `invalid` token, so matching cannot fail.
        let pairs = TokenGrammar::parse(Rule::tokens, source).ok();
        Lexer { pairs, failed: false }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let pair = self.pairs.as_mut()?.next()?;
        let (line, column) = pair.as_span().start_pos().line_col();
        let (line, column) = (line as u32, column as u32);
        let text = pair.as_str();
        let kind = match pair.as_rule() {
            Rule::EOI => return None,
            Rule::ident => match Keyword::from_ident(text) {
                Some(k) => TokenKind::Keyword(k),
                None => TokenKind::Ident,
            },
            Rule::integer => TokenKind::Integer,
            Rule::float => TokenKind::Float,
            Rule::string => TokenKind::Str,
            Rule::scope => TokenKind::Scope,
            Rule::lbrace => TokenKind::LBrace,
            Rule::rbrace => TokenKind::RBrace,
            Rule::lbracket => TokenKind::LBracket,
            Rule::rbracket => TokenKind::RBracket,
            Rule::semicolon => TokenKind::Semicolon,
            Rule::equals => TokenKind::Equals,
            Rule::at => TokenKind::At,
            Rule::comma => TokenKind::Comma,
            Rule::unterminated_comment => {
                self.failed = true;
                return Some(Err(LexError::UnterminatedComment { line, column }));
            }
            Rule::unterminated_string => {
                self.failed = true;
                return Some(Err(LexError::UnterminatedString { line, column }));
            }
            _ => {
                self.failed = true;
                let ch = text.chars().next().unwrap_or('\0');
                return Some(Err(LexError::InvalidCharacter { ch, line, column }));
            }
        };
        Some(Ok(Token {
            kind,
            text,
            line,
            column,
        }))
    }
}

/// Collect every token, stopping at the first error.
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, LexError> {
    Lexer::new(source).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).expect("lex").into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lex_struct_header() {
        assert_eq!(
            kinds("struct Point {"),
            vec![TokenKind::Keyword(Keyword::Struct), TokenKind::Ident, TokenKind::LBrace]
        );
    }

    #[test]
    fn lex_field_with_dims_and_attribute() {
        let toks = tokenize("u8 data[16] @compact;").expect("lex");
        let texts: Vec<_> = toks.iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["u8", "data", "[", "16", "]", "@", "compact", ";"]);
        assert_eq!(toks[3].kind, TokenKind::Integer);
    }

    #[test]
    fn lex_comments_are_dropped() {
        let src = "// header\nstruct /* inline */ A { } // trailing";
        assert_eq!(
            kinds(src),
            vec![
                TokenKind::Keyword(Keyword::Struct),
                TokenKind::Ident,
                TokenKind::LBrace,
                TokenKind::RBrace
            ]
        );
    }

    #[test]
    fn lex_positions_are_one_based() {
        let toks = tokenize("struct A {\n  f64 x;\n}").expect("lex");
        assert_eq!((toks[0].line, toks[0].column), (1, 1));
        let f64_tok = toks.iter().find(|t| t.text == "f64").expect("f64");
        assert_eq!((f64_tok.line, f64_tok.column), (2, 3));
    }

    #[test]
    fn lex_numbers_and_scope() {
        let toks = tokenize("a::B 0x1F -3 2.5").expect("lex");
        let ks: Vec<_> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(
            ks,
            vec![
                TokenKind::Ident,
                TokenKind::Scope,
                TokenKind::Ident,
                TokenKind::Integer,
                TokenKind::Integer,
                TokenKind::Float
            ]
        );
    }

    #[test]
    fn lex_string_literal_with_escape() {
        let toks = tokenize(r#"string s = "a\"b";"#).expect("lex");
        let s = toks.iter().find(|t| t.kind == TokenKind::Str).expect("string");
        assert_eq!(s.text, r#""a\"b""#);
    }

    #[test]
    fn lex_unterminated_comment() {
        let err = tokenize("struct A { /* never closed").unwrap_err();
        assert_eq!(err, LexError::UnterminatedComment { line: 1, column: 12 });
    }

    #[test]
    fn lex_unterminated_string() {
        let err = tokenize("string s = \"abc\n;").unwrap_err();
        assert!(matches!(err, LexError::UnterminatedString { line: 1, .. }));
    }

    #[test]
    fn lex_invalid_character() {
        let err = tokenize("struct A { u8 x$; }").unwrap_err();
        assert_eq!(err, LexError::InvalidCharacter { ch: '$', line: 1, column: 16 });
    }

    #[test]
    fn lexer_stops_after_error() {
        let mut lx = Lexer::new("a $ b");
        assert!(matches!(lx.next(), Some(Ok(_))));
        assert!(matches!(lx.next(), Some(Err(_))));
        assert!(lx.next().is_none());
    }
}
