//! Tokenizer contract (§6): `tokenize(text) -> [{kind, value, position}]`.
//!
//! `spec.md` treats the lexical tokenizer as an external collaborator,
//! specified only by this contract — "a conforming implementation may adopt
//! any standard tokenization strategy". The parser (§4.2) is written purely
//! against `Lexeme`/`LexemeKind` below, so any tokenizer satisfying this
//! contract can be swapped in; this module supplies the one sqlforge ships
//! with, a direct hand-scanned lexer (no external lexer crate pulled in,
//! since the dialects sqlforge targets — Postgres primarily, MySQL/SQLite/
//! SQL Server identifier styles — differ mainly in identifier quoting,
//! which is cheaper to special-case here than to carry a whole grammar
//! crate for).

use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::ast::Span;
use crate::error::{Error, Reason};
use crate::format::IdentifierDialect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LexemeKind {
    Keyword,
    Identifier,
    QuotedIdentifier,
    StringLiteral,
    NumberLiteral,
    BoolLiteral,
    NullLiteral,
    Parameter,
    Punctuation,
    Comment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lexeme {
    pub kind: LexemeKind,
    /// Original-case text; for `QuotedIdentifier` the surrounding quotes are
    /// stripped, for `StringLiteral` the surrounding quotes are kept so the
    /// parser can distinguish escaping conventions if it needs to.
    pub value: String,
    pub position: Span,
}

/// Keyword dictionary (§4.2 "explicit keyword dictionaries"). Not
/// exhaustive of the whole SQL:2016 grammar — just every keyword the
/// parser in `parser/` matches on.
static KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "SELECT", "FROM", "WHERE", "GROUP", "BY", "HAVING", "ORDER", "WINDOW", "LIMIT", "OFFSET",
        "FETCH", "FIRST", "NEXT", "ROWS", "ROW", "ONLY", "WITH", "TIES", "FOR", "UPDATE", "SHARE",
        "NOWAIT", "OF", "RETURNING", "WITH", "RECURSIVE", "AS", "DISTINCT", "ALL", "UNION",
        "INTERSECT", "EXCEPT", "JOIN", "INNER", "LEFT", "RIGHT", "FULL", "CROSS", "LATERAL", "ON",
        "USING", "AND", "OR", "NOT", "NULL", "IS", "IN", "BETWEEN", "LIKE", "ILIKE", "EXISTS",
        "CASE", "WHEN", "THEN", "ELSE", "END", "CAST", "ARRAY", "VALUES", "INSERT", "INTO",
        "DEFAULT", "SET", "DELETE", "MERGE", "MATCHED", "TARGET", "SOURCE", "WHEN", "THEN",
        "NOTHING", "DO", "OVER", "PARTITION", "RANGE", "GROUPS", "UNBOUNDED", "PRECEDING",
        "FOLLOWING", "CURRENT", "EXPLAIN", "ANALYZE", "ASC", "DESC", "NULLS", "LAST", "CREATE",
        "TABLE", "INDEX", "ALTER", "DROP", "ADD", "COLUMN", "CONSTRAINT", "PRIMARY", "KEY",
        "UNIQUE", "FOREIGN", "REFERENCES", "CHECK", "IF", "EXISTS", "INCLUDE", "TRUE", "FALSE",
    ]
    .into_iter()
    .collect()
});

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(word.to_ascii_uppercase().as_str())
}

struct Scanner<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    dialect: IdentifierDialect,
}

/// Tokenizes `text` per the contract of §6.
pub fn tokenize(text: &str, dialect: IdentifierDialect) -> Result<Vec<Lexeme>, Error> {
    let mut scanner = Scanner {
        text,
        bytes: text.as_bytes(),
        pos: 0,
        dialect,
    };
    let mut out = Vec::new();
    while let Some(lexeme) = scanner.next_lexeme()? {
        out.push(lexeme);
    }
    Ok(out)
}

impl<'a> Scanner<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    fn slice(&self, start: usize) -> &'a str {
        &self.text[start..self.pos]
    }

    fn next_lexeme(&mut self) -> Result<Option<Lexeme>, Error> {
        self.skip_whitespace();
        let start = self.pos;
        let Some(c) = self.peek() else {
            return Ok(None);
        };

        // Line comments: `--` everywhere, `#` for MySQL.
        if c == b'-' && self.peek_at(1) == Some(b'-') {
            while !matches!(self.peek(), None | Some(b'\n')) {
                self.pos += 1;
            }
            return self.finish(start, LexemeKind::Comment);
        }
        if c == b'#' && self.dialect == IdentifierDialect::MySql {
            while !matches!(self.peek(), None | Some(b'\n')) {
                self.pos += 1;
            }
            return self.finish(start, LexemeKind::Comment);
        }
        // Block comments.
        if c == b'/' && self.peek_at(1) == Some(b'*') {
            self.pos += 2;
            while !(self.peek().is_none()
                || (self.peek() == Some(b'*') && self.peek_at(1) == Some(b'/')))
            {
                self.pos += 1;
            }
            if self.peek().is_some() {
                self.pos += 2;
            } else {
                return Err(self.err(start, "unterminated block comment"));
            }
            return self.finish(start, LexemeKind::Comment);
        }

        // Quoted identifiers: `"x"`, `` `x` ``, `[x]` depending on dialect.
        if c == b'"' || (c == b'`') || (c == b'[' && self.dialect == IdentifierDialect::SqlServer)
        {
            return self.scan_quoted_identifier(start);
        }

        // String literals.
        if c == b'\'' {
            return self.scan_string_literal(start);
        }

        // Named parameters: `:name` or `$name` (but `$1`-style numeric
        // placeholders are also accepted as parameter names).
        if c == b':' || c == b'$' {
            self.pos += 1;
            let name_start = self.pos;
            while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
                self.pos += 1;
            }
            if self.pos == name_start {
                return Err(self.err(start, "expected parameter name after ':'/'$'"));
            }
            return self.finish(start, LexemeKind::Parameter);
        }

        // Numbers.
        if c.is_ascii_digit() {
            while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
                self.pos += 1;
            }
            if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b) if b.is_ascii_digit())
            {
                self.pos += 1;
                while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
            return self.finish(start, LexemeKind::NumberLiteral);
        }

        // Identifiers and keywords.
        if c.is_ascii_alphabetic() || c == b'_' {
            while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
                self.pos += 1;
            }
            let word = self.slice(start);
            return if is_keyword(word) {
                match word.to_ascii_uppercase().as_str() {
                    "TRUE" | "FALSE" => self.finish(start, LexemeKind::BoolLiteral),
                    "NULL" => self.finish(start, LexemeKind::NullLiteral),
                    _ => self.finish(start, LexemeKind::Keyword),
                }
            } else {
                self.finish(start, LexemeKind::Identifier)
            };
        }

        // Multi-char punctuation.
        for op in ["<=", ">=", "<>", "!=", "||", "::"] {
            if self.text[self.pos..].starts_with(op) {
                self.pos += op.len();
                return self.finish(start, LexemeKind::Punctuation);
            }
        }

        // Single-char punctuation.
        self.pos += 1;
        self.finish(start, LexemeKind::Punctuation)
    }

    fn scan_quoted_identifier(&mut self, start: usize) -> Result<Option<Lexeme>, Error> {
        let (open, close) = match self.bytes[self.pos] {
            b'"' => (b'"', b'"'),
            b'`' => (b'`', b'`'),
            b'[' => (b'[', b']'),
            _ => unreachable!(),
        };
        self.pos += 1;
        let content_start = self.pos;
        loop {
            match self.peek() {
                None => return Err(self.err(start, "unterminated quoted identifier")),
                Some(b) if b == close => break,
                _ => self.pos += 1,
            }
        }
        let text = self.text[content_start..self.pos].to_string();
        self.pos += 1;
        let _ = open;
        Ok(Some(Lexeme {
            kind: LexemeKind::QuotedIdentifier,
            value: text,
            position: Span::new(start, self.pos),
        }))
    }

    fn scan_string_literal(&mut self, start: usize) -> Result<Option<Lexeme>, Error> {
        self.pos += 1;
        loop {
            match self.peek() {
                None => return Err(self.err(start, "unterminated string literal")),
                Some(b'\'') => {
                    // `''` is an escaped quote inside the literal.
                    if self.peek_at(1) == Some(b'\'') {
                        self.pos += 2;
                        continue;
                    }
                    self.pos += 1;
                    break;
                }
                _ => self.pos += 1,
            }
        }
        Ok(Some(Lexeme {
            kind: LexemeKind::StringLiteral,
            value: self.slice(start).to_string(),
            position: Span::new(start, self.pos),
        }))
    }

    fn finish(&self, start: usize, kind: LexemeKind) -> Result<Option<Lexeme>, Error> {
        Ok(Some(Lexeme {
            kind,
            value: self.slice(start).to_string(),
            position: Span::new(start, self.pos),
        }))
    }

    fn err(&self, start: usize, message: &str) -> Error {
        Error::new(Reason::Simple(message.to_string())).with_span(Some(Span::new(start, self.pos)))
    }
}

/// Convenience wrapper used by the multi-query splitter (§4.2) to share a
/// lexeme stream by reference without repeatedly re-tokenizing.
pub type LexemeStream = Arc<[Lexeme]>;

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<LexemeKind> {
        tokenize(text, IdentifierDialect::Postgres)
            .unwrap()
            .into_iter()
            .map(|l| l.kind)
            .collect()
    }

    #[test]
    fn tokenizes_simple_select() {
        let kinds = kinds("SELECT a FROM b");
        assert_eq!(
            kinds,
            vec![
                LexemeKind::Keyword,
                LexemeKind::Identifier,
                LexemeKind::Keyword,
                LexemeKind::Identifier,
            ]
        );
    }

    #[test]
    fn quoted_identifier_preserves_case() {
        let lexemes = tokenize(r#"SELECT "Foo" FROM t"#, IdentifierDialect::Postgres).unwrap();
        assert_eq!(lexemes[1].value, "Foo");
        assert_eq!(lexemes[1].kind, LexemeKind::QuotedIdentifier);
    }

    #[test]
    fn comment_is_a_dedicated_token() {
        let lexemes = tokenize("SELECT 1 -- trailing\n", IdentifierDialect::Postgres).unwrap();
        assert!(lexemes.iter().any(|l| l.kind == LexemeKind::Comment));
    }

    #[test]
    fn named_and_dollar_parameters() {
        let lexemes = tokenize("SELECT :a, $b", IdentifierDialect::Postgres).unwrap();
        let params: Vec<_> = lexemes
            .iter()
            .filter(|l| l.kind == LexemeKind::Parameter)
            .map(|l| l.value.as_str())
            .collect();
        assert_eq!(params, vec![":a", "$b"]);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(tokenize("SELECT 'abc", IdentifierDialect::Postgres).is_err());
    }
}
