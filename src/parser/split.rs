//! The multi-query splitter (§4.2): recognizes statement terminators
//! outside string/identifier literals and inside balanced parentheses.
//!
//! Operating on the already-tokenized lexeme stream rather than raw text
//! makes "outside string/identifier literals" free — the tokenizer already
//! classified those spans — so the splitter only has to track paren depth
//! and cut on top-level `;` punctuation.

use crate::lexeme::{Lexeme, LexemeKind};

/// Splits `lexemes` into per-statement slices on top-level `;`. Empty
/// slices (two consecutive `;`, or a trailing `;`) are included as empty
/// and skipped by the caller (`parser::parse_many`).
pub fn split_statements(lexemes: &[Lexeme]) -> Vec<&[Lexeme]> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, lex) in lexemes.iter().enumerate() {
        match lex.kind {
            LexemeKind::Punctuation if lex.value == "(" => depth += 1,
            LexemeKind::Punctuation if lex.value == ")" => depth -= 1,
            LexemeKind::Punctuation if lex.value == ";" && depth <= 0 => {
                out.push(&lexemes[start..i]);
                start = i + 1;
                continue;
            }
            _ => {}
        }
    }
    if start < lexemes.len() {
        out.push(&lexemes[start..]);
    }
    out.into_iter()
        .filter(|chunk| chunk.iter().any(|l| l.kind != LexemeKind::Comment))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::IdentifierDialect;
    use crate::lexeme::tokenize;

    #[test]
    fn splits_on_top_level_semicolons() {
        let lexemes = tokenize("SELECT 1; SELECT 2;", IdentifierDialect::Postgres).unwrap();
        let chunks = split_statements(&lexemes);
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn semicolon_inside_parens_does_not_split() {
        // A function body / subquery could in principle carry a `;` in a
        // string (already classified as a single StringLiteral lexeme by
        // the tokenizer), so nesting is the only thing this needs to guard.
        let lexemes = tokenize(
            "SELECT (SELECT 1) AS x; SELECT 2",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        let chunks = split_statements(&lexemes);
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn trailing_semicolon_yields_no_empty_trailing_chunk() {
        let lexemes = tokenize("SELECT 1;", IdentifierDialect::Postgres).unwrap();
        let chunks = split_statements(&lexemes);
        assert_eq!(chunks.len(), 1);
    }
}
