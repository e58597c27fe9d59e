//! The print-token tree (§4.5.1): the formatter's intermediate
//! representation between AST and text.

use serde::{Deserialize, Serialize};
use strum_macros::Display as StrumDisplay;

use crate::ast::Comments;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, StrumDisplay)]
#[strum(serialize_all = "snake_case")]
pub enum TokenType {
    Keyword,
    Operator,
    Comma,
    Parenthesis,
    Identifier,
    Literal,
    Space,
    Comment,
    CommentNewline,
    /// Separator between top-level clauses (`SELECT` ... `FROM` ...
    /// `WHERE` ...): forces a newline when the printer isn't in one-line
    /// mode, otherwise behaves like a plain space (§4.5.2/§4.5.3).
    ClauseBreak,
}

/// Every syntactic region the printer must treat specially (§4.5.1): each
/// carries its own break/oneline policy in `FormatOptions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, StrumDisplay)]
#[strum(serialize_all = "snake_case")]
pub enum ContainerType {
    SelectClause,
    FromClause,
    WithClause,
    CommonTable,
    Values,
    JoinClause,
    ParenExpression,
    CaseExpression,
    BetweenExpression,
    InlineQuery,
    CommentBlock,
    MergeWhenClause,
    InsertClause,
    WhereClause,
    GroupByClause,
    OrderByClause,
    ReturningClause,
    WindowFrame,
    None,
}

/// One token in the lowered tree. Container-typed tokens (`Parenthesis`
/// wrapping a `ParenExpression`, `Keyword` opening a `SelectClause`, ...)
/// carry their own children and, for containers that group keywords (e.g. a
/// `JoinClause`'s `LEFT JOIN`), the constituent keyword tokens separately so
/// the printer can re-case or re-break them without re-parsing text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintToken {
    pub token_type: TokenType,
    pub text: String,
    pub container_type: Option<ContainerType>,
    pub inner_tokens: Vec<PrintToken>,
    pub keyword_tokens: Vec<String>,
    pub is_header_comment: bool,
}

impl PrintToken {
    pub fn leaf(token_type: TokenType, text: impl Into<String>) -> Self {
        PrintToken {
            token_type,
            text: text.into(),
            container_type: None,
            inner_tokens: Vec::new(),
            keyword_tokens: Vec::new(),
            is_header_comment: false,
        }
    }

    pub fn keyword(text: impl Into<String>) -> Self {
        Self::leaf(TokenType::Keyword, text)
    }

    pub fn operator(text: impl Into<String>) -> Self {
        Self::leaf(TokenType::Operator, text)
    }

    pub fn space() -> Self {
        Self::leaf(TokenType::Space, " ")
    }

    pub fn clause_break() -> Self {
        Self::leaf(TokenType::ClauseBreak, " ")
    }

    pub fn comma() -> Self {
        Self::leaf(TokenType::Comma, ",")
    }

    pub fn identifier(text: impl Into<String>) -> Self {
        Self::leaf(TokenType::Identifier, text)
    }

    pub fn literal(text: impl Into<String>) -> Self {
        Self::leaf(TokenType::Literal, text)
    }

    pub fn paren(container: ContainerType, open: &str, close: &str, inner: Vec<PrintToken>) -> Self {
        PrintToken {
            token_type: TokenType::Parenthesis,
            text: String::new(),
            container_type: Some(container),
            inner_tokens: {
                let mut v = Vec::with_capacity(inner.len() + 2);
                v.push(Self::leaf(TokenType::Parenthesis, open));
                v.extend(inner);
                v.push(Self::leaf(TokenType::Parenthesis, close));
                v
            },
            keyword_tokens: Vec::new(),
            is_header_comment: false,
        }
    }

    pub fn container(container: ContainerType, inner: Vec<PrintToken>) -> Self {
        PrintToken {
            token_type: TokenType::Identifier,
            text: String::new(),
            container_type: Some(container),
            inner_tokens: inner,
            keyword_tokens: Vec::new(),
            is_header_comment: false,
        }
    }
}

/// Lowers a node's attached comments into sibling `CommentBlock` tokens
/// immediately before its opening token (§4.5.2), unless classified as
/// inline (which the caller attaches to the same line instead).
pub fn comment_tokens(comments: &Comments, header_only: bool) -> Vec<PrintToken> {
    let mut out = Vec::new();
    for c in &comments.leading {
        if header_only && !c.is_block {
            continue;
        }
        out.push(PrintToken {
            token_type: TokenType::Comment,
            text: c.text.clone(),
            container_type: Some(ContainerType::CommentBlock),
            inner_tokens: Vec::new(),
            keyword_tokens: Vec::new(),
            is_header_comment: header_only,
        });
        out.push(PrintToken::leaf(TokenType::CommentNewline, ""));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paren_wraps_open_inner_close() {
        let p = PrintToken::paren(
            ContainerType::ParenExpression,
            "(",
            ")",
            vec![PrintToken::literal("1")],
        );
        assert_eq!(p.inner_tokens.len(), 3);
        assert_eq!(p.inner_tokens[0].text, "(");
        assert_eq!(p.inner_tokens[2].text, ")");
    }
}
