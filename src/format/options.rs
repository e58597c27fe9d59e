//! Formatter configuration (§4.5.3, SPEC_FULL §12): the complete
//! enumeration of line-printer options, plus the identifier dialect the
//! tokenizer and parser also consult for quoting conventions.

use serde::{Deserialize, Serialize};
use strum_macros::Display as StrumDisplay;

use super::token::ContainerType;

/// Identifier-quoting convention. Grounded in the teacher's `sql::Dialect`
/// (`strum`-derived enum dispatching to a per-vendor handler, §1/SPEC_FULL
/// §14), narrowed to the identifier-styles `spec.md` §1 actually names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, StrumDisplay)]
#[strum(serialize_all = "snake_case")]
pub enum IdentifierDialect {
    Postgres,
    MySql,
    SQLite,
    SqlServer,
}

impl IdentifierDialect {
    /// The default `identifierEscape` for this dialect (SPEC_FULL §14).
    pub fn default_escape(&self) -> IdentifierEscape {
        match self {
            IdentifierDialect::Postgres | IdentifierDialect::SQLite => IdentifierEscape::Quote,
            IdentifierDialect::MySql => IdentifierEscape::Backtick,
            IdentifierDialect::SqlServer => IdentifierEscape::Bracket,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndentChar {
    Space,
    Tab,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Newline {
    Lf,
    Crlf,
    Cr,
    Literal(String),
    /// A single space — "oneline mode" (§4.5.3): the printer never emits a
    /// line break.
    OneLine,
}

impl Newline {
    pub fn as_str(&self) -> &str {
        match self {
            Newline::Lf => "\n",
            Newline::Crlf => "\r\n",
            Newline::Cr => "\r",
            Newline::Literal(s) => s,
            Newline::OneLine => " ",
        }
    }

    pub fn is_one_line(&self) -> bool {
        self.as_str() == " "
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeywordCase {
    None,
    Upper,
    Lower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommaBreak {
    None,
    Before,
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalBreak {
    None,
    Before,
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithClauseStyle {
    Standard,
    CteOneLine,
    FullOneLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentifierEscape {
    Quote,
    Backtick,
    Bracket,
    None,
    Custom { start: char, end: char },
}

impl IdentifierEscape {
    pub fn delimiters(&self) -> Option<(char, char)> {
        match self {
            IdentifierEscape::Quote => Some(('"', '"')),
            IdentifierEscape::Backtick => Some(('`', '`')),
            IdentifierEscape::Bracket => Some(('[', ']')),
            IdentifierEscape::None => None,
            IdentifierEscape::Custom { start, end } => Some((*start, *end)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommentExportMode {
    None,
    Full,
    HeaderOnly,
    TopHeaderOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommentStyle {
    Block,
    /// Merges adjacent line comments into a block when more than one line
    /// accumulates (§4.5.3 point 5).
    Smart,
}

/// The complete option surface of §4.5.3's table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatOptions {
    pub indent_char: IndentChar,
    pub indent_size: usize,
    pub newline: Newline,
    pub keyword_case: KeywordCase,
    pub comma_break: CommaBreak,
    pub cte_comma_break: CommaBreak,
    pub values_comma_break: CommaBreak,
    pub and_break: LogicalBreak,
    pub or_break: LogicalBreak,
    pub with_clause_style: WithClauseStyle,
    pub parentheses_one_line: bool,
    pub between_one_line: bool,
    pub values_one_line: bool,
    pub join_one_line: bool,
    pub case_one_line: bool,
    pub subquery_one_line: bool,
    pub insert_columns_one_line: bool,
    pub when_one_line: bool,
    pub indent_nested_parentheses: bool,
    pub identifier_escape: IdentifierEscape,
    pub comment_export_mode: CommentExportMode,
    pub comment_style: CommentStyle,
    pub indent_increment_containers: Vec<ContainerType>,
}

impl Default for FormatOptions {
    fn default() -> Self {
        FormatOptions {
            indent_char: IndentChar::Space,
            indent_size: 4,
            newline: Newline::Lf,
            keyword_case: KeywordCase::Upper,
            comma_break: CommaBreak::After,
            cte_comma_break: CommaBreak::After,
            values_comma_break: CommaBreak::After,
            and_break: LogicalBreak::Before,
            or_break: LogicalBreak::Before,
            with_clause_style: WithClauseStyle::Standard,
            parentheses_one_line: false,
            between_one_line: false,
            values_one_line: false,
            join_one_line: false,
            case_one_line: false,
            subquery_one_line: false,
            insert_columns_one_line: true,
            when_one_line: false,
            indent_nested_parentheses: false,
            identifier_escape: IdentifierEscape::None,
            comment_export_mode: CommentExportMode::Full,
            comment_style: CommentStyle::Block,
            indent_increment_containers: vec![
                ContainerType::SelectClause,
                ContainerType::FromClause,
                ContainerType::WithClause,
                ContainerType::CommonTable,
                ContainerType::CaseExpression,
            ],
        }
    }
}

impl FormatOptions {
    /// Builder entry matching a given identifier dialect's escaping default
    /// (SPEC_FULL §12/§14).
    pub fn for_dialect(dialect: IdentifierDialect) -> Self {
        FormatOptions {
            identifier_escape: dialect.default_escape(),
            ..Default::default()
        }
    }

    pub fn with_newline(mut self, newline: Newline) -> Self {
        self.newline = newline;
        self
    }

    /// Derives a sub-printer configuration for nested oneline rendering
    /// (§4.5.3 point 4): same options, `newline=' '`.
    pub fn as_one_line(&self) -> Self {
        let mut clone = self.clone();
        clone.newline = Newline::OneLine;
        clone
    }

    pub fn indent_unit(&self) -> String {
        let ch = match self.indent_char {
            IndentChar::Space => ' ',
            IndentChar::Tab => '\t',
        };
        ch.to_string().repeat(self.indent_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_line_mode_detected_from_newline() {
        let opts = FormatOptions::default().as_one_line();
        assert!(opts.newline.is_one_line());
    }

    #[test]
    fn dialect_defaults_escape() {
        assert_eq!(
            IdentifierDialect::MySql.default_escape(),
            IdentifierEscape::Backtick
        );
    }
}
