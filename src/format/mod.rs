//! The two-stage formatter (§4.5): AST → `PrintToken` tree (`lower`) → text
//! (`printer`). Deliberately not built on top of an existing SQL formatter
//! crate — `keywordCase`/`commaBreak`/`withClauseStyle`/the eight
//! `*OneLine` flags/`indentNestedParentheses`/`identifierEscape`/
//! `commentExportMode`/`commentStyle` are finer-grained than any formatting
//! crate in the corpus exposes, so this module owns the whole pipeline.

mod identifier;
mod lower;
mod options;
mod printer;
mod token;

pub use identifier::render_identifier;
pub use options::{
    CommaBreak, CommentExportMode, CommentStyle, FormatOptions, IdentifierDialect,
    IdentifierEscape, IndentChar, KeywordCase, LogicalBreak, Newline, WithClauseStyle,
};
pub use token::{ContainerType, PrintToken, TokenType};

use crate::ast::{Expr, Query};

/// Formats a single statement per `options` (§4.5).
pub fn format_query(query: &Query, options: &FormatOptions) -> String {
    let tree = lower::lower_query(query, options);
    printer::print(&tree, options)
}

/// Formats a standalone value expression, e.g. to interpolate a resolved
/// anchor column into the EXISTS-predicate injector's SQL template (§4.4.4
/// point 2).
pub fn format_expr(expr: &Expr, options: &FormatOptions) -> String {
    let tokens = lower::lower_expr(expr, options);
    let tree = PrintToken::container(ContainerType::None, tokens);
    printer::print(&tree, options)
}

/// Formats several statements, each terminated by `;` and separated by a
/// blank line — the shape the multi-query splitter (§4.2) accepts back in.
pub fn format_queries(queries: &[Query], options: &FormatOptions) -> String {
    queries
        .iter()
        .map(|q| format!("{};", format_query(q, options)))
        .collect::<Vec<_>>()
        .join(if options.newline.is_one_line() { " " } else { "\n\n" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{DataSource, QualifiedName, Query, SelectItem, SimpleSelect, SourceExpression};

    fn select_all_from(table: &str) -> Query {
        let mut select = SimpleSelect::empty();
        select.select.items.push(SelectItem::Wildcard { qualifier: None });
        select.from = Some(crate::ast::FromClause {
            id: crate::ast::NodeId::new(),
            comments: Default::default(),
            primary: SourceExpression::new(DataSource::TableSource(QualifiedName::unqualified(table))),
            joins: Vec::new(),
        });
        Query::SimpleSelect(select)
    }

    #[test]
    fn formats_simple_select_star() {
        let query = select_all_from("users");
        let out = format_query(&query, &FormatOptions::default());
        assert_eq!(out, "SELECT *\nFROM users");
    }

    #[test]
    fn one_line_mode_collapses_to_single_line() {
        let query = select_all_from("users");
        let opts = FormatOptions::default().as_one_line();
        let out = format_query(&query, &opts);
        assert_eq!(out, "SELECT * FROM users");
    }

    #[test]
    fn cte_oneline_collapses_body_but_not_main_query() {
        let query = crate::parser::parse(
            "WITH x AS (SELECT 1) SELECT * FROM x",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        let mut opts = FormatOptions::default();
        opts.with_clause_style = WithClauseStyle::CteOneLine;
        let out = format_query(&query, &opts);
        assert_eq!(out, "WITH x AS (SELECT 1)\nSELECT *\nFROM x");
    }
}
