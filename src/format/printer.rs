//! Stage (b) of the formatter: the line printer (§4.5.3). Walks a
//! `PrintToken` tree and renders text, applying every option in
//! `FormatOptions` — this module never looks at the AST.

use super::options::{CommaBreak, CommentStyle, FormatOptions, KeywordCase, LogicalBreak, WithClauseStyle};
use super::token::{ContainerType, PrintToken, TokenType};

/// One output line: an indent level plus its rendered text, joined at the
/// end with `options.indent_unit()` and `options.newline`.
struct Line {
    level: usize,
    text: String,
}

struct Printer<'a> {
    opts: &'a FormatOptions,
    lines: Vec<Line>,
    current: String,
    level: usize,
    pending_space: bool,
    container_stack: Vec<ContainerType>,
}

pub fn print_tree(root: &PrintToken, opts: &FormatOptions) -> String {
    let mut printer = Printer {
        opts,
        lines: Vec::new(),
        current: String::new(),
        level: 0,
        pending_space: false,
        container_stack: Vec::new(),
    };
    printer.print_children(&root.inner_tokens);
    printer.finish()
}

fn one_line_flag(opts: &FormatOptions, container: ContainerType) -> bool {
    match container {
        ContainerType::ParenExpression => opts.parentheses_one_line,
        ContainerType::BetweenExpression => opts.between_one_line,
        ContainerType::Values => opts.values_one_line,
        ContainerType::JoinClause => opts.join_one_line,
        ContainerType::CaseExpression => opts.case_one_line,
        ContainerType::InlineQuery => opts.subquery_one_line,
        ContainerType::InsertClause => opts.insert_columns_one_line,
        ContainerType::MergeWhenClause => opts.when_one_line,
        // `cte-oneline` (§4.5.3): each CTE's own parenthesized body collapses
        // to one line; the surrounding WITH clause and main query do not.
        ContainerType::CommonTable => matches!(opts.with_clause_style, WithClauseStyle::CteOneLine),
        _ => false,
    }
}

fn comma_break_for(opts: &FormatOptions, container: Option<ContainerType>) -> CommaBreak {
    match container {
        Some(ContainerType::WithClause) | Some(ContainerType::CommonTable) => opts.cte_comma_break,
        Some(ContainerType::Values) => opts.values_comma_break,
        _ => opts.comma_break,
    }
}

impl<'a> Printer<'a> {
    fn one_line(&self) -> bool {
        self.opts.newline.is_one_line()
    }

    fn in_case_expression(&self) -> bool {
        self.container_stack.contains(&ContainerType::CaseExpression)
    }

    fn append_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.pending_space && !self.current.is_empty() && !self.current.ends_with('(') && !self.current.ends_with('[') {
            self.current.push(' ');
        }
        self.current.push_str(text);
        self.pending_space = false;
    }

    fn append_newline(&mut self) {
        if self.one_line() {
            self.pending_space = true;
            return;
        }
        let text = std::mem::take(&mut self.current);
        self.lines.push(Line { level: self.level, text });
        self.pending_space = false;
    }

    fn cased_keyword(&self, text: &str) -> String {
        match self.opts.keyword_case {
            KeywordCase::None => text.to_string(),
            KeywordCase::Upper => text.to_ascii_uppercase(),
            KeywordCase::Lower => text.to_ascii_lowercase(),
        }
    }

    fn finish(mut self) -> String {
        if !self.current.is_empty() || self.lines.is_empty() {
            let text = std::mem::take(&mut self.current);
            self.lines.push(Line { level: self.level, text });
        }
        let unit = self.opts.indent_unit();
        let nl = self.opts.newline.as_str();
        self.lines
            .into_iter()
            .map(|line| format!("{}{}", unit.repeat(line.level), line.text))
            .collect::<Vec<_>>()
            .join(nl)
    }

    fn render_sub(&self, tokens: &[PrintToken]) -> String {
        let sub_opts = self.opts.as_one_line();
        let mut sub = Printer {
            opts: &sub_opts,
            lines: Vec::new(),
            current: String::new(),
            level: 0,
            pending_space: false,
            container_stack: self.container_stack.clone(),
        };
        sub.print_children(tokens);
        sub.finish().trim().to_string()
    }

    fn print_children(&mut self, tokens: &[PrintToken]) {
        for token in tokens {
            self.print_token(token);
        }
    }

    fn print_token(&mut self, token: &PrintToken) {
        match token.token_type {
            TokenType::Space => self.pending_space = true,
            TokenType::Keyword => {
                if !self.in_case_expression() && matches!(token.text.as_str(), "AND" | "OR") {
                    let before = match (token.text.as_str(), self.opts.and_break, self.opts.or_break) {
                        ("AND", LogicalBreak::Before, _) => true,
                        ("OR", _, LogicalBreak::Before) => true,
                        _ => false,
                    };
                    let after = match (token.text.as_str(), self.opts.and_break, self.opts.or_break) {
                        ("AND", LogicalBreak::After, _) => true,
                        ("OR", _, LogicalBreak::After) => true,
                        _ => false,
                    };
                    if before {
                        self.append_newline();
                    }
                    let cased = self.cased_keyword(&token.text);
                    self.append_text(&cased);
                    if after {
                        self.append_newline();
                        self.pending_space = false;
                    } else {
                        self.pending_space = true;
                    }
                } else {
                    let cased = self.cased_keyword(&token.text);
                    self.append_text(&cased);
                }
            }
            TokenType::Identifier if token.text.is_empty() && token.container_type.is_some() => {
                self.print_plain_container(token);
            }
            TokenType::Operator | TokenType::Identifier | TokenType::Literal => {
                self.append_text(&token.text);
            }
            TokenType::Comma => {
                let container = token.container_type;
                match comma_break_for(self.opts, container) {
                    CommaBreak::None => self.append_text(","),
                    CommaBreak::Before => {
                        self.append_newline();
                        self.append_text(",");
                        self.pending_space = true;
                    }
                    CommaBreak::After => {
                        // Don't append the comma onto a line that already
                        // has an open `--` comment — it would land inside
                        // the comment text instead of terminating the item.
                        if self.current.contains("--") {
                            self.append_newline();
                        }
                        self.append_text(",");
                        self.append_newline();
                    }
                }
            }
            TokenType::Parenthesis => {
                if token.container_type.is_some() && token.inner_tokens.len() >= 2 {
                    self.print_paren_group(token);
                } else {
                    self.append_text(&token.text);
                }
            }
            TokenType::Comment => self.print_comment(token),
            TokenType::CommentNewline => self.append_newline(),
        }
    }

    fn print_paren_group(&mut self, token: &PrintToken) {
        let container = token.container_type.unwrap();
        let open = &token.inner_tokens[0];
        let close = &token.inner_tokens[token.inner_tokens.len() - 1];
        let inner = &token.inner_tokens[1..token.inner_tokens.len() - 1];

        if one_line_flag(self.opts, container) && !self.one_line() {
            self.append_text(&open.text);
            let rendered = self.render_sub(inner);
            self.append_text(&rendered);
            self.append_text(&close.text);
            return;
        }

        self.append_text(&open.text);
        let indent = self.opts.indent_increment_containers.contains(&container)
            || (self.opts.indent_nested_parentheses && matches!(container, ContainerType::ParenExpression | ContainerType::InlineQuery));
        if indent && !self.one_line() {
            self.level += 1;
            self.append_newline();
        }
        self.container_stack.push(container);
        self.print_children(inner);
        self.container_stack.pop();
        if indent && !self.one_line() {
            self.append_newline();
            self.level -= 1;
        }
        self.append_text(&close.text);
    }

    /// A grouping token with no literal delimiters of its own (e.g. a
    /// `SelectClause`'s comma-joined items) — unlike `print_paren_group`
    /// there is no open/close text, just an indent-level and one-line
    /// policy around its children.
    fn print_plain_container(&mut self, token: &PrintToken) {
        let container = token.container_type.unwrap();

        if one_line_flag(self.opts, container) && !self.one_line() {
            let rendered = self.render_sub(&token.inner_tokens);
            self.append_text(&rendered);
            return;
        }

        let indent = self.opts.indent_increment_containers.contains(&container);
        if indent && !self.one_line() {
            self.level += 1;
        }
        self.container_stack.push(container);
        self.print_children(&token.inner_tokens);
        self.container_stack.pop();
        if indent && !self.one_line() {
            self.level -= 1;
        }
    }

    fn print_comment(&mut self, token: &PrintToken) {
        let is_block = token.text.trim_start().starts_with("/*") || token.container_type == Some(ContainerType::CommentBlock) && token.text.contains('\n');
        let rendered = if matches!(self.opts.comment_style, CommentStyle::Smart) && !is_block {
            format!("-- {}", token.text.trim())
        } else {
            token.text.clone()
        };
        self.append_text(&rendered);
        if !self.one_line() {
            self.append_newline();
        }
    }
}

/// Entry point used by `format::format_query` (§4.5): renders a lowered
/// token tree honoring `withClauseStyle` at the top level (§4.5.3 point 2 —
/// `cte-oneline` flattens each CTE body but keeps the outer `WITH`
/// multi-line; `full-oneline` collapses the whole statement).
pub fn print(root: &PrintToken, opts: &FormatOptions) -> String {
    match opts.with_clause_style {
        WithClauseStyle::FullOneLine => {
            let one = opts.as_one_line();
            print_tree(root, &one)
        }
        _ => print_tree(root, opts),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::token::PrintToken;

    #[test]
    fn keyword_case_lower_applies() {
        let mut opts = FormatOptions::default();
        opts.keyword_case = KeywordCase::Lower;
        let root = PrintToken::container(
            ContainerType::None,
            vec![PrintToken::keyword("SELECT"), PrintToken::space(), PrintToken::literal("1")],
        );
        assert_eq!(print(&root, &opts), "select 1");
    }

    #[test]
    fn one_line_mode_joins_with_single_space() {
        let opts = FormatOptions::default().as_one_line();
        let root = PrintToken::container(
            ContainerType::None,
            vec![
                PrintToken::keyword("SELECT"),
                PrintToken::space(),
                PrintToken::literal("1"),
                PrintToken {
                    container_type: Some(ContainerType::SelectClause),
                    ..PrintToken::comma()
                },
                PrintToken::space(),
                PrintToken::literal("2"),
            ],
        );
        assert_eq!(print(&root, &opts), "SELECT 1, 2");
    }

    #[test]
    fn comma_after_break_starts_new_line() {
        let opts = FormatOptions::default();
        let root = PrintToken::container(
            ContainerType::None,
            vec![
                PrintToken::literal("1"),
                PrintToken {
                    container_type: Some(ContainerType::SelectClause),
                    ..PrintToken::comma()
                },
                PrintToken::space(),
                PrintToken::literal("2"),
            ],
        );
        assert_eq!(print(&root, &opts), "1,\n2");
    }
}
