//! EXISTS-predicate injector (§4.4.4): resolves caller-named anchor columns
//! into a hand-written SQL template, parses the result, and ANDs an
//! `EXISTS`/`NOT EXISTS` predicate into the right scope's `WHERE` clause.

use crate::ast::{BinaryOperator, Expr, ExprKind, Query, SimpleSelect, WhereClause};
use crate::error::{Error, Reason};
use crate::format::{format_expr, FormatOptions, IdentifierDialect};
use crate::parser::parse;
use crate::transform::upstream_select_finder::{find_upstream_select_mut, resolve_anchor_value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistsMode {
    Exists,
    NotExists,
}

/// One EXISTS-injection request (§4.4.4). `sql` carries `$cN` placeholders,
/// one per entry of `anchor_columns`, interpolated with that column's
/// resolved text before parsing.
#[derive(Debug, Clone)]
pub struct ExistsInstruction {
    pub mode: ExistsMode,
    pub anchor_columns: Vec<String>,
    pub sql: String,
    /// Named parameters to bind onto the parsed subquery, e.g. `(":minQty",
    /// expr)` — substituted for matching `Parameter` nodes in the parsed
    /// subquery before it's wrapped in `EXISTS(...)`.
    pub params: Vec<(String, Expr)>,
}

#[derive(Debug, Clone, Copy)]
pub struct InjectOptions {
    pub strict: bool,
    pub dialect: IdentifierDialect,
}

impl Default for InjectOptions {
    fn default() -> Self {
        InjectOptions {
            strict: false,
            dialect: IdentifierDialect::Postgres,
        }
    }
}

/// Injects every instruction into `query` (§4.4.4). Each instruction is
/// normalized against the highest scope that can resolve its anchor
/// columns; a `BinarySelect` applies the same instruction set to both
/// branches, matching the "left/right must share output arity" invariant
/// (§3.2). `options.strict` re-throws per-instruction errors; otherwise a
/// failing instruction is skipped (§7 "semantic rejection").
pub fn inject(
    query: &mut Query,
    instructions: &[ExistsInstruction],
    options: &InjectOptions,
) -> Result<(), Error> {
    match query {
        Query::BinarySelect(binary) => {
            inject(&mut binary.left, instructions, options)?;
            inject(&mut binary.right, instructions, options)
        }
        _ => {
            for instruction in instructions {
                match inject_one(query, instruction, options) {
                    Ok(()) => {}
                    Err(e) if options.strict => return Err(e),
                    Err(e) => log::debug!("skipped EXISTS instruction: {}", e.message()),
                }
            }
            Ok(())
        }
    }
}

fn inject_one(
    query: &mut Query,
    instruction: &ExistsInstruction,
    options: &InjectOptions,
) -> Result<(), Error> {
    validate_template(&instruction.sql, instruction.anchor_columns.len())?;

    let format_opts = FormatOptions::for_dialect(options.dialect);
    let select = find_upstream_select_mut(query, &instruction.anchor_columns).ok_or_else(|| {
        Error::new(Reason::NotFound {
            name: instruction.anchor_columns.join(", "),
            namespace: "scope for anchor column(s)".to_string(),
        })
    })?;

    let mut sql = instruction.sql.clone();
    for (i, anchor) in instruction.anchor_columns.iter().enumerate() {
        let value = resolve_anchor_value(select, anchor).ok_or_else(|| {
            Error::new(Reason::NotFound {
                name: anchor.clone(),
                namespace: "anchor column".to_string(),
            })
        })?;
        let text = format_expr(&value, &format_opts);
        sql = sql.replace(&format!("${{c{i}}}"), &text);
        sql = sql.replace(&format!("$c{i}"), &text);
    }

    let mut subquery = parse(&sql, options.dialect)?;
    bind_params(&mut subquery, &instruction.params);

    let predicate = Expr::new(ExprKind::Exists {
        negated: instruction.mode == ExistsMode::NotExists,
        query: Box::new(subquery),
    });

    and_into_where(select, predicate);
    Ok(())
}

/// §4.4.4 point 3: forbid empty SQL, embedded `;`, the keyword `LATERAL`,
/// and unused or missing placeholders.
fn validate_template(sql: &str, anchor_count: usize) -> Result<(), Error> {
    if sql.trim().is_empty() {
        return Err(reject("EXISTS predicate SQL must not be empty"));
    }
    if sql.contains(';') {
        return Err(reject("EXISTS predicate SQL must not contain `;`"));
    }
    if contains_word_ci(sql, "LATERAL") {
        return Err(reject("EXISTS predicate SQL must not use LATERAL"));
    }
    for i in 0..anchor_count {
        if !sql.contains(&format!("$c{i}")) && !sql.contains(&format!("${{c{i}}}")) {
            return Err(reject(format!("placeholder $c{i} is never used")));
        }
    }
    for i in anchor_count..(anchor_count + 32) {
        if sql.contains(&format!("$c{i}")) || sql.contains(&format!("${{c{i}}}")) {
            return Err(reject(format!(
                "placeholder $c{i} has no corresponding anchor column"
            )));
        }
    }
    Ok(())
}

fn reject(detail: impl Into<String>) -> Error {
    Error::new(Reason::SemanticRejection(detail.into()))
}

fn contains_word_ci(haystack: &str, word: &str) -> bool {
    let haystack = haystack.to_ascii_uppercase();
    let word = word.to_ascii_uppercase();
    let mut start = 0;
    while let Some(pos) = haystack[start..].find(&word) {
        let abs = start + pos;
        let before_ok = abs == 0 || !haystack.as_bytes()[abs - 1].is_ascii_alphanumeric();
        let after = abs + word.len();
        let after_ok = after >= haystack.len() || !haystack.as_bytes()[after].is_ascii_alphanumeric();
        if before_ok && after_ok {
            return true;
        }
        start = abs + word.len();
    }
    false
}

fn bind_params(query: &mut Query, params: &[(String, Expr)]) {
    if params.is_empty() {
        return;
    }
    if let Query::SimpleSelect(select) = query {
        if let Some(where_clause) = &mut select.r#where {
            substitute_params(&mut where_clause.condition, params);
        }
    }
}

fn substitute_params(expr: &mut Expr, params: &[(String, Expr)]) {
    if let ExprKind::Parameter(name) = &expr.kind {
        if let Some((_, value)) = params.iter().find(|(n, _)| n == name) {
            *expr = value.clone();
            return;
        }
    }
    match &mut expr.kind {
        ExprKind::Binary { left, right, .. } => {
            substitute_params(left, params);
            substitute_params(right, params);
        }
        ExprKind::Unary { expr, .. } => substitute_params(expr, params),
        _ => {}
    }
}

fn and_into_where(select: &mut SimpleSelect, predicate: Expr) {
    match &mut select.r#where {
        Some(existing) => {
            let old = std::mem::replace(
                &mut existing.condition,
                Expr::new(ExprKind::Literal(crate::ast::LiteralValue::Null)),
            );
            existing.condition = Expr::new(ExprKind::Binary {
                op: BinaryOperator::And,
                left: Box::new(old),
                right: Box::new(predicate),
            });
        }
        None => {
            select.r#where = Some(WhereClause {
                id: crate::ast::NodeId::new(),
                comments: Default::default(),
                condition: predicate,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::format_query;

    #[test]
    fn injects_exists_with_resolved_anchor() {
        let mut q = parse("SELECT o.id FROM orders o", IdentifierDialect::Postgres).unwrap();
        let instructions = vec![ExistsInstruction {
            mode: ExistsMode::Exists,
            anchor_columns: vec!["o.customer_id".to_string()],
            sql: "SELECT 1 FROM customers c WHERE c.id = $c0 AND c.active".to_string(),
            params: Vec::new(),
        }];
        inject(&mut q, &instructions, &InjectOptions::default()).unwrap();
        let out = format_query(&q, &FormatOptions::default().as_one_line());
        assert_eq!(
            out,
            "SELECT o.id FROM orders o WHERE EXISTS (SELECT 1 FROM customers c WHERE c.id = o.customer_id AND c.active)"
        );
    }

    #[test]
    fn rejects_lateral() {
        let mut q = parse("SELECT o.id FROM orders o", IdentifierDialect::Postgres).unwrap();
        let instructions = vec![ExistsInstruction {
            mode: ExistsMode::Exists,
            anchor_columns: vec!["o.customer_id".to_string()],
            sql: "SELECT 1 FROM LATERAL (SELECT 1) t WHERE t.x = $c0".to_string(),
            params: Vec::new(),
        }];
        let result = inject(
            &mut q,
            &instructions,
            &InjectOptions {
                strict: true,
                dialect: IdentifierDialect::Postgres,
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn non_strict_mode_skips_failing_instruction() {
        let mut q = parse("SELECT o.id FROM orders o", IdentifierDialect::Postgres).unwrap();
        let instructions = vec![ExistsInstruction {
            mode: ExistsMode::Exists,
            anchor_columns: vec!["o.missing".to_string()],
            sql: "SELECT 1 FROM t WHERE t.x = $c0".to_string(),
            params: Vec::new(),
        }];
        inject(&mut q, &instructions, &InjectOptions::default()).unwrap();
        let select = q.as_simple_select().unwrap();
        assert!(select.r#where.is_none());
    }
}
