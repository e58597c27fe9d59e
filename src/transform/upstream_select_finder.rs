//! Upstream-select query finder (§4.4.3): given a root query and a set of
//! column names, finds the *highest* `SimpleSelect` scope whose own `FROM`
//! clause (or CTE list) can satisfy every one of them, descending into
//! subquery `FROM` sources when the current level can't.
//!
//! Used by the EXISTS-predicate injector (§4.4.4) and available to any
//! other transformer that needs to pick the right scope for a caller-named
//! column before rewriting it.
//!
//! Simplification recorded in DESIGN.md: a qualified anchor (`alias.col`)
//! is considered satisfied the moment `alias` names a reachable `FROM`
//! source or CTE at that scope — this doesn't verify the source's real
//! schema actually has `col` (no live connection is assumed, per §4.3). An
//! unqualified anchor is satisfied by a matching output alias or by being
//! the query's sole `FROM` source.

use crate::ast::{DataSource, Expr, ExprKind, IdentifierString, Query, QualifiedName, SimpleSelect, SourceExpression};
use crate::collect::{DedupMode, SelectableColumnCollector};

/// Every name this select's own `FROM`/`WITH` scope exposes as a
/// `name.column`-addressable namespace: source aliases/table names plus
/// CTE names, not recursing into subquery bodies (those aren't addressable
/// from the outer scope).
fn scope_names(select: &SimpleSelect) -> Vec<String> {
    let mut names = Vec::new();
    if let Some(from) = &select.from {
        collect_source_name(&from.primary, &mut names);
        for join in &from.joins {
            collect_source_name(&join.source, &mut names);
        }
    }
    if let Some(with) = &select.with {
        names.extend(with.tables.iter().map(|t| t.name.text.to_ascii_lowercase()));
    }
    names
}

fn collect_source_name(source: &SourceExpression, names: &mut Vec<String>) {
    match &source.data_source {
        DataSource::ParenSource(inner) => collect_source_name(inner, names),
        _ => {
            if let Some(name) = source.effective_name() {
                names.push(name.text.to_ascii_lowercase());
            }
        }
    }
}

/// True iff `select`'s own scope can satisfy every entry of
/// `anchor_columns` (each either `alias.column` or a bare `column`).
pub fn select_satisfies(select: &SimpleSelect, anchor_columns: &[String]) -> bool {
    let scope = scope_names(select);
    anchor_columns.iter().all(|anchor| {
        if let Some((alias, _col)) = anchor.split_once('.') {
            scope.iter().any(|n| n.eq_ignore_ascii_case(alias))
        } else {
            let selectable = SelectableColumnCollector::new(DedupMode::ColumnNameOnly {
                normalize_underscores: false,
            })
            .collect(&Query::SimpleSelect(select.clone()));
            selectable.iter().any(|c| c.alias.eq_ignore_ascii_case(anchor)) || scope.len() == 1
        }
    })
}

/// Descends into `select`'s own `FROM` subqueries (and CTE bodies) looking
/// for the first nested `SimpleSelect` whose scope satisfies every anchor,
/// mutably. Returns `None` if nothing downstream satisfies them either.
fn find_in_subqueries<'a>(
    select: &'a mut SimpleSelect,
    anchor_columns: &[String],
) -> Option<&'a mut SimpleSelect> {
    if let Some(with) = &mut select.with {
        for cte in &mut with.tables {
            if let Some(found) = find_upstream_select_mut(&mut cte.query, anchor_columns) {
                return Some(found);
            }
        }
    }
    if let Some(from) = &mut select.from {
        if let Some(found) = find_in_source(&mut from.primary, anchor_columns) {
            return Some(found);
        }
        for join in &mut from.joins {
            if let Some(found) = find_in_source(&mut join.source, anchor_columns) {
                return Some(found);
            }
        }
    }
    None
}

fn find_in_source<'a>(
    source: &'a mut SourceExpression,
    anchor_columns: &[String],
) -> Option<&'a mut SimpleSelect> {
    match &mut source.data_source {
        DataSource::SubQuerySource(query) => find_upstream_select_mut(query, anchor_columns),
        DataSource::ParenSource(inner) => find_in_source(inner, anchor_columns),
        _ => None,
    }
}

/// Finds the highest `SimpleSelect` reachable from `query` whose scope
/// satisfies every entry of `anchor_columns` (§4.4.3). For a `BinarySelect`
/// the left branch is tried first — callers that need both arms of a set
/// operation handled should recurse over `left`/`right` themselves, as the
/// EXISTS injector does.
pub fn find_upstream_select_mut<'a>(
    query: &'a mut Query,
    anchor_columns: &[String],
) -> Option<&'a mut SimpleSelect> {
    match query {
        Query::SimpleSelect(select) => {
            if select_satisfies(select, anchor_columns) {
                Some(select)
            } else {
                find_in_subqueries(select, anchor_columns)
            }
        }
        Query::BinarySelect(binary) => {
            find_upstream_select_mut(&mut binary.left, anchor_columns)
                .or_else(|| find_upstream_select_mut(&mut binary.right, anchor_columns))
        }
        _ => None,
    }
}

/// Resolves one anchor column name to a value expression within `select`'s
/// own scope (§4.4.4 point 2: "resolve each anchor column name to a value
/// expression using upstream-select finder + selectable collector"). A
/// qualified anchor resolves directly to a column reference on the named
/// source; a bare anchor resolves through the selectable-column collector.
pub fn resolve_anchor_value(select: &SimpleSelect, anchor: &str) -> Option<Expr> {
    if let Some((alias, col)) = anchor.split_once('.') {
        let scope = scope_names(select);
        if scope.iter().any(|n| n.eq_ignore_ascii_case(alias)) {
            return Some(Expr::new(ExprKind::ColumnReference(QualifiedName {
                namespaces: vec![IdentifierString::new(alias)],
                name: IdentifierString::new(col),
            })));
        }
        None
    } else {
        SelectableColumnCollector::new(DedupMode::ColumnNameOnly {
            normalize_underscores: false,
        })
        .collect(&Query::SimpleSelect(select.clone()))
        .into_iter()
        .find(|c| c.alias.eq_ignore_ascii_case(anchor))
        .map(|c| c.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::IdentifierDialect;
    use crate::parser::parse;

    #[test]
    fn top_level_select_satisfies_own_alias() {
        let mut q = parse("SELECT o.id FROM orders o", IdentifierDialect::Postgres).unwrap();
        let anchors = vec!["o.customer_id".to_string()];
        let found = find_upstream_select_mut(&mut q, &anchors);
        assert!(found.is_some());
    }

    #[test]
    fn descends_into_subquery_when_outer_lacks_alias() {
        let mut q = parse(
            "SELECT sub.id FROM (SELECT o.id, o.customer_id FROM orders o) sub",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        let anchors = vec!["o.customer_id".to_string()];
        let found = find_upstream_select_mut(&mut q, &anchors).expect("should descend");
        assert!(found.from.is_some());
    }

    #[test]
    fn returns_none_when_nothing_satisfies() {
        let mut q = parse("SELECT o.id FROM orders o", IdentifierDialect::Postgres).unwrap();
        let anchors = vec!["missing.col".to_string()];
        assert!(find_upstream_select_mut(&mut q, &anchors).is_none());
    }

    #[test]
    fn resolves_qualified_anchor_to_column_reference() {
        let q = parse("SELECT o.id FROM orders o", IdentifierDialect::Postgres).unwrap();
        let select = q.as_simple_select().unwrap();
        let value = resolve_anchor_value(select, "o.customer_id").unwrap();
        match value.kind {
            ExprKind::ColumnReference(name) => {
                assert_eq!(name.first_namespace(), Some("o"));
                assert_eq!(name.name.text, "customer_id");
            }
            _ => panic!("expected column reference"),
        }
    }
}
