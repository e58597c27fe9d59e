//! Selectable-column collector (§4.3): `{alias, value}` pairs exposed by a
//! `SELECT`, with two duplicate-detection modes and an optional upstream
//! expansion mode for wildcards.
//!
//! Unlike the other collectors in this module, this one isn't a generic
//! `Visitor` walk — it follows the *projection* structure of a query (select
//! items, then upstream sources only when a wildcard needs expanding) rather
//! than every expression in the tree, so it's written as direct recursion
//! over the query/source shapes instead.

use std::collections::{HashMap, HashSet};

use crate::ast::{
    CommonTable, DataSource, Expr, ExprKind, FromClause, IdentifierString, Query, QualifiedName,
    SelectItem, SimpleSelect, SourceExpression,
};

/// One exposed output column.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectableColumn {
    pub alias: String,
    pub value: Expr,
}

/// Duplicate-detection mode (§4.3).
#[derive(Debug, Clone, Copy)]
pub enum DedupMode {
    /// Compare by output column name only.
    ColumnNameOnly { normalize_underscores: bool },
    /// Compare by `table.column` when the value is a qualified column
    /// reference, else fall back to the alias.
    FullName,
}

/// Resolves a table name to its column names, supplied by the caller so the
/// collector never needs a live schema connection (§4.3 "tableColumnResolver").
pub type TableColumnResolver<'a> = dyn Fn(&str) -> Option<Vec<String>> + 'a;

pub struct SelectableColumnCollector<'a> {
    dedup: DedupMode,
    resolver: Option<&'a TableColumnResolver<'a>>,
}

impl<'a> SelectableColumnCollector<'a> {
    pub fn new(dedup: DedupMode) -> Self {
        SelectableColumnCollector {
            dedup,
            resolver: None,
        }
    }

    /// Enables upstream expansion: wildcards are expanded by walking table
    /// sources (via `resolver`), CTE bodies and subqueries (§4.3 "upstream").
    /// Required when the caller needs to filter on columns not in the outer
    /// SELECT list.
    pub fn with_upstream_resolver(mut self, resolver: &'a TableColumnResolver<'a>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    fn upstream(&self) -> bool {
        self.resolver.is_some()
    }

    pub fn collect(&self, query: &Query) -> Vec<SelectableColumn> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        self.collect_query(query, &mut out, &mut seen);
        out
    }

    fn collect_query(&self, query: &Query, out: &mut Vec<SelectableColumn>, seen: &mut HashSet<String>) {
        match query {
            Query::SimpleSelect(select) => self.collect_select(select, out, seen),
            // Binary set-ops produce the same output arity/names on both
            // sides (§3.2); the left side is authoritative for naming.
            Query::BinarySelect(binary) => self.collect_query(&binary.left, out, seen),
            _ => {}
        }
    }

    fn collect_select(
        &self,
        select: &SimpleSelect,
        out: &mut Vec<SelectableColumn>,
        seen: &mut HashSet<String>,
    ) {
        let cte_scope = cte_scope_of(select);
        for item in &select.select.items {
            match item {
                SelectItem::Expr { value, alias } => {
                    let name = alias
                        .as_ref()
                        .map(|a| a.text.clone())
                        .unwrap_or_else(|| default_alias(value));
                    self.push(name, value.clone(), out, seen);
                }
                SelectItem::Wildcard { qualifier } => {
                    if self.upstream() {
                        if let Some(from) = &select.from {
                            self.expand_wildcard(qualifier.as_ref(), from, &cte_scope, out, seen);
                        }
                    }
                }
            }
        }
    }

    fn expand_wildcard(
        &self,
        qualifier: Option<&IdentifierString>,
        from: &FromClause,
        cte_scope: &HashMap<String, &CommonTable>,
        out: &mut Vec<SelectableColumn>,
        seen: &mut HashSet<String>,
    ) {
        let mut sources = vec![&from.primary];
        sources.extend(from.joins.iter().map(|j| &j.source));
        for source in sources {
            if let Some(q) = qualifier {
                if source.effective_name().map(|n| n.matches(&q.text)) != Some(true) {
                    continue;
                }
            }
            self.expand_source(source, cte_scope, out, seen);
        }
    }

    fn expand_source(
        &self,
        source: &SourceExpression,
        cte_scope: &HashMap<String, &CommonTable>,
        out: &mut Vec<SelectableColumn>,
        seen: &mut HashSet<String>,
    ) {
        let alias = source.effective_name().map(|n| n.text.clone());
        match &source.data_source {
            DataSource::TableSource(name) => {
                if name.namespaces.is_empty() {
                    if let Some(cte) = cte_scope.get(&name.name.text.to_ascii_lowercase()) {
                        self.collect_query(&cte.query, out, seen);
                        return;
                    }
                }
                if let Some(resolver) = self.resolver {
                    if let Some(columns) = resolver(&name.name.text) {
                        for column in columns {
                            let value = Expr::new(ExprKind::ColumnReference(QualifiedName {
                                namespaces: alias
                                    .clone()
                                    .map(|a| vec![IdentifierString::new(a)])
                                    .unwrap_or_default(),
                                name: IdentifierString::new(column.clone()),
                            }));
                            self.push(column, value, out, seen);
                        }
                    }
                }
            }
            DataSource::SubQuerySource(query) => self.collect_query(query, out, seen),
            DataSource::ParenSource(inner) => self.expand_source(inner, cte_scope, out, seen),
            DataSource::FunctionSource(_) | DataSource::ValuesQuery(_) => {}
        }
    }

    fn push(&self, alias: String, value: Expr, out: &mut Vec<SelectableColumn>, seen: &mut HashSet<String>) {
        let key = self.dedup_key(&alias, &value);
        if seen.insert(key) {
            out.push(SelectableColumn { alias, value });
        }
    }

    fn dedup_key(&self, alias: &str, value: &Expr) -> String {
        match self.dedup {
            DedupMode::ColumnNameOnly {
                normalize_underscores,
            } => {
                let key = alias.to_ascii_lowercase();
                if normalize_underscores {
                    key.replace('_', "")
                } else {
                    key
                }
            }
            DedupMode::FullName => {
                if let ExprKind::ColumnReference(name) = &value.kind {
                    if let Some(namespace) = name.first_namespace() {
                        return format!(
                            "{}.{}",
                            namespace.to_ascii_lowercase(),
                            name.name.text.to_ascii_lowercase()
                        );
                    }
                }
                alias.to_ascii_lowercase()
            }
        }
    }
}

fn default_alias(value: &Expr) -> String {
    match &value.kind {
        ExprKind::ColumnReference(name) => name.name.text.clone(),
        _ => String::new(),
    }
}

fn cte_scope_of(select: &SimpleSelect) -> HashMap<String, &CommonTable> {
    select
        .with
        .as_ref()
        .map(|with| {
            with.tables
                .iter()
                .map(|t| (t.name.text.to_ascii_lowercase(), t))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::IdentifierDialect;
    use crate::parser::parse;

    #[test]
    fn collects_aliased_items() {
        let q = parse("SELECT a AS x, b FROM t", IdentifierDialect::Postgres).unwrap();
        let cols = SelectableColumnCollector::new(DedupMode::ColumnNameOnly {
            normalize_underscores: false,
        })
        .collect(&q);
        let names: Vec<_> = cols.iter().map(|c| c.alias.clone()).collect();
        assert_eq!(names, vec!["x", "b"]);
    }

    #[test]
    fn dedups_by_column_name() {
        let q = parse("SELECT a, a FROM t", IdentifierDialect::Postgres).unwrap();
        let cols = SelectableColumnCollector::new(DedupMode::ColumnNameOnly {
            normalize_underscores: false,
        })
        .collect(&q);
        assert_eq!(cols.len(), 1);
    }

    #[test]
    fn upstream_expands_wildcard_via_resolver() {
        let q = parse("SELECT * FROM users u", IdentifierDialect::Postgres).unwrap();
        let resolver = |table: &str| -> Option<Vec<String>> {
            if table == "users" {
                Some(vec!["id".to_string(), "name".to_string()])
            } else {
                None
            }
        };
        let cols = SelectableColumnCollector::new(DedupMode::ColumnNameOnly {
            normalize_underscores: false,
        })
        .with_upstream_resolver(&resolver)
        .collect(&q);
        let names: Vec<_> = cols.iter().map(|c| c.alias.clone()).collect();
        assert_eq!(names, vec!["id", "name"]);
    }

    #[test]
    fn upstream_recurses_into_cte_body() {
        let q = parse(
            "WITH a AS (SELECT 1 AS x, 2 AS y) SELECT * FROM a",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        let resolver = |_: &str| -> Option<Vec<String>> { None };
        let cols = SelectableColumnCollector::new(DedupMode::ColumnNameOnly {
            normalize_underscores: false,
        })
        .with_upstream_resolver(&resolver)
        .collect(&q);
        let names: Vec<_> = cols.iter().map(|c| c.alias.clone()).collect();
        assert_eq!(names, vec!["x", "y"]);
    }
}
