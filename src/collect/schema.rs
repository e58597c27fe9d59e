//! Schema collector (§4.3): derives a `{tableName -> [columnNames]}` map
//! from the AST by resolving qualified column references against their
//! source aliases. Two entry points mirror §7's taxonomy: [`collect`]
//! (strict — errors on anything unresolvable) and [`analyze`] (tolerant —
//! keeps going and records the trouble spots).

use std::collections::{HashMap, HashSet};

use crate::ast::{
    DataSource, Expr, ExprKind, FromClause, IdentifierString, Query, QualifiedName, SelectItem,
    SimpleSelect, SourceExpression,
};
use crate::error::{Error, Reason};

/// `tableName -> [columnNames]`, built up as references are resolved.
#[derive(Debug, Clone, Default)]
pub struct SchemaMap(pub HashMap<String, Vec<String>>);

impl SchemaMap {
    fn record(&mut self, table: &str, column: &str) {
        let entry = self.0.entry(table.to_string()).or_default();
        if !entry.iter().any(|c| c == column) {
            entry.push(column.to_string());
        }
    }
}

/// Result of the tolerant `analyze` entry point: the schema built so far,
/// plus every column/wildcard reference that couldn't be resolved.
#[derive(Debug, Clone, Default)]
pub struct SchemaAnalysis {
    pub schema: SchemaMap,
    pub unresolved: Vec<String>,
}

/// Expands a wildcard's real columns, supplied by the caller (§4.3
/// "expands wildcards only when a resolver is supplied").
pub type TableColumnResolver<'a> = dyn Fn(&str) -> Option<Vec<IdentifierString>> + 'a;

pub struct SchemaCollector<'a> {
    resolver: Option<&'a TableColumnResolver<'a>>,
}

/// One FROM-clause scope: alias/table-name (case-insensitive) -> real table
/// name, innermost scope last.
type Scope = HashMap<String, String>;

impl<'a> SchemaCollector<'a> {
    pub fn new() -> Self {
        SchemaCollector { resolver: None }
    }

    pub fn with_resolver(resolver: &'a TableColumnResolver<'a>) -> Self {
        SchemaCollector {
            resolver: Some(resolver),
        }
    }

    /// Strict mode (§7 "name resolution"): the first unresolvable reference
    /// aborts the whole collection.
    pub fn collect(&self, query: &Query) -> Result<SchemaMap, Error> {
        let mut schema = SchemaMap::default();
        let mut scopes = Vec::new();
        self.walk_query(query, &mut scopes, &mut schema, &mut None)?;
        Ok(schema)
    }

    /// Tolerant mode: keeps going past unresolvable references, recording
    /// each one instead of failing the call.
    pub fn analyze(&self, query: &Query) -> SchemaAnalysis {
        let mut schema = SchemaMap::default();
        let mut unresolved = Vec::new();
        let mut scopes = Vec::new();
        // `walk_query` can only fail in strict mode (its `Option` sink is
        // `None`); tolerant mode always threads a `Some` sink and ignores
        // the `Result`, which is always `Ok` in that configuration.
        let _ = self.walk_query(query, &mut scopes, &mut schema, &mut Some(&mut unresolved));
        SchemaAnalysis { schema, unresolved }
    }

    fn walk_query(
        &self,
        query: &Query,
        scopes: &mut Vec<Scope>,
        schema: &mut SchemaMap,
        unresolved: &mut Option<&mut Vec<String>>,
    ) -> Result<(), Error> {
        match query {
            Query::SimpleSelect(select) => self.walk_select(select, scopes, schema, unresolved),
            Query::BinarySelect(binary) => {
                self.walk_query(&binary.left, scopes, schema, unresolved)?;
                self.walk_query(&binary.right, scopes, schema, unresolved)
            }
            _ => Ok(()),
        }
    }

    fn walk_select(
        &self,
        select: &SimpleSelect,
        scopes: &mut Vec<Scope>,
        schema: &mut SchemaMap,
        unresolved: &mut Option<&mut Vec<String>>,
    ) -> Result<(), Error> {
        if let Some(with) = &select.with {
            for cte in &with.tables {
                self.walk_query(&cte.query, scopes, schema, unresolved)?;
            }
        }

        let mut scope = Scope::new();
        if let Some(from) = &select.from {
            populate_scope(&from.primary, &mut scope);
            for join in &from.joins {
                populate_scope(&join.source, &mut scope);
            }
        }
        scopes.push(scope);

        if let Some(from) = &select.from {
            self.walk_sources(from, scopes, schema, unresolved)?;
        }

        for item in &select.select.items {
            match item {
                SelectItem::Expr { value, .. } => {
                    self.walk_expr(value, scopes, schema, unresolved)?;
                }
                SelectItem::Wildcard { qualifier } => {
                    self.resolve_wildcard(qualifier.as_ref(), scopes, schema, unresolved)?;
                }
            }
        }
        if let Some(w) = &select.r#where {
            self.walk_expr(&w.condition, scopes, schema, unresolved)?;
        }
        if let Some(h) = &select.having {
            self.walk_expr(&h.condition, scopes, schema, unresolved)?;
        }
        if let Some(g) = &select.group_by {
            for item in &g.items {
                self.walk_expr(item, scopes, schema, unresolved)?;
            }
        }

        scopes.pop();
        Ok(())
    }

    fn walk_sources(
        &self,
        from: &FromClause,
        scopes: &mut Vec<Scope>,
        schema: &mut SchemaMap,
        unresolved: &mut Option<&mut Vec<String>>,
    ) -> Result<(), Error> {
        self.walk_source(&from.primary, scopes, schema, unresolved)?;
        for join in &from.joins {
            self.walk_source(&join.source, scopes, schema, unresolved)?;
            if let crate::ast::JoinCondition::On(expr) = &join.condition {
                self.walk_expr(expr, scopes, schema, unresolved)?;
            }
        }
        Ok(())
    }

    fn walk_source(
        &self,
        source: &SourceExpression,
        scopes: &mut Vec<Scope>,
        schema: &mut SchemaMap,
        unresolved: &mut Option<&mut Vec<String>>,
    ) -> Result<(), Error> {
        match &source.data_source {
            DataSource::SubQuerySource(query) => self.walk_query(query, scopes, schema, unresolved),
            DataSource::ParenSource(inner) => self.walk_source(inner, scopes, schema, unresolved),
            _ => Ok(()),
        }
    }

    fn walk_expr(
        &self,
        expr: &Expr,
        scopes: &[Scope],
        schema: &mut SchemaMap,
        unresolved: &mut Option<&mut Vec<String>>,
    ) -> Result<(), Error> {
        match &expr.kind {
            ExprKind::ColumnReference(name) => self.resolve_column(name, scopes, schema, unresolved),
            ExprKind::Binary { left, right, .. } => {
                self.walk_expr(left, scopes, schema, unresolved)?;
                self.walk_expr(right, scopes, schema, unresolved)
            }
            ExprKind::Unary { expr, .. } => self.walk_expr(expr, scopes, schema, unresolved),
            ExprKind::FunctionCall(call) => {
                for arg in &call.args {
                    self.walk_expr(arg, scopes, schema, unresolved)?;
                }
                Ok(())
            }
            ExprKind::Case(case) => {
                if let Some(operand) = &case.operand {
                    self.walk_expr(operand, scopes, schema, unresolved)?;
                }
                for (when, then) in &case.when_clauses {
                    self.walk_expr(when, scopes, schema, unresolved)?;
                    self.walk_expr(then, scopes, schema, unresolved)?;
                }
                if let Some(else_) = &case.else_clause {
                    self.walk_expr(else_, scopes, schema, unresolved)?;
                }
                Ok(())
            }
            ExprKind::Cast(cast) => self.walk_expr(&cast.expr, scopes, schema, unresolved),
            ExprKind::Between(between) => {
                self.walk_expr(&between.expr, scopes, schema, unresolved)?;
                self.walk_expr(&between.low, scopes, schema, unresolved)?;
                self.walk_expr(&between.high, scopes, schema, unresolved)
            }
            ExprKind::InlineQuery(query) | ExprKind::ArrayQuery(query) => {
                let mut nested = scopes.to_vec();
                self.walk_query(query, &mut nested, schema, unresolved)
            }
            ExprKind::Exists { query, .. } => {
                let mut nested = scopes.to_vec();
                self.walk_query(query, &mut nested, schema, unresolved)
            }
            ExprKind::Array(items) | ExprKind::ValueList(items) | ExprKind::Tuple(items) => {
                for item in items {
                    self.walk_expr(item, scopes, schema, unresolved)?;
                }
                Ok(())
            }
            ExprKind::Paren(inner) => self.walk_expr(inner, scopes, schema, unresolved),
            _ => Ok(()),
        }
    }

    fn resolve_column(
        &self,
        name: &QualifiedName,
        scopes: &[Scope],
        schema: &mut SchemaMap,
        unresolved: &mut Option<&mut Vec<String>>,
    ) -> Result<(), Error> {
        if let Some(alias) = name.first_namespace() {
            if let Some(table) = find_in_scopes(scopes, alias) {
                schema.record(&table, &name.name.text);
                return Ok(());
            }
            return self.fail(
                format!("{}.{}", alias, name.name.text),
                Error::not_found("source", alias),
                unresolved,
            );
        }
        // Unqualified: resolvable only when exactly one source is in scope.
        if let Some(innermost) = scopes.last() {
            let mut tables: Vec<&String> = innermost.values().collect();
            tables.sort();
            tables.dedup();
            if tables.len() == 1 {
                schema.record(tables[0], &name.name.text);
                return Ok(());
            }
        }
        self.fail(
            name.name.text.clone(),
            Error::new(Reason::Simple(format!(
                "ambiguous or unresolvable unqualified column `{}`",
                name.name.text
            ))),
            unresolved,
        )
    }

    fn resolve_wildcard(
        &self,
        qualifier: Option<&IdentifierString>,
        scopes: &[Scope],
        schema: &mut SchemaMap,
        unresolved: &mut Option<&mut Vec<String>>,
    ) -> Result<(), Error> {
        let Some(innermost) = scopes.last() else {
            return Ok(());
        };
        let target_tables: HashSet<String> = match qualifier {
            Some(q) => find_in_scopes(std::slice::from_ref(innermost), &q.text)
                .into_iter()
                .collect(),
            None => innermost.values().cloned().collect(),
        };
        if target_tables.is_empty() {
            let label = qualifier
                .map(|q| format!("{}.*", q.text))
                .unwrap_or_else(|| "*".to_string());
            return self.fail(
                label,
                Error::new(Reason::Simple("wildcard source not found".to_string())),
                unresolved,
            );
        }
        for table in target_tables {
            match self.resolver.and_then(|r| r(&table)) {
                Some(columns) => {
                    for column in columns {
                        schema.record(&table, &column.text);
                    }
                }
                None => {
                    let label = format!("{}.*", table);
                    self.fail(
                        label,
                        Error::new(Reason::Simple(format!(
                            "no resolver supplied to expand wildcard over `{table}`"
                        ))),
                        unresolved,
                    )?;
                }
            }
        }
        Ok(())
    }

    fn fail(
        &self,
        label: String,
        error: Error,
        unresolved: &mut Option<&mut Vec<String>>,
    ) -> Result<(), Error> {
        match unresolved {
            Some(list) => {
                list.push(label);
                Ok(())
            }
            None => Err(error),
        }
    }
}

impl<'a> Default for SchemaCollector<'a> {
    fn default() -> Self {
        Self::new()
    }
}

fn populate_scope(source: &SourceExpression, scope: &mut Scope) {
    if let Some(name) = source.effective_name() {
        let table = match &source.data_source {
            DataSource::TableSource(qn) => qn.name.text.clone(),
            _ => name.text.clone(),
        };
        scope.insert(name.text.to_ascii_lowercase(), table);
    }
}

fn find_in_scopes(scopes: &[Scope], alias: &str) -> Option<String> {
    let key = alias.to_ascii_lowercase();
    scopes.iter().rev().find_map(|s| s.get(&key).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::IdentifierDialect;
    use crate::parser::parse;

    #[test]
    fn strict_collect_resolves_qualified_columns() {
        let q = parse(
            "SELECT u.id, u.name FROM users u",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        let schema = SchemaCollector::new().collect(&q).unwrap();
        let mut cols = schema.0.get("users").unwrap().clone();
        cols.sort();
        assert_eq!(cols, vec!["id".to_string(), "name".to_string()]);
    }

    #[test]
    fn strict_collect_errors_on_unqualified_ambiguity() {
        let q = parse(
            "SELECT id FROM users u JOIN profiles p ON p.user_id = u.id",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        assert!(SchemaCollector::new().collect(&q).is_err());
    }

    #[test]
    fn analyze_collects_unresolved_instead_of_failing() {
        let q = parse(
            "SELECT id FROM users u JOIN profiles p ON p.user_id = u.id",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        let result = SchemaCollector::new().analyze(&q);
        assert!(!result.unresolved.is_empty());
    }

    #[test]
    fn resolves_unqualified_column_with_single_source() {
        let q = parse("SELECT id FROM users", IdentifierDialect::Postgres).unwrap();
        let schema = SchemaCollector::new().collect(&q).unwrap();
        assert_eq!(schema.0.get("users").unwrap(), &vec!["id".to_string()]);
    }
}
