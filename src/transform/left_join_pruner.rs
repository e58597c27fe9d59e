//! Unused-LEFT-JOIN pruner (§4.4.1): drops a LEFT JOIN to a table source when
//! nothing outside its own `ON` clause needs it and the joined column is
//! known to be a singleton unique key, so pruning it cannot change row
//! counts.

use crate::ast::fold::Visitor;
use crate::ast::{
    BinaryOperator, Expr, ExprKind, FromClause, IdentifierString, InsertSource, JoinClause,
    JoinCondition, JoinKind, NodeId, Query, QualifiedName, SimpleSelect, SourceExpression,
    WithClause,
};
use crate::transform::schema_meta::SchemaMetadata;

/// Prunes every LEFT JOIN reachable from `query` that §4.4.1's five
/// conditions allow removing, recursing into CTE bodies, subqueries and
/// DML FROM/USING sources, and cascading each query scope to a fixed point.
pub fn prune_unused_left_joins(query: &mut Query, schema: &SchemaMetadata) {
    prune_query(query, schema);
}

fn prune_query(query: &mut Query, schema: &SchemaMetadata) {
    match query {
        Query::SimpleSelect(select) => prune_select(select, schema),
        Query::BinarySelect(binary) => {
            if let Some(with) = &mut binary.with {
                prune_with_clause(with, schema);
            }
            prune_query(&mut binary.left, schema);
            prune_query(&mut binary.right, schema);
        }
        Query::Insert(insert) => {
            if let Some(with) = &mut insert.with {
                prune_with_clause(with, schema);
            }
            if let InsertSource::Select(q) = &mut insert.source {
                prune_query(q, schema);
            }
        }
        Query::Update(update) => {
            if let Some(with) = &mut update.with {
                prune_with_clause(with, schema);
            }
            prune_source(&mut update.table, schema);
            if let Some(from) = &mut update.from {
                prune_from_sources(from, schema);
            }
        }
        Query::Delete(delete) => {
            if let Some(with) = &mut delete.with {
                prune_with_clause(with, schema);
            }
            prune_source(&mut delete.table, schema);
            if let Some(using) = &mut delete.using {
                prune_from_sources(using, schema);
            }
        }
        Query::Merge(merge) => {
            if let Some(with) = &mut merge.with {
                prune_with_clause(with, schema);
            }
            prune_source(&mut merge.target, schema);
            prune_source(&mut merge.source, schema);
        }
        Query::Explain(explain) => prune_query(&mut explain.statement, schema),
        Query::ValuesQuery(_)
        | Query::CreateTable(_)
        | Query::CreateIndex(_)
        | Query::AlterTable(_)
        | Query::DropTable(_)
        | Query::DropIndex(_) => {}
    }
}

fn prune_with_clause(with: &mut WithClause, schema: &SchemaMetadata) {
    for cte in &mut with.tables {
        prune_query(&mut cte.query, schema);
    }
}

fn prune_from_sources(from: &mut FromClause, schema: &SchemaMetadata) {
    prune_source(&mut from.primary, schema);
    for join in &mut from.joins {
        prune_source(&mut join.source, schema);
    }
}

fn prune_source(source: &mut SourceExpression, schema: &SchemaMetadata) {
    use crate::ast::DataSource;
    match &mut source.data_source {
        DataSource::SubQuerySource(q) => prune_query(q, schema),
        DataSource::ParenSource(inner) => prune_source(inner, schema),
        DataSource::TableSource(_) | DataSource::FunctionSource(_) | DataSource::ValuesQuery(_) => {}
    }
}

fn prune_select(select: &mut SimpleSelect, schema: &SchemaMetadata) {
    if let Some(with) = &mut select.with {
        prune_with_clause(with, schema);
    }
    if let Some(from) = &mut select.from {
        prune_from_sources(from, schema);
    }
    for expr in select_exprs_mut(select) {
        prune_expr(expr, schema);
    }

    loop {
        let joins_empty = select.from.as_ref().map(|f| f.joins.is_empty()).unwrap_or(true);
        if joins_empty {
            break;
        }
        let all_refs = column_refs_of_select(select);
        let removable: Vec<usize> = select
            .from
            .as_ref()
            .unwrap()
            .joins
            .iter()
            .enumerate()
            .filter(|(_, join)| is_removable(join, schema, &all_refs))
            .map(|(idx, _)| idx)
            .collect();
        if removable.is_empty() {
            break;
        }
        let from = select.from.as_mut().unwrap();
        for idx in removable.into_iter().rev() {
            from.joins.remove(idx);
        }
    }
}

/// Every expression slot on a `SimpleSelect` outside its `FROM` clause,
/// mutable — the places a nested scalar subquery with its own LEFT JOINs
/// could hide.
fn select_exprs_mut(select: &mut SimpleSelect) -> Vec<&mut Expr> {
    let mut out = Vec::new();
    for item in &mut select.select.items {
        if let crate::ast::SelectItem::Expr { value, .. } = item {
            out.push(value);
        }
    }
    if let Some(w) = &mut select.r#where {
        out.push(&mut w.condition);
    }
    if let Some(h) = &mut select.having {
        out.push(&mut h.condition);
    }
    if let Some(g) = &mut select.group_by {
        out.extend(g.items.iter_mut());
    }
    if let Some(o) = &mut select.order_by {
        out.extend(o.items.iter_mut().map(|item| &mut item.value));
    }
    out
}

fn prune_expr(expr: &mut Expr, schema: &SchemaMetadata) {
    match &mut expr.kind {
        ExprKind::Binary { left, right, .. } => {
            prune_expr(left, schema);
            prune_expr(right, schema);
        }
        ExprKind::Unary { expr, .. } => prune_expr(expr, schema),
        ExprKind::FunctionCall(call) => {
            for arg in &mut call.args {
                prune_expr(arg, schema);
            }
        }
        ExprKind::Case(case) => {
            if let Some(operand) = &mut case.operand {
                prune_expr(operand, schema);
            }
            for (when, then) in &mut case.when_clauses {
                prune_expr(when, schema);
                prune_expr(then, schema);
            }
            if let Some(else_) = &mut case.else_clause {
                prune_expr(else_, schema);
            }
        }
        ExprKind::Cast(cast) => prune_expr(&mut cast.expr, schema),
        ExprKind::Between(between) => {
            prune_expr(&mut between.expr, schema);
            prune_expr(&mut between.low, schema);
            prune_expr(&mut between.high, schema);
        }
        ExprKind::InlineQuery(q) | ExprKind::ArrayQuery(q) => prune_query(q, schema),
        ExprKind::Exists { query, .. } => prune_query(query, schema),
        ExprKind::Array(items) | ExprKind::ValueList(items) | ExprKind::Tuple(items) => {
            for item in items {
                prune_expr(item, schema);
            }
        }
        ExprKind::Paren(inner) => prune_expr(inner, schema),
        _ => {}
    }
}

struct ColumnRefCollector {
    visited: std::collections::HashSet<NodeId>,
    found: Vec<QualifiedName>,
}

impl Visitor for ColumnRefCollector {
    fn visited(&mut self) -> &mut std::collections::HashSet<NodeId> {
        &mut self.visited
    }

    fn visit_column_reference(&mut self, expr: &Expr) {
        if let ExprKind::ColumnReference(name) = &expr.kind {
            self.found.push(name.clone());
        }
    }
}

fn column_refs_in_expr(expr: &Expr) -> Vec<QualifiedName> {
    let mut collector = ColumnRefCollector {
        visited: std::collections::HashSet::new(),
        found: Vec::new(),
    };
    collector.visit_expr(expr);
    collector.found
}

fn column_refs_of_select(select: &SimpleSelect) -> Vec<QualifiedName> {
    crate::collect::collect_column_references(&Query::SimpleSelect(select.clone()))
        .into_iter()
        .filter_map(|e| match e.kind {
            ExprKind::ColumnReference(name) => Some(name),
            _ => None,
        })
        .collect()
}

fn qualifier_matches(qn: &QualifiedName, alias: &IdentifierString, table_name: &str) -> bool {
    match qn.first_namespace() {
        Some(ns) => alias.matches(ns) || ns.eq_ignore_ascii_case(table_name),
        None => false,
    }
}

fn is_removable(join: &JoinClause, schema: &SchemaMetadata, all_refs: &[QualifiedName]) -> bool {
    // (a) LEFT, non-lateral, table source.
    if join.kind != JoinKind::Left || join.lateral {
        return false;
    }
    let table_name = match join.source.data_source.as_table_source() {
        Some(qn) => qn.name.text.clone(),
        None => return false,
    };
    let alias = match join.source.effective_name() {
        Some(a) => a.clone(),
        None => return false,
    };

    // (c) ON clause is a single equality with exactly one side on the
    // joined table.
    let on_expr = match &join.condition {
        JoinCondition::On(expr) => expr,
        _ => return false,
    };
    let (op, left, right) = match &on_expr.kind {
        ExprKind::Binary { op, left, right } => (op, left, right),
        _ => return false,
    };
    if *op != BinaryOperator::Eq {
        return false;
    }
    let left_qn = match &left.kind {
        ExprKind::ColumnReference(qn) => qn,
        _ => return false,
    };
    let right_qn = match &right.kind {
        ExprKind::ColumnReference(qn) => qn,
        _ => return false,
    };
    let left_is_joined = qualifier_matches(left_qn, &alias, &table_name);
    let right_is_joined = qualifier_matches(right_qn, &alias, &table_name);
    if left_is_joined == right_is_joined {
        return false;
    }
    let joined_column = if left_is_joined {
        &left_qn.name.text
    } else {
        &right_qn.name.text
    };

    // (d) joined column is a singleton unique key per schema metadata.
    let table_schema = match schema.get(&table_name) {
        Some(t) => t,
        None => return false,
    };
    let is_singleton_unique = table_schema
        .unique_keys
        .iter()
        .any(|key| key.len() == 1 && key[0].eq_ignore_ascii_case(joined_column));
    if !is_singleton_unique {
        return false;
    }

    // (b) no reference outside this JOIN's own ON clause touches the
    // joined side.
    let on_refs = column_refs_in_expr(on_expr);
    let total = all_refs
        .iter()
        .filter(|qn| qualifier_matches(qn, &alias, &table_name))
        .count();
    let internal = on_refs
        .iter()
        .filter(|qn| qualifier_matches(qn, &alias, &table_name))
        .count();
    if total > internal {
        return false;
    }

    // (e) the joined column name must not collide with an unqualified
    // reference anywhere in the query.
    let collides = all_refs
        .iter()
        .any(|qn| qn.namespaces.is_empty() && qn.name.text.eq_ignore_ascii_case(joined_column));
    !collides
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::IdentifierDialect;
    use crate::parser::parse;
    use crate::transform::schema_meta::TableSchema;

    fn schema_with_unique(table: &str, column: &str) -> SchemaMetadata {
        SchemaMetadata::new().with_table(
            table,
            TableSchema {
                columns: vec![column.to_string()],
                unique_keys: vec![vec![column.to_string()]],
            },
        )
    }

    #[test]
    fn prunes_unused_left_join_on_singleton_unique_key() {
        let mut q = parse(
            "SELECT u.id FROM users u LEFT JOIN profiles p ON p.user_id = u.id",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        let schema = schema_with_unique("profiles", "user_id");
        prune_unused_left_joins(&mut q, &schema);
        let select = q.as_simple_select().unwrap();
        assert!(select.from.as_ref().unwrap().joins.is_empty());
    }

    #[test]
    fn keeps_join_whose_column_is_selected() {
        let mut q = parse(
            "SELECT u.id, p.bio FROM users u LEFT JOIN profiles p ON p.user_id = u.id",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        let schema = schema_with_unique("profiles", "user_id");
        prune_unused_left_joins(&mut q, &schema);
        let select = q.as_simple_select().unwrap();
        assert_eq!(select.from.as_ref().unwrap().joins.len(), 1);
    }

    #[test]
    fn keeps_join_without_schema_metadata() {
        let mut q = parse(
            "SELECT u.id FROM users u LEFT JOIN profiles p ON p.user_id = u.id",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        let schema = SchemaMetadata::new();
        prune_unused_left_joins(&mut q, &schema);
        let select = q.as_simple_select().unwrap();
        assert_eq!(select.from.as_ref().unwrap().joins.len(), 1);
    }

    #[test]
    fn keeps_inner_join_even_when_unused() {
        let mut q = parse(
            "SELECT u.id FROM users u JOIN profiles p ON p.user_id = u.id",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        let schema = schema_with_unique("profiles", "user_id");
        prune_unused_left_joins(&mut q, &schema);
        let select = q.as_simple_select().unwrap();
        assert_eq!(select.from.as_ref().unwrap().joins.len(), 1);
    }
}
