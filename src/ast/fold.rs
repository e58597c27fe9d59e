//! The visitor protocol (§4.1): every node family can be walked by a
//! `Visitor`, which carries a `visited` set so that re-entering a node is a
//! no-op (§3.2 "visitor safety").
//!
//! Following the Design Notes ("prefer discriminated dispatch keyed by the
//! node's tag over virtual methods"), there is no `accept`-per-node-type
//! trait object hierarchy. Instead — exactly like the teacher's `AstFold`
//! (`ast/ast_fold.rs`) — one trait provides a default, recursive walk for
//! every node kind, and a collector overrides only the hooks it cares
//! about. The default bodies are free functions (`walk_*`) so an override
//! can still delegate to the default traversal for a node's children.

use std::collections::HashSet;

use super::clause::{
    FromClause, GroupByClause, HavingClause, OrderByClause, SelectItem, WhereClause, WithClause,
};
use super::expr::{CaseExpression, Expr, ExprKind, FunctionCall, OrderByItem, WindowFrameExpression};
use super::query::{BinarySelect, Delete, Insert, InsertSource, Merge, MergeAction, Query, SimpleSelect, Update};
use super::source::{DataSource, JoinClause, JoinCondition, SourceExpression};
use super::support::NodeId;

/// Read-only tree walk. Implementors only need `visited()`; every other
/// method has a default body that recurses through the node's children.
pub trait Visitor {
    fn visited(&mut self) -> &mut HashSet<NodeId>;

    /// Returns `true` the first time a given id is seen during this
    /// traversal. Every `visit_*`/`walk_*` entry point calls this before
    /// recursing (§3.2).
    fn enter(&mut self, id: NodeId) -> bool {
        self.visited().insert(id)
    }

    fn visit_query(&mut self, query: &Query) {
        walk_query(self, query)
    }

    fn visit_simple_select(&mut self, select: &SimpleSelect) {
        walk_simple_select(self, select)
    }

    fn visit_binary_select(&mut self, select: &BinarySelect) {
        walk_binary_select(self, select)
    }

    fn visit_insert(&mut self, insert: &Insert) {
        walk_insert(self, insert)
    }

    fn visit_update(&mut self, update: &Update) {
        walk_update(self, update)
    }

    fn visit_delete(&mut self, delete: &Delete) {
        walk_delete(self, delete)
    }

    fn visit_merge(&mut self, merge: &Merge) {
        walk_merge(self, merge)
    }

    fn visit_with_clause(&mut self, with: &WithClause) {
        walk_with_clause(self, with)
    }

    fn visit_from_clause(&mut self, from: &FromClause) {
        walk_from_clause(self, from)
    }

    fn visit_join_clause(&mut self, join: &JoinClause) {
        walk_join_clause(self, join)
    }

    fn visit_source_expression(&mut self, source: &SourceExpression) {
        walk_source_expression(self, source)
    }

    fn visit_where_clause(&mut self, clause: &WhereClause) {
        self.visit_expr(&clause.condition)
    }

    fn visit_group_by_clause(&mut self, clause: &GroupByClause) {
        for item in &clause.items {
            self.visit_expr(item);
        }
    }

    fn visit_having_clause(&mut self, clause: &HavingClause) {
        self.visit_expr(&clause.condition)
    }

    fn visit_order_by_clause(&mut self, clause: &OrderByClause) {
        for item in &clause.items {
            self.visit_order_by_item(item);
        }
    }

    fn visit_order_by_item(&mut self, item: &OrderByItem) {
        self.visit_expr(&item.value);
    }

    fn visit_select_item(&mut self, item: &SelectItem) {
        if let SelectItem::Expr { value, .. } = item {
            self.visit_expr(value);
        }
    }

    /// Called for every `ColumnReference` node instance (identity
    /// preserved, no dedup) — the hook the column-reference collector
    /// overrides (§4.3).
    fn visit_column_reference(&mut self, _expr: &Expr) {}

    fn visit_expr(&mut self, expr: &Expr) {
        if !self.enter(expr.id) {
            return;
        }
        if matches!(expr.kind, ExprKind::ColumnReference(_)) {
            self.visit_column_reference(expr);
        }
        walk_expr(self, expr)
    }
}

pub fn walk_query<V: Visitor + ?Sized>(visitor: &mut V, query: &Query) {
    if !visitor.enter(query.id()) {
        return;
    }
    match query {
        Query::SimpleSelect(q) => visitor.visit_simple_select(q),
        Query::BinarySelect(q) => visitor.visit_binary_select(q),
        Query::ValuesQuery(q) => {
            for row in &q.rows {
                for expr in row {
                    visitor.visit_expr(expr);
                }
            }
        }
        Query::Insert(q) => visitor.visit_insert(q),
        Query::Update(q) => visitor.visit_update(q),
        Query::Delete(q) => visitor.visit_delete(q),
        Query::Merge(q) => visitor.visit_merge(q),
        // DDL statements carry no value expressions worth folding over
        // except column defaults/checks and index predicates, which the
        // schema/DDL-diff machinery inspects directly rather than through
        // this generic walk.
        Query::CreateTable(_)
        | Query::CreateIndex(_)
        | Query::AlterTable(_)
        | Query::DropTable(_)
        | Query::DropIndex(_) => {}
        Query::Explain(q) => visitor.visit_query(&q.statement),
    }
}

pub fn walk_simple_select<V: Visitor + ?Sized>(visitor: &mut V, select: &SimpleSelect) {
    if let Some(with) = &select.with {
        visitor.visit_with_clause(with);
    }
    for item in &select.select.items {
        visitor.visit_select_item(item);
    }
    if let Some(from) = &select.from {
        visitor.visit_from_clause(from);
    }
    if let Some(w) = &select.r#where {
        visitor.visit_where_clause(w);
    }
    if let Some(g) = &select.group_by {
        visitor.visit_group_by_clause(g);
    }
    if let Some(h) = &select.having {
        visitor.visit_having_clause(h);
    }
    if let Some(windows) = &select.windows {
        for (_, w) in &windows.windows {
            visit_window(visitor, w);
        }
    }
    if let Some(o) = &select.order_by {
        visitor.visit_order_by_clause(o);
    }
    if let Some(l) = &select.limit {
        visitor.visit_expr(&l.value);
    }
    if let Some(o) = &select.offset {
        visitor.visit_expr(&o.value);
    }
    if let Some(f) = &select.fetch {
        visitor.visit_expr(&f.value);
    }
    if let Some(r) = &select.returning {
        for item in &r.items {
            visitor.visit_select_item(item);
        }
    }
}

pub fn walk_binary_select<V: Visitor + ?Sized>(visitor: &mut V, select: &BinarySelect) {
    if let Some(with) = &select.with {
        visitor.visit_with_clause(with);
    }
    visitor.visit_query(&select.left);
    visitor.visit_query(&select.right);
    if let Some(o) = &select.order_by {
        visitor.visit_order_by_clause(o);
    }
}

pub fn walk_insert<V: Visitor + ?Sized>(visitor: &mut V, insert: &Insert) {
    if let Some(with) = &insert.with {
        visitor.visit_with_clause(with);
    }
    match &insert.source {
        InsertSource::Values(values) => {
            for row in &values.rows {
                for expr in row {
                    visitor.visit_expr(expr);
                }
            }
        }
        InsertSource::Select(query) => visitor.visit_query(query),
        InsertSource::DefaultValues => {}
    }
    if let Some(r) = &insert.returning {
        for item in &r.items {
            visitor.visit_select_item(item);
        }
    }
}

pub fn walk_update<V: Visitor + ?Sized>(visitor: &mut V, update: &Update) {
    if let Some(with) = &update.with {
        visitor.visit_with_clause(with);
    }
    visitor.visit_source_expression(&update.table);
    for (_, value) in &update.set.assignments {
        visitor.visit_expr(value);
    }
    if let Some(from) = &update.from {
        visitor.visit_from_clause(from);
    }
    if let Some(w) = &update.r#where {
        visitor.visit_where_clause(w);
    }
    if let Some(r) = &update.returning {
        for item in &r.items {
            visitor.visit_select_item(item);
        }
    }
}

pub fn walk_delete<V: Visitor + ?Sized>(visitor: &mut V, delete: &Delete) {
    if let Some(with) = &delete.with {
        visitor.visit_with_clause(with);
    }
    visitor.visit_source_expression(&delete.table);
    if let Some(using) = &delete.using {
        visitor.visit_from_clause(using);
    }
    if let Some(w) = &delete.r#where {
        visitor.visit_where_clause(w);
    }
    if let Some(r) = &delete.returning {
        for item in &r.items {
            visitor.visit_select_item(item);
        }
    }
}

pub fn walk_merge<V: Visitor + ?Sized>(visitor: &mut V, merge: &Merge) {
    if let Some(with) = &merge.with {
        visitor.visit_with_clause(with);
    }
    visitor.visit_source_expression(&merge.target);
    visitor.visit_source_expression(&merge.source);
    visitor.visit_expr(&merge.on);
    for when in &merge.when_clauses {
        if let Some(cond) = &when.condition {
            visitor.visit_expr(cond);
        }
        match &when.action {
            MergeAction::Insert { values, .. } => {
                for v in values {
                    visitor.visit_expr(v);
                }
            }
            MergeAction::Update(set) => {
                for (_, value) in &set.assignments {
                    visitor.visit_expr(value);
                }
            }
            MergeAction::Delete | MergeAction::DoNothing => {}
        }
    }
}

pub fn walk_with_clause<V: Visitor + ?Sized>(visitor: &mut V, with: &WithClause) {
    for table in &with.tables {
        if !visitor.enter(table.id) {
            continue;
        }
        visitor.visit_query(&table.query);
    }
}

pub fn walk_from_clause<V: Visitor + ?Sized>(visitor: &mut V, from: &FromClause) {
    visitor.visit_source_expression(&from.primary);
    for join in &from.joins {
        visitor.visit_join_clause(join);
    }
}

pub fn walk_join_clause<V: Visitor + ?Sized>(visitor: &mut V, join: &JoinClause) {
    visitor.visit_source_expression(&join.source);
    if let JoinCondition::On(expr) = &join.condition {
        visitor.visit_expr(expr);
    }
}

pub fn walk_source_expression<V: Visitor + ?Sized>(visitor: &mut V, source: &SourceExpression) {
    if !visitor.enter(source.id) {
        return;
    }
    match &source.data_source {
        DataSource::TableSource(_) => {}
        DataSource::SubQuerySource(query) => visitor.visit_query(query),
        DataSource::FunctionSource(call) => visit_function_call(visitor, call),
        DataSource::ParenSource(inner) => visitor.visit_source_expression(inner),
        DataSource::ValuesQuery(values) => {
            for row in &values.rows {
                for expr in row {
                    visitor.visit_expr(expr);
                }
            }
        }
    }
}

fn visit_function_call<V: Visitor + ?Sized>(visitor: &mut V, call: &FunctionCall) {
    for arg in &call.args {
        visitor.visit_expr(arg);
    }
    if let Some(over) = &call.over {
        visit_window(visitor, over);
    }
}

fn visit_window<V: Visitor + ?Sized>(visitor: &mut V, window: &WindowFrameExpression) {
    for p in &window.partition_by {
        visitor.visit_expr(p);
    }
    for o in &window.order_by {
        visitor.visit_order_by_item(o);
    }
}

fn visit_case<V: Visitor + ?Sized>(visitor: &mut V, case: &CaseExpression) {
    if let Some(operand) = &case.operand {
        visitor.visit_expr(operand);
    }
    for (when, then) in &case.when_clauses {
        visitor.visit_expr(when);
        visitor.visit_expr(then);
    }
    if let Some(else_) = &case.else_clause {
        visitor.visit_expr(else_);
    }
}

pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::ColumnReference(_)
        | ExprKind::Literal(_)
        | ExprKind::Parameter(_)
        | ExprKind::RawString(_)
        | ExprKind::IdentifierString(_)
        | ExprKind::QualifiedName(_) => {}
        ExprKind::Binary { left, right, .. } => {
            visitor.visit_expr(left);
            visitor.visit_expr(right);
        }
        ExprKind::Unary { expr, .. } => visitor.visit_expr(expr),
        ExprKind::FunctionCall(call) => visit_function_call(visitor, call),
        ExprKind::Case(case) => visit_case(visitor, case),
        ExprKind::Cast(cast) => visitor.visit_expr(&cast.expr),
        ExprKind::Between(between) => {
            visitor.visit_expr(&between.expr);
            visitor.visit_expr(&between.low);
            visitor.visit_expr(&between.high);
        }
        ExprKind::InlineQuery(query) | ExprKind::ArrayQuery(query) => visitor.visit_query(query),
        ExprKind::Exists { query, .. } => visitor.visit_query(query),
        ExprKind::Array(items) | ExprKind::ValueList(items) | ExprKind::Tuple(items) => {
            for item in items {
                visitor.visit_expr(item);
            }
        }
        ExprKind::WindowFrame(window) => visit_window(visitor, window),
        ExprKind::Paren(inner) => visitor.visit_expr(inner),
    }
}
