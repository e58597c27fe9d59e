//! DML-to-SELECT converter family (§4.4.6): given an `Insert`/`Update`/
//! `Delete`/`Merge`, produces a `SELECT` that returns the rows the DML would
//! affect, optionally shadowing real tables with caller-supplied fixture
//! data so the SELECT can run against a sandbox instead of the live schema.

use std::collections::HashSet;

use crate::ast::{
    BinarySelect, CommonTable, Delete, Expr, ExprKind, FromClause, FunctionCall, IdentifierString,
    Insert, InsertSource, JoinClause, JoinCondition, JoinKind, LiteralValue, Merge, MergeMatchType,
    MergeWhen, NodeId, Query, QualifiedName, RawString, ReturningClause, SelectItem, SetClause,
    SetOperator, SimpleSelect, SourceExpression, Update, ValuesQuery, WhereClause, WithClause,
};
use crate::ast::DataSource;
use crate::collect::TableSourceCollector;
use crate::error::{Error, Reason};

/// A synthetic table the caller supplies in place of a real one, so the
/// generated SELECT can be run in isolation (§4.4.6 "fixture shadowing").
#[derive(Debug, Clone)]
pub struct FixtureTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Expr>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingFixtureStrategy {
    Error,
    Skip,
}

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub fixture_tables: Vec<FixtureTable>,
    pub missing_fixture_strategy: MissingFixtureStrategy,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            fixture_tables: Vec::new(),
            missing_fixture_strategy: MissingFixtureStrategy::Error,
        }
    }
}

fn count_star_item() -> SelectItem {
    SelectItem::Expr {
        value: Expr::new(ExprKind::FunctionCall(FunctionCall {
            name: QualifiedName::unqualified("count"),
            distinct: false,
            args: vec![Expr::new(ExprKind::RawString(RawString {
                text: "*".to_string(),
            }))],
            over: None,
        })),
        alias: None,
    }
}

fn literal_one() -> SelectItem {
    SelectItem::Expr {
        value: Expr::new(ExprKind::Literal(LiteralValue::Number("1".to_string()))),
        alias: None,
    }
}

fn qualify_column(expr: &Expr, qualifier: &IdentifierString) -> Expr {
    match &expr.kind {
        ExprKind::ColumnReference(name) if name.namespaces.is_empty() => {
            Expr::new(ExprKind::ColumnReference(QualifiedName {
                namespaces: vec![qualifier.clone()],
                name: name.name.clone(),
            }))
        }
        _ => expr.clone(),
    }
}

fn bare_column_name(expr: &Expr) -> Option<IdentifierString> {
    match &expr.kind {
        ExprKind::ColumnReference(name) if name.namespaces.is_empty() => Some(name.name.clone()),
        _ => None,
    }
}

fn where_of(condition: Expr) -> WhereClause {
    WhereClause {
        id: NodeId::new(),
        comments: Default::default(),
        condition,
    }
}

fn and_exprs(left: Expr, right: Expr) -> Expr {
    Expr::new(ExprKind::Binary {
        op: crate::ast::BinaryOperator::And,
        left: Box::new(left),
        right: Box::new(right),
    })
}

fn and_opt(base: Option<Expr>, extra: Option<Expr>) -> Option<Expr> {
    match (base, extra) {
        (Some(b), Some(e)) => Some(and_exprs(b, e)),
        (Some(b), None) => Some(b),
        (None, Some(e)) => Some(e),
        (None, None) => None,
    }
}

fn from_of(primary: SourceExpression, joins: Vec<JoinClause>) -> FromClause {
    FromClause {
        id: NodeId::new(),
        comments: Default::default(),
        primary,
        joins,
    }
}

fn wrap_as_subquery(query: Query, alias: &str) -> SourceExpression {
    SourceExpression::new(DataSource::SubQuerySource(Box::new(query))).with_alias(alias)
}

fn wrap_count_over(query: Query, alias: &str) -> Query {
    let mut select = SimpleSelect::empty();
    select.select.items = vec![count_star_item()];
    select.from = Some(from_of(wrap_as_subquery(query, alias), Vec::new()));
    Query::SimpleSelect(select)
}

fn union_all_chain(mut queries: Vec<Query>) -> Query {
    let first = queries.remove(0);
    queries.into_iter().fold(first, |acc, next| {
        Query::BinarySelect(BinarySelect {
            id: NodeId::new(),
            comments: Default::default(),
            with: None,
            left: Box::new(acc),
            op: SetOperator::UnionAll,
            right: Box::new(next),
            order_by: None,
            limit: None,
            offset: None,
        })
    })
}

// --- UPDATE ---------------------------------------------------------------

fn rewrite_returning_for_update(
    returning: &ReturningClause,
    set: &SetClause,
    qualifier: &IdentifierString,
) -> Vec<SelectItem> {
    returning
        .items
        .iter()
        .map(|item| match item {
            SelectItem::Expr { value, alias } => {
                if let Some(col_name) = bare_column_name(value) {
                    if let Some((_, assigned)) = set
                        .assignments
                        .iter()
                        .find(|(c, _)| c.matches(&col_name.text))
                    {
                        return SelectItem::Expr {
                            value: assigned.clone(),
                            alias: Some(alias.clone().unwrap_or(col_name)),
                        };
                    }
                    return SelectItem::Expr {
                        value: qualify_column(value, qualifier),
                        alias: Some(alias.clone().unwrap_or(col_name)),
                    };
                }
                SelectItem::Expr {
                    value: qualify_column(value, qualifier),
                    alias: alias.clone(),
                }
            }
            SelectItem::Wildcard { qualifier: q } => SelectItem::Wildcard {
                qualifier: q.clone(),
            },
        })
        .collect()
}

/// Converts an `UPDATE` into a `SELECT` over the rows it would touch (§4.4.6
/// template). `RETURNING` columns that name a `SET`-assigned column are
/// rewritten to that assignment's expression; everything else is qualified
/// with the target table's effective name. No `RETURNING` yields a plain
/// `count(*)`.
pub fn update_to_select(update: &Update, options: &ConvertOptions) -> Result<Query, Error> {
    let qualifier = update
        .table
        .effective_name()
        .cloned()
        .ok_or_else(|| Error::new(Reason::InvariantViolation(
            "UPDATE target has no addressable name".to_string(),
        )))?;

    let mut joins = Vec::new();
    if let Some(explicit) = &update.from {
        joins.push(JoinClause {
            id: NodeId::new(),
            comments: Default::default(),
            kind: JoinKind::Cross,
            lateral: false,
            source: explicit.primary.clone(),
            condition: JoinCondition::None,
        });
        joins.extend(explicit.joins.clone());
    }

    let mut select = SimpleSelect::empty();
    select.with = update.with.clone();
    select.select.items = match &update.returning {
        Some(returning) => rewrite_returning_for_update(returning, &update.set, &qualifier),
        None => vec![count_star_item()],
    };
    select.from = Some(from_of(update.table.clone(), joins));
    select.r#where = update.r#where.clone();

    let mut query = Query::SimpleSelect(select);
    apply_fixtures(&mut query, options)?;
    Ok(query)
}

// --- DELETE ----------------------------------------------------------------

fn rewrite_returning_plain(returning: &ReturningClause, qualifier: &IdentifierString) -> Vec<SelectItem> {
    returning
        .items
        .iter()
        .map(|item| match item {
            SelectItem::Expr { value, alias } => {
                let inferred_alias = alias.clone().or_else(|| bare_column_name(value));
                SelectItem::Expr {
                    value: qualify_column(value, qualifier),
                    alias: inferred_alias,
                }
            }
            SelectItem::Wildcard { qualifier: q } => SelectItem::Wildcard {
                qualifier: q.clone(),
            },
        })
        .collect()
}

/// Converts a `DELETE` into a `SELECT` over the rows it would remove
/// (§4.4.6), mirroring `update_to_select` without a `SET` substitution pass.
pub fn delete_to_select(delete: &Delete, options: &ConvertOptions) -> Result<Query, Error> {
    let qualifier = delete
        .table
        .effective_name()
        .cloned()
        .ok_or_else(|| Error::new(Reason::InvariantViolation(
            "DELETE target has no addressable name".to_string(),
        )))?;

    let mut joins = Vec::new();
    if let Some(using) = &delete.using {
        joins.push(JoinClause {
            id: NodeId::new(),
            comments: Default::default(),
            kind: JoinKind::Cross,
            lateral: false,
            source: using.primary.clone(),
            condition: JoinCondition::None,
        });
        joins.extend(using.joins.clone());
    }

    let mut select = SimpleSelect::empty();
    select.with = delete.with.clone();
    select.select.items = match &delete.returning {
        Some(returning) => rewrite_returning_plain(returning, &qualifier),
        None => vec![count_star_item()],
    };
    select.from = Some(from_of(delete.table.clone(), joins));
    select.r#where = delete.r#where.clone();

    let mut query = Query::SimpleSelect(select);
    apply_fixtures(&mut query, options)?;
    Ok(query)
}

// --- INSERT ------------------------------------------------------------

fn substitute_returning_for_row(
    returning: &ReturningClause,
    columns: &[IdentifierString],
    row: &[Expr],
) -> Vec<SelectItem> {
    returning
        .items
        .iter()
        .map(|item| match item {
            SelectItem::Expr { value, alias } => {
                if let Some(col_name) = bare_column_name(value) {
                    if let Some(pos) = columns.iter().position(|c| c.matches(&col_name.text)) {
                        if let Some(row_expr) = row.get(pos) {
                            return SelectItem::Expr {
                                value: row_expr.clone(),
                                alias: Some(alias.clone().unwrap_or(col_name)),
                            };
                        }
                    }
                }
                SelectItem::Expr {
                    value: value.clone(),
                    alias: alias.clone(),
                }
            }
            SelectItem::Wildcard { qualifier } => SelectItem::Wildcard {
                qualifier: qualifier.clone(),
            },
        })
        .collect()
}

fn values_rows_to_select(insert: &Insert, values: &ValuesQuery) -> Query {
    let Some(returning) = &insert.returning else {
        let mut select = SimpleSelect::empty();
        select.with = insert.with.clone();
        select.select.items = vec![SelectItem::Expr {
            value: Expr::new(ExprKind::Literal(LiteralValue::Number(
                values.rows.len().to_string(),
            ))),
            alias: None,
        }];
        return Query::SimpleSelect(select);
    };

    let per_row: Vec<Query> = values
        .rows
        .iter()
        .map(|row| {
            let mut select = SimpleSelect::empty();
            select.select.items =
                substitute_returning_for_row(returning, &insert.columns, row);
            Query::SimpleSelect(select)
        })
        .collect();

    let mut combined = union_all_chain(per_row);
    combined.set_with_clause(insert.with.clone());
    combined
}

fn select_source_to_select(insert: &Insert, inner: &Query) -> Query {
    let source = wrap_as_subquery(inner.clone(), "inserted");
    let mut select = SimpleSelect::empty();
    select.with = insert.with.clone();
    select.from = Some(from_of(source, Vec::new()));
    select.select.items = match &insert.returning {
        Some(returning) => returning
            .items
            .iter()
            .map(|item| match item {
                SelectItem::Expr { value, alias } => {
                    if let Some(col_name) = bare_column_name(value) {
                        if insert
                            .columns
                            .iter()
                            .any(|c| c.matches(&col_name.text))
                        {
                            return SelectItem::Expr {
                                value: Expr::new(ExprKind::ColumnReference(QualifiedName {
                                    namespaces: vec![IdentifierString::new("inserted")],
                                    name: col_name.clone(),
                                })),
                                alias: Some(alias.clone().unwrap_or(col_name)),
                            };
                        }
                    }
                    SelectItem::Expr {
                        value: qualify_column(value, &IdentifierString::new("inserted")),
                        alias: alias.clone(),
                    }
                }
                SelectItem::Wildcard { qualifier } => SelectItem::Wildcard {
                    qualifier: qualifier.clone(),
                },
            })
            .collect(),
        None => vec![count_star_item()],
    };
    Query::SimpleSelect(select)
}

fn default_values_to_select(insert: &Insert) -> Query {
    let mut select = SimpleSelect::empty();
    select.with = insert.with.clone();
    select.select.items = match &insert.returning {
        Some(returning) => returning
            .items
            .iter()
            .map(|item| match item {
                SelectItem::Expr { value, alias } => SelectItem::Expr {
                    value: Expr::new(ExprKind::Literal(LiteralValue::Null)),
                    alias: alias.clone().or_else(|| bare_column_name(value)),
                },
                SelectItem::Wildcard { qualifier } => SelectItem::Wildcard {
                    qualifier: qualifier.clone(),
                },
            })
            .collect(),
        None => vec![SelectItem::Expr {
            value: Expr::new(ExprKind::Literal(LiteralValue::Number("1".to_string()))),
            alias: None,
        }],
    };
    Query::SimpleSelect(select)
}

/// Converts an `INSERT` into a `SELECT` over the rows it would add (§4.4.6).
/// `VALUES` rows are substituted positionally into `RETURNING`; an
/// `INSERT ... SELECT` source is wrapped and its own output columns are
/// referenced in place of the literal substitution; `DEFAULT VALUES` yields
/// `NULL` for every returned column since no default-value metadata is
/// available to this transformer.
pub fn insert_to_select(insert: &Insert, options: &ConvertOptions) -> Result<Query, Error> {
    let mut query = match &insert.source {
        InsertSource::Values(values) => values_rows_to_select(insert, values),
        InsertSource::Select(inner) => select_source_to_select(insert, inner),
        InsertSource::DefaultValues => default_values_to_select(insert),
    };
    apply_fixtures(&mut query, options)?;
    Ok(query)
}

// --- MERGE -------------------------------------------------------------

fn not_exists_predicate(probe: &SourceExpression, on: &Expr) -> Expr {
    let mut select = SimpleSelect::empty();
    select.select.items = vec![literal_one()];
    select.from = Some(from_of(probe.clone(), Vec::new()));
    select.r#where = Some(where_of(on.clone()));
    Expr::new(ExprKind::Exists {
        negated: true,
        query: Box::new(Query::SimpleSelect(select)),
    })
}

fn merge_branch_select(merge: &Merge, when: &MergeWhen) -> SimpleSelect {
    let mut select = SimpleSelect::empty();
    select.select.items = vec![literal_one()];
    match when.match_type {
        MergeMatchType::Matched => {
            select.from = Some(from_of(
                merge.target.clone(),
                vec![JoinClause {
                    id: NodeId::new(),
                    comments: Default::default(),
                    kind: JoinKind::Inner,
                    lateral: false,
                    source: merge.source.clone(),
                    condition: JoinCondition::On(merge.on.clone()),
                }],
            ));
            select.r#where = when.condition.clone().map(where_of);
        }
        MergeMatchType::NotMatched => {
            select.from = Some(from_of(merge.source.clone(), Vec::new()));
            let cond = and_opt(
                Some(not_exists_predicate(&merge.target, &merge.on)),
                when.condition.clone(),
            );
            select.r#where = cond.map(where_of);
        }
        MergeMatchType::NotMatchedBySource => {
            select.from = Some(from_of(merge.target.clone(), Vec::new()));
            let cond = and_opt(
                Some(not_exists_predicate(&merge.source, &merge.on)),
                when.condition.clone(),
            );
            select.r#where = cond.map(where_of);
        }
    }
    select
}

/// Converts a `MERGE` into a `SELECT count(*)` over the union of every
/// `WHEN` branch's affected-row query (§4.4.6). Each branch's shape follows
/// its match type: `matched` inner-joins source to target on the merge's
/// `ON`; the two `not matched` variants anti-join via `NOT EXISTS`.
pub fn merge_to_select(merge: &Merge, options: &ConvertOptions) -> Result<Query, Error> {
    if merge.when_clauses.is_empty() {
        return Err(Error::new(Reason::InvariantViolation(
            "MERGE has no WHEN clauses to convert".to_string(),
        )));
    }
    let branches: Vec<Query> = merge
        .when_clauses
        .iter()
        .map(|when| Query::SimpleSelect(merge_branch_select(merge, when)))
        .collect();
    let union = union_all_chain(branches);
    let mut query = wrap_count_over(union, "merge_affected");
    query.set_with_clause(merge.with.clone());
    apply_fixtures(&mut query, options)?;
    Ok(query)
}

// --- fixture shadowing ---------------------------------------------------

fn fixture_to_cte(fixture: &FixtureTable) -> CommonTable {
    CommonTable {
        id: NodeId::new(),
        comments: Default::default(),
        name: IdentifierString::new(fixture.name.clone()),
        column_names: fixture
            .columns
            .iter()
            .map(|c| IdentifierString::new(c.clone()))
            .collect(),
        query: Box::new(Query::ValuesQuery(ValuesQuery {
            id: NodeId::new(),
            comments: Default::default(),
            rows: fixture.rows.clone(),
        })),
        is_recursive: false,
    }
}

/// Shadows every concrete table reference in `query` that has a matching
/// entry in `options.fixture_tables` with a `VALUES`-backed CTE (§4.4.6
/// points 1-4), prepended to any existing `WITH` clause.
pub fn apply_fixtures(query: &mut Query, options: &ConvertOptions) -> Result<(), Error> {
    if options.fixture_tables.is_empty()
        && options.missing_fixture_strategy == MissingFixtureStrategy::Skip
    {
        return Ok(());
    }

    let refs = TableSourceCollector::collect(query, true);
    let mut seen = HashSet::new();
    let mut missing = Vec::new();
    let mut shadow_ctes = Vec::new();

    for name in refs {
        let key = name.name.text.to_ascii_lowercase();
        if !seen.insert(key) {
            continue;
        }
        match options
            .fixture_tables
            .iter()
            .find(|f| name.name.matches(&f.name))
        {
            Some(fixture) => shadow_ctes.push(fixture_to_cte(fixture)),
            None => missing.push(name.name.text.clone()),
        }
    }

    if !missing.is_empty() && options.missing_fixture_strategy == MissingFixtureStrategy::Error {
        return Err(Error::new(Reason::NotFound {
            name: missing.join(", "),
            namespace: "fixture table".to_string(),
        }));
    }

    if shadow_ctes.is_empty() {
        return Ok(());
    }

    let merged = match query.with_clause().cloned() {
        Some(mut existing) => {
            shadow_ctes.append(&mut existing.tables);
            existing.tables = shadow_ctes;
            existing
        }
        None => WithClause {
            id: NodeId::new(),
            comments: Default::default(),
            recursive: false,
            tables: shadow_ctes,
        },
    };
    query.set_with_clause(Some(merged));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{format_query, FormatOptions};
    use crate::parser::parse;

    fn one_line(query: &Query) -> String {
        format_query(query, &FormatOptions::default().as_one_line())
    }

    #[test]
    fn update_returning_rewrites_set_and_qualifies_rest() {
        let q = parse(
            "UPDATE users SET name='x' WHERE id=1 RETURNING id, name",
            crate::format::IdentifierDialect::Postgres,
        )
        .unwrap();
        let update = q.as_update().unwrap();
        let select = update_to_select(update, &ConvertOptions::default()).unwrap();
        assert_eq!(
            one_line(&select),
            "SELECT users.id AS id, 'x' AS name FROM users WHERE id = 1"
        );
    }

    #[test]
    fn update_without_returning_yields_count() {
        let q = parse(
            "UPDATE users SET name='x' WHERE id=1",
            crate::format::IdentifierDialect::Postgres,
        )
        .unwrap();
        let update = q.as_update().unwrap();
        let select = update_to_select(update, &ConvertOptions::default()).unwrap();
        assert_eq!(
            one_line(&select),
            "SELECT count(*) FROM users WHERE id = 1"
        );
    }

    #[test]
    fn delete_returning_qualifies_bare_columns() {
        let q = parse(
            "DELETE FROM users WHERE id=1 RETURNING id",
            crate::format::IdentifierDialect::Postgres,
        )
        .unwrap();
        let delete = q.as_delete().unwrap();
        let select = delete_to_select(delete, &ConvertOptions::default()).unwrap();
        assert_eq!(
            one_line(&select),
            "SELECT users.id AS id FROM users WHERE id = 1"
        );
    }

    #[test]
    fn insert_values_substitutes_row_into_returning() {
        let q = parse(
            "INSERT INTO users (id, name) VALUES (1, 'a') RETURNING id, name",
            crate::format::IdentifierDialect::Postgres,
        )
        .unwrap();
        let insert = q.as_insert().unwrap();
        let select = insert_to_select(insert, &ConvertOptions::default()).unwrap();
        assert_eq!(one_line(&select), "SELECT 1 AS id, 'a' AS name");
    }

    #[test]
    fn insert_without_returning_yields_row_count() {
        let q = parse(
            "INSERT INTO users (id) VALUES (1), (2)",
            crate::format::IdentifierDialect::Postgres,
        )
        .unwrap();
        let insert = q.as_insert().unwrap();
        let select = insert_to_select(insert, &ConvertOptions::default()).unwrap();
        assert_eq!(one_line(&select), "SELECT 2");
    }

    #[test]
    fn fixture_shadowing_prepends_cte_and_errors_when_missing() {
        let mut q = parse("SELECT id FROM users", crate::format::IdentifierDialect::Postgres).unwrap();
        let strict = ConvertOptions::default();
        assert!(apply_fixtures(&mut q, &strict).is_err());

        let mut q2 = parse("SELECT id FROM users", crate::format::IdentifierDialect::Postgres).unwrap();
        let opts = ConvertOptions {
            fixture_tables: vec![FixtureTable {
                name: "users".to_string(),
                columns: vec!["id".to_string()],
                rows: vec![vec![Expr::new(ExprKind::Literal(LiteralValue::Number(
                    "1".to_string(),
                )))]],
            }],
            missing_fixture_strategy: MissingFixtureStrategy::Error,
        };
        apply_fixtures(&mut q2, &opts).unwrap();
        let with = q2.with_clause().unwrap();
        assert_eq!(with.tables[0].name.text, "users");
    }
}
