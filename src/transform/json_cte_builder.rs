//! JSON-aggregation CTE builder (§4.4.7): given a flat base `SELECT` and an
//! entity hierarchy describing how its columns nest, emits a chain of CTEs
//! that progressively compress the flat result into nested
//! `jsonb_build_object`/`jsonb_agg` JSON, PostgreSQL-flavored.
//!
//! Exclusion from `GROUP BY` is derived directly from the entity hierarchy
//! (depth and ancestry), not from inspecting generated column names — the
//! source's `entity_<N>_json` name-sniffing heuristic is a documented
//! simplification this builder does not reproduce.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::ast::{
    CastExpression, CommonTable, DataSource, Expr, ExprKind, FunctionCall, GroupByClause,
    IdentifierString, LiteralValue, NodeId, Query, QualifiedName, SelectItem, SimpleSelect,
    SourceExpression, WithClause,
};
use crate::error::{Error, Reason};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRelationship {
    Object,
    Array,
}

/// One entity in the nesting hierarchy (§4.4.7). `columns` maps an output
/// JSON key to the flat source column name it reads from the base SELECT
/// (or, for a column introduced by a deeper entity's own aggregation, the
/// generated `<entity_id>_json` name).
#[derive(Debug, Clone)]
pub struct EntityNode {
    pub id: String,
    pub parent_id: Option<String>,
    pub relationship: EntityRelationship,
    pub columns: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct JsonCteOptions {
    pub entities: Vec<EntityNode>,
}

#[derive(Clone)]
struct ColumnState {
    alias: String,
    is_json: bool,
    owner_entity: String,
}

fn json_column_name(entity_id: &str) -> String {
    format!("{entity_id}_json")
}

fn build_parent_map(entities: &[EntityNode]) -> HashMap<String, String> {
    entities
        .iter()
        .filter_map(|e| e.parent_id.clone().map(|p| (e.id.clone(), p)))
        .collect()
}

fn compute_depths(entities: &[EntityNode]) -> Result<HashMap<String, usize>, Error> {
    let parent_of = build_parent_map(entities);
    let mut depths = HashMap::new();
    for entity in entities {
        let mut depth = 0;
        let mut current = entity.id.clone();
        let mut seen = HashSet::new();
        while let Some(parent) = parent_of.get(&current) {
            if !seen.insert(current.clone()) {
                return Err(Error::new(Reason::InvariantViolation(format!(
                    "entity hierarchy has a cycle at `{current}`"
                ))));
            }
            depth += 1;
            current = parent.clone();
        }
        depths.insert(entity.id.clone(), depth);
    }
    Ok(depths)
}

/// True when `owner` is `ancestor`, or a descendant of it, following
/// `parent_of` links (§4.4.7 point 3's "owning entity is inside" test).
fn is_nested_in(owner: &str, targets: &HashSet<String>, parent_of: &HashMap<String, String>) -> bool {
    if targets.contains(owner) {
        return true;
    }
    let mut current = owner;
    while let Some(parent) = parent_of.get(current) {
        if targets.contains(parent) {
            return true;
        }
        current = parent;
    }
    false
}

fn column_ref(name: &str) -> Expr {
    Expr::new(ExprKind::ColumnReference(QualifiedName::unqualified(
        name,
    )))
}

fn string_literal(value: &str) -> Expr {
    Expr::new(ExprKind::Literal(LiteralValue::String(value.to_string())))
}

fn jsonb_build_object(columns: &[(String, String)]) -> Expr {
    let mut args = Vec::with_capacity(columns.len() * 2);
    for (key, source_column) in columns {
        args.push(string_literal(key));
        args.push(column_ref(source_column));
    }
    Expr::new(ExprKind::FunctionCall(FunctionCall {
        name: QualifiedName::unqualified("jsonb_build_object"),
        distinct: false,
        args,
        over: None,
    }))
}

fn jsonb_agg(inner: Expr) -> Expr {
    Expr::new(ExprKind::FunctionCall(FunctionCall {
        name: QualifiedName::unqualified("jsonb_agg"),
        distinct: false,
        args: vec![inner],
        over: None,
    }))
}

fn passthrough_json_in_group(expr: Expr) -> Expr {
    let as_text = Expr::new(ExprKind::Cast(CastExpression {
        expr: Box::new(expr),
        target_type: "text".to_string(),
    }));
    let min_call = Expr::new(ExprKind::FunctionCall(FunctionCall {
        name: QualifiedName::unqualified("min"),
        distinct: false,
        args: vec![as_text],
        over: None,
    }));
    Expr::new(ExprKind::Cast(CastExpression {
        expr: Box::new(min_call),
        target_type: "jsonb".to_string(),
    }))
}

fn select_item(value: Expr, alias: &str) -> SelectItem {
    SelectItem::Expr {
        value,
        alias: Some(IdentifierString::new(alias)),
    }
}

fn select_from(source_name: &str, items: Vec<SelectItem>, group_by: Vec<Expr>) -> Query {
    let mut select = SimpleSelect::empty();
    select.select.items = items;
    select.from = Some(crate::ast::FromClause {
        id: NodeId::new(),
        comments: Default::default(),
        primary: SourceExpression::new(DataSource::TableSource(QualifiedName::unqualified(
            source_name,
        ))),
        joins: Vec::new(),
    });
    if !group_by.is_empty() {
        select.group_by = Some(GroupByClause {
            id: NodeId::new(),
            comments: Default::default(),
            items: group_by,
        });
    }
    Query::SimpleSelect(select)
}

fn cte(name: &str, query: Query) -> CommonTable {
    CommonTable {
        id: NodeId::new(),
        comments: Default::default(),
        name: IdentifierString::new(name),
        column_names: Vec::new(),
        query: Box::new(query),
        is_recursive: false,
    }
}

/// Builds the CTE chain (§4.4.7). `base` becomes the first CTE; object
/// entities are folded in first (order among themselves doesn't affect
/// correctness, since each reads only its own raw columns), then array
/// entities are folded in from the deepest depth up.
pub fn build_json_aggregation_cte(base: Query, options: &JsonCteOptions) -> Result<Query, Error> {
    if options.entities.iter().filter(|e| e.parent_id.is_none()).count() != 1 {
        return Err(Error::new(Reason::InvariantViolation(
            "entity mapping must name exactly one root entity".to_string(),
        )));
    }
    let depths = compute_depths(&options.entities)?;
    let parent_of = build_parent_map(&options.entities);

    let mut tables = vec![cte("base_rows", base)];
    let mut prev = "base_rows".to_string();

    // Tracked by the flat SQL column each entity's mapping actually reads
    // (the mapping's source name, not its output JSON key) — two entities
    // commonly share a JSON key like "id" while their underlying columns
    // (`user_id`, `order_id`, ...) are distinct and must stay addressable.
    let mut columns: Vec<ColumnState> = options
        .entities
        .iter()
        .flat_map(|entity| {
            entity.columns.iter().map(move |(_key, source)| ColumnState {
                alias: source.clone(),
                is_json: false,
                owner_entity: entity.id.clone(),
            })
        })
        .collect();

    // The root entity is the flat base itself — it is never folded into a
    // JSON column, only nested entities (those with a parent) are.
    for entity in options
        .entities
        .iter()
        .filter(|e| e.parent_id.is_some() && matches!(e.relationship, EntityRelationship::Object))
    {
        let passthrough: Vec<SelectItem> = columns
            .iter()
            .filter(|c| c.owner_entity != entity.id)
            .map(|c| select_item(column_ref(&c.alias), &c.alias))
            .collect();
        let mut items = passthrough;
        items.push(select_item(
            jsonb_build_object(&entity.columns),
            &json_column_name(&entity.id),
        ));

        let name = format!("cte_object_{}", entity.id);
        tables.push(cte(&name, select_from(&prev, items, Vec::new())));

        columns.retain(|c| c.owner_entity != entity.id);
        columns.push(ColumnState {
            alias: json_column_name(&entity.id),
            is_json: true,
            owner_entity: entity.id.clone(),
        });
        prev = name;
    }

    let mut by_depth: BTreeMap<usize, Vec<&EntityNode>> = BTreeMap::new();
    for entity in options
        .entities
        .iter()
        .filter(|e| e.parent_id.is_some() && matches!(e.relationship, EntityRelationship::Array))
    {
        by_depth
            .entry(depths[&entity.id])
            .or_default()
            .push(entity);
    }

    for (_depth, entities_at_depth) in by_depth.into_iter().rev() {
        let at_depth_ids: HashSet<String> =
            entities_at_depth.iter().map(|e| e.id.clone()).collect();

        let surviving: Vec<ColumnState> = columns
            .iter()
            .filter(|c| !is_nested_in(&c.owner_entity, &at_depth_ids, &parent_of))
            .cloned()
            .collect();
        let group_by_columns: Vec<&ColumnState> =
            surviving.iter().filter(|c| !c.is_json).collect();

        let mut items: Vec<SelectItem> = group_by_columns
            .iter()
            .map(|c| select_item(column_ref(&c.alias), &c.alias))
            .collect();
        // A jsonb-typed column can't itself be a GROUP BY key, but one that
        // survives this round is still functionally dependent on the keys
        // that do group it; carry it through via a deterministic MIN over a
        // text cast rather than grouping by it directly.
        for c in surviving.iter().filter(|c| c.is_json) {
            items.push(select_item(
                passthrough_json_in_group(column_ref(&c.alias)),
                &c.alias,
            ));
        }
        let group_by: Vec<Expr> = group_by_columns
            .iter()
            .map(|c| column_ref(&c.alias))
            .collect();

        for entity in &entities_at_depth {
            items.push(select_item(
                jsonb_agg(jsonb_build_object(&entity.columns)),
                &json_column_name(&entity.id),
            ));
        }

        let name = format!("cte_array_depth_{_depth}");
        tables.push(cte(&name, select_from(&prev, items, group_by)));

        columns.retain(|c| !is_nested_in(&c.owner_entity, &at_depth_ids, &parent_of));
        for entity in &entities_at_depth {
            columns.push(ColumnState {
                alias: json_column_name(&entity.id),
                is_json: true,
                owner_entity: entity.id.clone(),
            });
        }
        prev = name;
    }

    let mut select = SimpleSelect::empty();
    select.select.items = vec![SelectItem::Wildcard { qualifier: None }];
    select.from = Some(crate::ast::FromClause {
        id: NodeId::new(),
        comments: Default::default(),
        primary: SourceExpression::new(DataSource::TableSource(QualifiedName::unqualified(&prev))),
        joins: Vec::new(),
    });
    select.with = Some(WithClause {
        id: NodeId::new(),
        comments: Default::default(),
        recursive: false,
        tables,
    });
    Ok(Query::SimpleSelect(select))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{format_query, FormatOptions};
    use crate::parser::parse;

    fn base_rows() -> Query {
        parse(
            "SELECT u.id AS user_id, u.name AS user_name, u.city AS user_city, u.zip AS user_zip, o.id AS order_id, o.total AS order_total FROM users u JOIN orders o ON o.user_id = u.id",
            crate::format::IdentifierDialect::Postgres,
        )
        .unwrap()
    }

    /// Root stays flat (never itself folded into JSON); `address` is a
    /// nested Object entity, `orders` a sibling Array entity, both at depth
    /// 1 — exercising the object pass, then the array pass grouping on the
    /// root's own untouched columns while carrying `address_json` through.
    #[test]
    fn builds_object_then_array_chain() {
        let options = JsonCteOptions {
            entities: vec![
                EntityNode {
                    id: "root".to_string(),
                    parent_id: None,
                    relationship: EntityRelationship::Object,
                    columns: vec![
                        ("id".to_string(), "user_id".to_string()),
                        ("name".to_string(), "user_name".to_string()),
                    ],
                },
                EntityNode {
                    id: "address".to_string(),
                    parent_id: Some("root".to_string()),
                    relationship: EntityRelationship::Object,
                    columns: vec![
                        ("city".to_string(), "user_city".to_string()),
                        ("zip".to_string(), "user_zip".to_string()),
                    ],
                },
                EntityNode {
                    id: "orders".to_string(),
                    parent_id: Some("root".to_string()),
                    relationship: EntityRelationship::Array,
                    columns: vec![
                        ("id".to_string(), "order_id".to_string()),
                        ("total".to_string(), "order_total".to_string()),
                    ],
                },
            ],
        };
        let built = build_json_aggregation_cte(base_rows(), &options).unwrap();
        let with = built.with_clause().unwrap();
        let names: Vec<_> = with.tables.iter().map(|t| t.name.text.clone()).collect();
        assert_eq!(
            names,
            vec!["base_rows", "cte_object_address", "cte_array_depth_1"]
        );
        let out = format_query(&built, &FormatOptions::default().as_one_line());
        assert!(out.contains("jsonb_agg"));
        assert!(out.contains("cte_array_depth_1"));
        assert!(out.contains("GROUP BY user_id, user_name"));
        assert!(out.contains("CAST(MIN(CAST(address_json AS text)) AS jsonb) AS address_json"));
    }

    #[test]
    fn rejects_multiple_roots() {
        let options = JsonCteOptions {
            entities: vec![
                EntityNode {
                    id: "a".to_string(),
                    parent_id: None,
                    relationship: EntityRelationship::Object,
                    columns: vec![],
                },
                EntityNode {
                    id: "b".to_string(),
                    parent_id: None,
                    relationship: EntityRelationship::Object,
                    columns: vec![],
                },
            ],
        };
        assert!(build_json_aggregation_cte(base_rows(), &options).is_err());
    }
}
