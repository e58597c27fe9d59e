//! Literal end-to-end scenarios (spec §8 "End-to-end scenarios").
//!
//! Each test drives the public API the way an embedding application would:
//! parse, run one transformer or formatter option, re-emit.

use sqlforge::format::{format_query, FormatOptions, IdentifierDialect, WithClauseStyle};
use sqlforge::parser::parse;
use sqlforge::transform::{
    inject_exists, inject_sort, insert_to_select, prune_unused_ctes, prune_unused_left_joins,
    update_to_select, ConvertOptions, ExistsInstruction, ExistsMode, InjectOptions, SchemaMetadata,
    SortInstruction, TableSchema,
};

fn one_line(query: &sqlforge::ast::Query) -> String {
    format_query(query, &FormatOptions::default().as_one_line())
}

#[test]
fn scenario_1_left_join_pruning() {
    let mut query = parse(
        "SELECT u.id FROM users u LEFT JOIN profiles p ON p.user_id = u.id",
        IdentifierDialect::Postgres,
    )
    .unwrap();
    let schema = SchemaMetadata::new().with_table(
        "profiles",
        TableSchema {
            columns: vec!["user_id".to_string()],
            unique_keys: vec![vec!["user_id".to_string()]],
        },
    );
    prune_unused_left_joins(&mut query, &schema);
    assert_eq!(one_line(&query), "SELECT u.id FROM users u");
}

#[test]
fn scenario_2_unused_cte_pruning() {
    let mut query = parse(
        "WITH a AS (SELECT 1 AS x), b AS (SELECT 2 AS y) SELECT x FROM a",
        IdentifierDialect::Postgres,
    )
    .unwrap();
    prune_unused_ctes(&mut query);
    assert_eq!(
        one_line(&query),
        "WITH a AS (SELECT 1 AS x) SELECT x FROM a"
    );
}

#[test]
fn scenario_3_exists_injection() {
    let mut query = parse("SELECT o.id FROM orders o", IdentifierDialect::Postgres).unwrap();
    let instructions = vec![ExistsInstruction {
        mode: ExistsMode::Exists,
        anchor_columns: vec!["o.customer_id".to_string()],
        sql: "SELECT 1 FROM customers c WHERE c.id = $c0 AND c.active".to_string(),
        params: Vec::new(),
    }];
    inject_exists(&mut query, &instructions, &InjectOptions::default()).unwrap();
    assert_eq!(
        one_line(&query),
        "SELECT o.id FROM orders o WHERE EXISTS (SELECT 1 FROM customers c WHERE c.id = o.customer_id AND c.active)"
    );
}

#[test]
fn scenario_4_update_returning_to_select() {
    let query = parse(
        "UPDATE users SET name='x' WHERE id=1 RETURNING id, name",
        IdentifierDialect::Postgres,
    )
    .unwrap();
    let update = query.as_update().unwrap();
    let select = update_to_select(update, &ConvertOptions::default()).unwrap();
    assert_eq!(
        one_line(&select),
        "SELECT users.id AS id, 'x' AS name FROM users WHERE id = 1"
    );
}

#[test]
fn scenario_5_sort_injection() {
    let mut query = parse("SELECT a, b FROM t", IdentifierDialect::Postgres).unwrap();
    let conditions = vec![
        (
            "b".to_string(),
            SortInstruction {
                desc: true,
                nulls_last: true,
                ..Default::default()
            },
        ),
        (
            "a".to_string(),
            SortInstruction {
                asc: true,
                ..Default::default()
            },
        ),
    ];
    inject_sort(&mut query, &conditions).unwrap();
    assert_eq!(
        one_line(&query),
        "SELECT a, b FROM t ORDER BY b DESC NULLS LAST, a"
    );
}

#[test]
fn scenario_6_formatter_cte_oneline() {
    let query = parse(
        "WITH x AS (SELECT 1) SELECT * FROM x",
        IdentifierDialect::Postgres,
    )
    .unwrap();
    let mut options = FormatOptions::default();
    options.with_clause_style = WithClauseStyle::CteOneLine;
    let out = format_query(&query, &options);
    assert_eq!(out, "WITH x AS (SELECT 1)\nSELECT *\nFROM x");
}

/// Not one of the six literal IO scenarios, but exercises the same
/// public-API path for the insert-to-select member of the DML family the
/// scenario list doesn't otherwise cover end-to-end.
#[test]
fn insert_values_to_select_via_public_api() {
    let query = parse(
        "INSERT INTO users (id, name) VALUES (1, 'a') RETURNING id, name",
        IdentifierDialect::Postgres,
    )
    .unwrap();
    let insert = query.as_insert().unwrap();
    let select = insert_to_select(insert, &ConvertOptions::default()).unwrap();
    assert_eq!(one_line(&select), "SELECT 1 AS id, 'a' AS name");
}
