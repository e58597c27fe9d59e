//! Cross-module invariants and boundary behaviors (spec §8).

use sqlforge::collect::{DedupMode, SelectableColumnCollector};
use sqlforge::format::{format_query, FormatOptions, IdentifierDialect};
use sqlforge::parser::parse;
use sqlforge::transform::{
    compose_ctes, decompose_ctes, prune_unused_ctes, prune_unused_left_joins, ComposeOptions,
    SchemaMetadata, TableSchema,
};

const SAMPLE_QUERIES: &[&str] = &[
    "SELECT * FROM users",
    "SELECT a, b FROM t WHERE a = 1 AND b = 2 ORDER BY a DESC",
    "WITH a AS (SELECT 1 AS x) SELECT x FROM a",
    "SELECT u.id, p.bio FROM users u LEFT JOIN profiles p ON p.user_id = u.id",
    "INSERT INTO users (id, name) VALUES (1, 'a')",
    "UPDATE users SET name = 'x' WHERE id = 1",
    "DELETE FROM users WHERE id = 1",
];

/// Invariant 1: `parse(format(parse(sql))) ≡_AST parse(sql)`, approximated
/// by checking the one-line rendering is stable under a second round-trip
/// (whitespace/comment-only differences are the only thing the spec
/// permits, and one-line mode normalizes those away).
#[test]
fn round_trip_is_stable_under_reformatting() {
    for sql in SAMPLE_QUERIES {
        let opts = FormatOptions::default().as_one_line();
        let first = parse(sql, IdentifierDialect::Postgres).unwrap();
        let first_text = format_query(&first, &opts);
        let second = parse(&first_text, IdentifierDialect::Postgres).unwrap();
        let second_text = format_query(&second, &opts);
        assert_eq!(first_text, second_text, "round-trip unstable for {sql}");
    }
}

/// Invariant 4 (LEFT-JOIN half): pruning twice is the same as pruning once.
#[test]
fn left_join_pruner_is_idempotent_at_fixed_point() {
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
    let once = format_query(&query, &FormatOptions::default().as_one_line());
    prune_unused_left_joins(&mut query, &schema);
    let twice = format_query(&query, &FormatOptions::default().as_one_line());
    assert_eq!(once, twice);
}

/// Invariant 4 (CTE half): same idempotence check for the unused-CTE
/// pruner, whose cascading removal could in principle still have more to
/// do after one pass if it weren't fixed-point.
#[test]
fn cte_pruner_is_idempotent_at_fixed_point() {
    let mut query = parse(
        "WITH a AS (SELECT x FROM b), b AS (SELECT 1 AS x), c AS (SELECT 2 AS y) SELECT x FROM a",
        IdentifierDialect::Postgres,
    )
    .unwrap();
    prune_unused_ctes(&mut query);
    let once = format_query(&query, &FormatOptions::default().as_one_line());
    prune_unused_ctes(&mut query);
    let twice = format_query(&query, &FormatOptions::default().as_one_line());
    assert_eq!(once, twice);
    assert_eq!(
        once,
        "WITH a AS (SELECT x FROM b), b AS (SELECT 1 AS x) SELECT x FROM a"
    );
}

/// Invariant 5: decomposing a composed query and recomposing it yields the
/// same `{name, pure-query}` pairs modulo formatting.
#[test]
fn cte_composer_round_trips_through_decomposition() {
    let query = parse(
        "WITH a AS (SELECT 1 AS x), b AS (SELECT x FROM a) SELECT x FROM b",
        IdentifierDialect::Postgres,
    )
    .unwrap();
    let entries = decompose_ctes(&query);
    let recomposed = compose_ctes(&entries, &ComposeOptions::default()).unwrap();
    let reparsed = parse(
        &format_query(&recomposed, &FormatOptions::default()),
        IdentifierDialect::Postgres,
    )
    .unwrap();

    let opts = FormatOptions::default().as_one_line();
    assert_eq!(format_query(&reparsed, &opts), format_query(&query, &opts));
}

/// Boundary: a recursive CTE is left untouched by the unused-CTE pruner
/// even when nothing outside it references its name.
#[test]
fn recursive_cte_survives_unused_cte_pruning() {
    let mut query = parse(
        "WITH RECURSIVE a AS (SELECT 1 AS x) SELECT 1",
        IdentifierDialect::Postgres,
    )
    .unwrap();
    prune_unused_ctes(&mut query);
    let select = query.as_simple_select().unwrap();
    assert_eq!(select.with.as_ref().unwrap().tables.len(), 1);
}

/// Boundary: empty SELECT list, empty FROM, empty WITH all format and
/// re-parse without error.
#[test]
fn empty_select_from_and_with_round_trip() {
    for sql in ["SELECT 1", "SELECT 1 FROM t", "WITH a AS (SELECT 1) SELECT 1"] {
        let query = parse(sql, IdentifierDialect::Postgres).unwrap();
        let text = format_query(&query, &FormatOptions::default());
        parse(&text, IdentifierDialect::Postgres).unwrap();
    }
}

/// Boundary: in one-line mode the printer never emits a line-break
/// character, regardless of how many clauses the query has.
#[test]
fn one_line_mode_never_emits_a_newline() {
    let query = parse(
        "WITH a AS (SELECT 1 AS x) SELECT a.x, b.y FROM a JOIN b ON b.x = a.x WHERE a.x > 1 ORDER BY a.x",
        IdentifierDialect::Postgres,
    )
    .unwrap();
    let out = format_query(&query, &FormatOptions::default().as_one_line());
    assert!(!out.contains('\n'));
}

/// Boundary: a qualified and an unqualified column reference that share a
/// bare name are not conflated under `DedupMode::FullName` — the qualified
/// one's key includes its table, so both survive.
#[test]
fn qualified_and_unqualified_same_name_do_not_collide_under_full_name_dedup() {
    let query = parse("SELECT a.x, x FROM a", IdentifierDialect::Postgres).unwrap();
    let cols = SelectableColumnCollector::new(DedupMode::FullName).collect(&query);
    assert_eq!(cols.len(), 2);
}
