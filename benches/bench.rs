//! A simple benchmark covering the parse → prune → format pipeline on a
//! query with a WITH clause, a LEFT JOIN and an ORDER BY, basically copied
//! from the [criterion quick start](https://github.com/bheisler/criterion.rs#quickstart).

use criterion::{criterion_group, criterion_main, Criterion};
use sqlforge::transform::{prune_unused_ctes, prune_unused_left_joins, SchemaMetadata, TableSchema};
use sqlforge::{format_query, parse, FormatOptions, IdentifierDialect};

const QUERY: &str = "
    WITH active_customers AS (
        SELECT c.id, c.name FROM customers c WHERE c.active
    ), unused AS (
        SELECT 1 AS x
    )
    SELECT o.id, ac.name
    FROM orders o
    JOIN active_customers ac ON ac.id = o.customer_id
    LEFT JOIN profiles p ON p.order_id = o.id
    ORDER BY o.id
";

fn parse_prune_format() -> String {
    let mut query = parse(QUERY, IdentifierDialect::Postgres).unwrap();
    let schema = SchemaMetadata::new().with_table(
        "profiles",
        TableSchema {
            columns: vec!["order_id".to_string()],
            unique_keys: vec![vec!["order_id".to_string()]],
        },
    );
    prune_unused_left_joins(&mut query, &schema);
    prune_unused_ctes(&mut query);
    format_query(&query, &FormatOptions::default())
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("parse-prune-format", |b| b.iter(parse_prune_format));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
