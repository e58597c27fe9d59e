//! Column-reference collector (§4.3): every `ColumnReference` node instance
//! reachable from a root query, counted with multiplicity — no
//! deduplication, unlike the selectable-column collector. Intended for bulk
//! rewrites (e.g. renaming a table alias everywhere it's used).

use std::collections::HashSet;

use crate::ast::{Expr, NodeId, Query, Visitor};

struct Collector {
    visited: HashSet<NodeId>,
    found: Vec<Expr>,
}

impl Visitor for Collector {
    fn visited(&mut self) -> &mut HashSet<NodeId> {
        &mut self.visited
    }

    fn visit_column_reference(&mut self, expr: &Expr) {
        self.found.push(expr.clone());
    }
}

/// Collects every `ColumnReference` expression reachable from `query`,
/// including those inside CTE bodies and subqueries, in document order.
pub fn collect_column_references(query: &Query) -> Vec<Expr> {
    let mut collector = Collector {
        visited: HashSet::new(),
        found: Vec::new(),
    };
    collector.visit_query(query);
    collector.found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::IdentifierDialect;
    use crate::parser::parse;

    #[test]
    fn collects_every_instance_with_multiplicity() {
        let q = parse(
            "SELECT a, a, b FROM t WHERE a = 1",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        let refs = collect_column_references(&q);
        assert_eq!(refs.len(), 4);
    }

    #[test]
    fn descends_into_subqueries_and_ctes() {
        let q = parse(
            "WITH a AS (SELECT x FROM t WHERE x = 1) SELECT (SELECT y FROM a) FROM u",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        let refs = collect_column_references(&q);
        let names: Vec<_> = refs
            .iter()
            .filter_map(|e| match &e.kind {
                crate::ast::ExprKind::ColumnReference(n) => Some(n.name.text.clone()),
                _ => None,
            })
            .collect();
        assert!(names.contains(&"x".to_string()));
        assert!(names.contains(&"y".to_string()));
    }
}
