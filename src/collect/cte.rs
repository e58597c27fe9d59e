//! CTE collector (§4.3): every `CommonTable` reachable from a root query, in
//! source order, deduplicated by node identity.

use std::collections::HashSet;

use crate::ast::{CommonTable, NodeId, Query, Visitor, WithClause};

/// DFS over `WITH` clauses. CTE bodies may themselves contain nested `WITH`
/// clauses; those are walked too, so a CTE defined three levels deep is
/// still reported.
pub struct CteCollector {
    visited: HashSet<NodeId>,
    found: Vec<CommonTable>,
}

impl CteCollector {
    pub fn new() -> Self {
        CteCollector {
            visited: HashSet::new(),
            found: Vec::new(),
        }
    }

    /// Collects every `CommonTable` in `query`, in document order.
    pub fn collect(query: &Query) -> Vec<CommonTable> {
        let mut collector = Self::new();
        collector.visit_query(query);
        collector.found
    }
}

impl Default for CteCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Visitor for CteCollector {
    fn visited(&mut self) -> &mut HashSet<NodeId> {
        &mut self.visited
    }

    fn visit_with_clause(&mut self, with: &WithClause) {
        for table in &with.tables {
            if !self.enter(table.id) {
                continue;
            }
            self.found.push(table.clone());
            self.visit_query(&table.query);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::format::IdentifierDialect;

    #[test]
    fn collects_ctes_in_source_order() {
        let q = parse(
            "WITH a AS (SELECT 1 AS x), b AS (SELECT 2 AS y) SELECT x FROM a",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        let names: Vec<_> = CteCollector::collect(&q)
            .iter()
            .map(|c| c.name.text.clone())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn collects_nested_ctes() {
        let q = parse(
            "WITH a AS (WITH b AS (SELECT 1 AS x) SELECT x FROM b) SELECT * FROM a",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        let names: Vec<_> = CteCollector::collect(&q)
            .iter()
            .map(|c| c.name.text.clone())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
