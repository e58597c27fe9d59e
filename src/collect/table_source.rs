//! Table-source collector (§4.3): every `TableSource` reachable from a root
//! query, with a flag controlling whether references that actually resolve
//! to a CTE are included or skipped.

use std::collections::HashSet;

use crate::ast::{DataSource, NodeId, Query, QualifiedName, SourceExpression, Visitor, WithClause};

/// DFS over source expressions. CTE names come into scope for the rest of
/// the `WITH` clause they're declared in (and the query it decorates);
/// sibling CTEs can reference each other, which is enough fidelity for the
/// pruning transformers this collector feeds (§4.4.1, §4.4.2).
pub struct TableSourceCollector {
    visited: HashSet<NodeId>,
    cte_scope: Vec<String>,
    skip_cte_backed: bool,
    found: Vec<QualifiedName>,
}

impl TableSourceCollector {
    pub fn new(skip_cte_backed: bool) -> Self {
        TableSourceCollector {
            visited: HashSet::new(),
            cte_scope: Vec::new(),
            skip_cte_backed,
            found: Vec::new(),
        }
    }

    /// Collects every `TableSource` in `query`. When `skip_cte_backed` is
    /// true, a bare table name that matches a CTE currently in scope is
    /// omitted (it isn't a real table reference).
    pub fn collect(query: &Query, skip_cte_backed: bool) -> Vec<QualifiedName> {
        let mut collector = Self::new(skip_cte_backed);
        collector.visit_query(query);
        collector.found
    }

    fn is_cte_backed(&self, name: &QualifiedName) -> bool {
        name.namespaces.is_empty()
            && self
                .cte_scope
                .iter()
                .any(|cte| name.name.matches(cte))
    }
}

impl Visitor for TableSourceCollector {
    fn visited(&mut self) -> &mut HashSet<NodeId> {
        &mut self.visited
    }

    fn visit_with_clause(&mut self, with: &WithClause) {
        let added = with.tables.len();
        for table in &with.tables {
            self.cte_scope.push(table.name.text.clone());
        }
        for table in &with.tables {
            if !self.enter(table.id) {
                continue;
            }
            self.visit_query(&table.query);
        }
        self.cte_scope.truncate(self.cte_scope.len() - added);
    }

    fn visit_source_expression(&mut self, source: &SourceExpression) {
        if let DataSource::TableSource(name) = &source.data_source {
            if !(self.skip_cte_backed && self.is_cte_backed(name)) {
                self.found.push(name.clone());
            }
        }
        crate::ast::fold::walk_source_expression(self, source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::IdentifierDialect;
    use crate::parser::parse;

    #[test]
    fn collects_table_sources_including_joins() {
        let q = parse(
            "SELECT * FROM users u LEFT JOIN profiles p ON p.user_id = u.id",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        let names: Vec<_> = TableSourceCollector::collect(&q, false)
            .iter()
            .map(|n| n.name.text.clone())
            .collect();
        assert_eq!(names, vec!["users", "profiles"]);
    }

    #[test]
    fn skips_cte_backed_references_when_flagged() {
        let q = parse(
            "WITH a AS (SELECT 1 AS x) SELECT x FROM a, t",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        let names: Vec<_> = TableSourceCollector::collect(&q, true)
            .iter()
            .map(|n| n.name.text.clone())
            .collect();
        assert_eq!(names, vec!["t"]);
    }

    #[test]
    fn includes_cte_backed_references_when_not_flagged() {
        let q = parse(
            "WITH a AS (SELECT 1 AS x) SELECT x FROM a",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        let names: Vec<_> = TableSourceCollector::collect(&q, false)
            .iter()
            .map(|n| n.name.text.clone())
            .collect();
        assert_eq!(names, vec!["a"]);
    }
}
