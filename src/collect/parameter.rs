//! Parameter detector (§4.3): the set of named parameter tokens referenced
//! anywhere in the tree.

use std::collections::{HashMap, HashSet};

use crate::ast::{Expr, ExprKind, NodeId, Query, Visitor};

struct Detector {
    visited: HashSet<NodeId>,
    names: HashSet<String>,
}

impl Visitor for Detector {
    fn visited(&mut self) -> &mut HashSet<NodeId> {
        &mut self.visited
    }

    fn visit_expr(&mut self, expr: &Expr) {
        if !self.enter(expr.id) {
            return;
        }
        if let ExprKind::Parameter(name) = &expr.kind {
            self.names.insert(name.clone());
        }
        crate::ast::fold::walk_expr(self, expr);
    }
}

/// Returns every distinct named parameter referenced anywhere in `query`
/// (§4.3 "parameter detector"), including inside CTE bodies and subqueries.
pub fn collect_parameter_names(query: &Query) -> HashSet<String> {
    let mut detector = Detector {
        visited: HashSet::new(),
        names: HashSet::new(),
    };
    detector.visit_query(query);
    detector.names
}

/// §3.2 "parameter binding": a named parameter referenced in a subquery
/// must be resolvable from the enclosing query's parameter set. Returns the
/// names referenced by `subquery` that are absent from `enclosing_params`.
pub fn unresolvable_parameters(
    subquery: &Query,
    enclosing_params: &HashMap<String, ()>,
) -> HashSet<String> {
    collect_parameter_names(subquery)
        .into_iter()
        .filter(|name| !enclosing_params.contains_key(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::IdentifierDialect;
    use crate::parser::parse;

    #[test]
    fn collects_named_and_dollar_parameters() {
        let q = parse(
            "SELECT * FROM t WHERE a = :foo AND b = $bar",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        let mut names: Vec<_> = collect_parameter_names(&q).into_iter().collect();
        names.sort();
        assert_eq!(names, vec![":foo".to_string(), "$bar".to_string()]);
    }

    #[test]
    fn collects_parameters_inside_subqueries() {
        let q = parse(
            "SELECT (SELECT 1 FROM t WHERE t.id = :id) FROM u",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        let names = collect_parameter_names(&q);
        assert!(names.contains(":id"));
    }
}
