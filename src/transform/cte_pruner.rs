//! Unused-CTE pruner (§4.4.2): removes `WITH` entries unreachable from the
//! main query's table-source set (or from another reachable CTE), leaving
//! recursive CTEs untouched.

use std::collections::HashSet;

use crate::ast::{Query, WithClause};
use crate::collect::TableSourceCollector;

/// Prunes unreachable CTEs from every `WITH` clause reachable from `query`,
/// cascading to a fixed point (dropping one CTE can orphan another that
/// only it referenced).
pub fn prune_unused_ctes(query: &mut Query) {
    prune_query(query);
}

fn prune_query(query: &mut Query) {
    match query {
        Query::SimpleSelect(select) => {
            if let Some(with) = &mut select.with {
                prune_with_clause(with, &Query::SimpleSelect(select.clone()));
            }
            recurse_children(query);
        }
        Query::BinarySelect(_)
        | Query::Insert(_)
        | Query::Update(_)
        | Query::Delete(_)
        | Query::Merge(_) => {
            if let Some(with) = query.with_clause().cloned() {
                let mut with = with;
                prune_with_clause(&mut with, query);
                query.set_with_clause(Some(with));
            }
            recurse_children(query);
        }
        Query::Explain(explain) => prune_query(&mut explain.statement),
        Query::ValuesQuery(_)
        | Query::CreateTable(_)
        | Query::CreateIndex(_)
        | Query::AlterTable(_)
        | Query::DropTable(_)
        | Query::DropIndex(_) => {}
    }
}

/// Recurses into the CTE bodies and nested subqueries that could themselves
/// carry prunable `WITH` clauses, once the top-level one has been resolved.
fn recurse_children(query: &mut Query) {
    use crate::ast::{DataSource, InsertSource};

    fn recurse_source(source: &mut crate::ast::SourceExpression) {
        match &mut source.data_source {
            DataSource::SubQuerySource(q) => prune_query(q),
            DataSource::ParenSource(inner) => recurse_source(inner),
            _ => {}
        }
    }

    if let Some(with) = query.with_clause_mut() {
        for cte in &mut with.tables {
            prune_query(&mut cte.query);
        }
    }
    match query {
        Query::SimpleSelect(select) => {
            if let Some(from) = &mut select.from {
                recurse_source(&mut from.primary);
                for join in &mut from.joins {
                    recurse_source(&mut join.source);
                }
            }
        }
        Query::BinarySelect(binary) => {
            prune_query(&mut binary.left);
            prune_query(&mut binary.right);
        }
        Query::Insert(insert) => {
            if let InsertSource::Select(q) = &mut insert.source {
                prune_query(q);
            }
        }
        Query::Update(update) => {
            recurse_source(&mut update.table);
            if let Some(from) = &mut update.from {
                recurse_source(&mut from.primary);
                for join in &mut from.joins {
                    recurse_source(&mut join.source);
                }
            }
        }
        Query::Delete(delete) => {
            recurse_source(&mut delete.table);
            if let Some(using) = &mut delete.using {
                recurse_source(&mut using.primary);
                for join in &mut using.joins {
                    recurse_source(&mut join.source);
                }
            }
        }
        Query::Merge(merge) => {
            recurse_source(&mut merge.target);
            recurse_source(&mut merge.source);
        }
        _ => {}
    }
}

/// Prunes one `WITH` clause to a fixed point. `owner` is the query the
/// clause decorates (a snapshot taken before pruning, used only to compute
/// the root's table-source set — the CTE bodies themselves are re-read from
/// `with` on every pass so edges always reflect the current entry list).
fn prune_with_clause(with: &mut WithClause, owner: &Query) {
    loop {
        if with.tables.is_empty() {
            return;
        }
        let root_tables: HashSet<String> = TableSourceCollector::collect(owner, true)
            .into_iter()
            .map(|name| name.name.text.to_ascii_lowercase())
            .collect();

        let mut reachable: HashSet<String> = with
            .tables
            .iter()
            .map(|t| t.name.text.to_ascii_lowercase())
            .filter(|name| root_tables.contains(name))
            .collect();

        // Expand reachability: any CTE used by a reachable CTE's own body is
        // reachable too.
        loop {
            let mut grew = false;
            for cte in &with.tables {
                let name = cte.name.text.to_ascii_lowercase();
                if !reachable.contains(&name) {
                    continue;
                }
                let used = TableSourceCollector::collect(&cte.query, false);
                for table in used {
                    let used_name = table.name.text.to_ascii_lowercase();
                    if with
                        .tables
                        .iter()
                        .any(|t| t.name.text.to_ascii_lowercase() == used_name)
                        && reachable.insert(used_name)
                    {
                        grew = true;
                    }
                }
            }
            if !grew {
                break;
            }
        }

        let before = with.tables.len();
        with.tables.retain(|cte| {
            cte.is_recursive || reachable.contains(&cte.name.text.to_ascii_lowercase())
        });
        if with.tables.len() == before {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::IdentifierDialect;
    use crate::parser::parse;

    #[test]
    fn prunes_unused_cte() {
        let mut q = parse(
            "WITH a AS (SELECT 1 AS x), b AS (SELECT 2 AS y) SELECT x FROM a",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        prune_unused_ctes(&mut q);
        let select = q.as_simple_select().unwrap();
        let names: Vec<_> = select
            .with
            .as_ref()
            .unwrap()
            .tables
            .iter()
            .map(|t| t.name.text.clone())
            .collect();
        assert_eq!(names, vec!["a"]);
    }

    #[test]
    fn keeps_transitively_used_cte() {
        let mut q = parse(
            "WITH a AS (SELECT x FROM b), b AS (SELECT 1 AS x) SELECT x FROM a",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        prune_unused_ctes(&mut q);
        let select = q.as_simple_select().unwrap();
        let mut names: Vec<_> = select
            .with
            .as_ref()
            .unwrap()
            .tables
            .iter()
            .map(|t| t.name.text.clone())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn leaves_recursive_cte_untouched() {
        let mut q = parse(
            "WITH RECURSIVE a AS (SELECT 1 AS x) SELECT 1",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        prune_unused_ctes(&mut q);
        let select = q.as_simple_select().unwrap();
        assert_eq!(select.with.as_ref().unwrap().tables.len(), 1);
    }
}
