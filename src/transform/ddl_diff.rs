//! DDL diff generator (§4.4.9): compares a current and an expected schema
//! script and emits the migration statements that would bring the former
//! in line with the latter.
//!
//! Every emitted statement is a real `Query` variant (`CreateTable`,
//! `AlterTable`, `CreateIndex`, `DropIndex`, `DropTable`) — unlike the
//! source, which falls back to ad-hoc objects pretending to be AST nodes
//! when a DROP lacks model support (§9 Open Question 2), this generator
//! never needs a workaround because every DDL statement §3.1 lists already
//! has a node.

use std::collections::HashSet;

use crate::ast::{
    AlterAction, AlterTable, ColumnDef, CreateIndex, CreateTable, DropIndex, DropTable, IdentifierString,
    IndexDef, NodeId, QualifiedName, Query, TableConstraint,
};
use crate::error::Error;
use crate::format::{format_query, FormatOptions, IdentifierDialect};
use crate::parser::parse_many;

#[derive(Debug, Clone)]
pub struct DdlDiffOptions {
    /// Signature for constraints/indexes (§4.4.9 point 5): compare by name
    /// when true (and the object has one), else fall back to the
    /// AST-structural signature.
    pub use_names_for_signature: bool,
    pub drop_extra_columns: bool,
    pub drop_extra_constraints: bool,
    pub drop_extra_indexes: bool,
    pub drop_extra_tables: bool,
    pub format: FormatOptions,
}

impl Default for DdlDiffOptions {
    fn default() -> Self {
        DdlDiffOptions {
            use_names_for_signature: true,
            drop_extra_columns: false,
            drop_extra_constraints: false,
            drop_extra_indexes: false,
            drop_extra_tables: false,
            format: FormatOptions::default(),
        }
    }
}

/// One emitted migration statement, carrying both its AST (for callers who
/// want to inspect or further rewrite it) and its rendered text.
#[derive(Debug, Clone)]
pub struct DdlChange {
    pub description: String,
    pub statement: Query,
    pub sql: String,
}

#[derive(Debug, Clone, Default)]
struct TableModel {
    create: Option<CreateTable>,
    indexes: Vec<IndexDef>,
}

/// `{tableName -> TableModel}` built in first-appearance order so the
/// generated diff is deterministic (§4.4.9 point 2).
#[derive(Debug, Default)]
struct ModelSet(Vec<(String, TableModel)>);

impl ModelSet {
    fn get(&self, key: &str) -> Option<&TableModel> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, m)| m)
    }

    fn entry(&mut self, key: String) -> &mut TableModel {
        if self.0.iter().any(|(k, _)| k == &key) {
            &mut self.0.iter_mut().find(|(k, _)| k == &key).unwrap().1
        } else {
            self.0.push((key, TableModel::default()));
            &mut self.0.last_mut().unwrap().1
        }
    }

    fn iter(&self) -> impl Iterator<Item = &(String, TableModel)> {
        self.0.iter()
    }
}

/// Step 1 (§4.4.9): parse every statement, then fold it into the
/// per-table model a "generalized" comparison needs — case and keyword
/// dialect are already normalized by the parser itself (identifiers
/// compare case-insensitively unless quoted, §3.2), so generalization here
/// is just grouping `CREATE TABLE`/`CREATE INDEX` statements by table.
fn build_models(statements: &[Query]) -> ModelSet {
    let mut models = ModelSet::default();
    for statement in statements {
        match statement {
            Query::CreateTable(ct) => {
                let key = ct.name.name.text.to_ascii_lowercase();
                models.entry(key).create = Some(ct.clone());
            }
            Query::CreateIndex(ci) => {
                let key = ci.table.name.text.to_ascii_lowercase();
                models.entry(key).indexes.push(ci.index.clone());
            }
            _ => {}
        }
    }
    models
}

fn push(changes: &mut Vec<DdlChange>, description: String, statement: Query, format: &FormatOptions) {
    let sql = format_query(&statement, format);
    changes.push(DdlChange {
        description,
        statement,
        sql,
    });
}

fn alter(table: &QualifiedName, action: AlterAction) -> Query {
    Query::AlterTable(AlterTable {
        id: NodeId::new(),
        comments: Default::default(),
        table: table.clone(),
        actions: vec![action],
    })
}

fn constraint_signature(constraint: &TableConstraint, use_names: bool) -> Option<String> {
    if use_names {
        constraint.name().map(|n| n.text.to_ascii_lowercase())
    } else {
        Some(constraint.structural_signature())
    }
}

fn index_signature(index: &IndexDef, use_names: bool) -> Option<String> {
    if use_names {
        index.name.as_ref().map(|n| n.text.to_ascii_lowercase())
    } else {
        Some(index.structural_signature())
    }
}

/// §4.4.9 point 4: columns compared by name; missing ones are added,
/// extras optionally dropped.
fn diff_columns(
    table: &QualifiedName,
    current: &[ColumnDef],
    expected: &[ColumnDef],
    options: &DdlDiffOptions,
    changes: &mut Vec<DdlChange>,
) {
    for exp_col in expected {
        if !current.iter().any(|c| c.name.matches(&exp_col.name.text)) {
            push(
                changes,
                format!("add column {}.{}", table.name.text, exp_col.name.text),
                alter(table, AlterAction::AddColumn(exp_col.clone())),
                &options.format,
            );
        }
    }
    if options.drop_extra_columns {
        for cur_col in current {
            if !expected.iter().any(|c| c.name.matches(&cur_col.name.text)) {
                push(
                    changes,
                    format!("drop column {}.{}", table.name.text, cur_col.name.text),
                    alter(table, AlterAction::DropColumn(cur_col.name.clone())),
                    &options.format,
                );
            }
        }
    }
}

/// §4.4.9 point 5, constraints half: extras can only be dropped when named
/// (an unnamed constraint has no `DROP CONSTRAINT` spelling).
fn diff_constraints(
    table: &QualifiedName,
    current: &[TableConstraint],
    expected: &[TableConstraint],
    options: &DdlDiffOptions,
    changes: &mut Vec<DdlChange>,
) {
    let current_sigs: Vec<Option<String>> = current
        .iter()
        .map(|c| constraint_signature(c, options.use_names_for_signature))
        .collect();
    for exp in expected {
        let sig = constraint_signature(exp, options.use_names_for_signature);
        let exists = sig.is_some() && current_sigs.iter().any(|s| s == &sig);
        if !exists {
            push(
                changes,
                format!("add constraint on {}", table.name.text),
                alter(table, AlterAction::AddConstraint(exp.clone())),
                &options.format,
            );
        }
    }
    if options.drop_extra_constraints {
        let expected_sigs: Vec<Option<String>> = expected
            .iter()
            .map(|c| constraint_signature(c, options.use_names_for_signature))
            .collect();
        for cur in current {
            let sig = constraint_signature(cur, options.use_names_for_signature);
            let exists = sig.is_some() && expected_sigs.iter().any(|s| s == &sig);
            if !exists {
                if let Some(name) = cur.name() {
                    push(
                        changes,
                        format!("drop constraint {}", name.text),
                        alter(table, AlterAction::DropConstraint(name.clone())),
                        &options.format,
                    );
                }
            }
        }
    }
}

/// §4.4.9 point 5, index half, mirroring `diff_constraints`.
fn diff_indexes(
    table: &QualifiedName,
    current: &[IndexDef],
    expected: &[IndexDef],
    options: &DdlDiffOptions,
    changes: &mut Vec<DdlChange>,
) {
    let current_sigs: Vec<Option<String>> = current
        .iter()
        .map(|i| index_signature(i, options.use_names_for_signature))
        .collect();
    for exp in expected {
        let sig = index_signature(exp, options.use_names_for_signature);
        let exists = sig.is_some() && current_sigs.iter().any(|s| s == &sig);
        if !exists {
            push(
                changes,
                format!("create index on {}", table.name.text),
                Query::CreateIndex(CreateIndex {
                    id: NodeId::new(),
                    comments: Default::default(),
                    table: table.clone(),
                    index: exp.clone(),
                }),
                &options.format,
            );
        }
    }
    if options.drop_extra_indexes {
        let expected_sigs: Vec<Option<String>> = expected
            .iter()
            .map(|i| index_signature(i, options.use_names_for_signature))
            .collect();
        for cur in current {
            let sig = index_signature(cur, options.use_names_for_signature);
            let exists = sig.is_some() && expected_sigs.iter().any(|s| s == &sig);
            if !exists {
                if let Some(name) = &cur.name {
                    push(
                        changes,
                        format!("drop index {}", name.text),
                        Query::DropIndex(DropIndex {
                            id: NodeId::new(),
                            comments: Default::default(),
                            name: QualifiedName::unqualified(name.text.clone()),
                            if_exists: false,
                        }),
                        &options.format,
                    );
                }
            }
        }
    }
}

fn new_table_statements(
    ct: &CreateTable,
    indexes: &[IndexDef],
    options: &DdlDiffOptions,
    changes: &mut Vec<DdlChange>,
) {
    push(
        changes,
        format!("create table {}", ct.name.name.text),
        Query::CreateTable(ct.clone()),
        &options.format,
    );
    for constraint in &ct.constraints {
        push(
            changes,
            format!("add constraint on {}", ct.name.name.text),
            alter(&ct.name, AlterAction::AddConstraint(constraint.clone())),
            &options.format,
        );
    }
    for index in indexes {
        push(
            changes,
            format!("create index on {}", ct.name.name.text),
            Query::CreateIndex(CreateIndex {
                id: NodeId::new(),
                comments: Default::default(),
                table: ct.name.clone(),
                index: index.clone(),
            }),
            &options.format,
        );
    }
}

/// Diffs `current_sql` against `expected_sql` (§4.4.9), returning the
/// ordered migration statements that would turn the former into the
/// latter. Statements are emitted table-by-table in the order the expected
/// script declares them; optional `DROP TABLE`s for tables absent from the
/// expected script are appended last.
pub fn diff_ddl(
    current_sql: &str,
    expected_sql: &str,
    dialect: IdentifierDialect,
    options: &DdlDiffOptions,
) -> Result<Vec<DdlChange>, Error> {
    let current_stmts = parse_many(current_sql, dialect)?;
    let expected_stmts = parse_many(expected_sql, dialect)?;
    let current = build_models(&current_stmts);
    let expected = build_models(&expected_stmts);

    let mut changes = Vec::new();

    for (key, exp_model) in expected.iter() {
        match current.get(key) {
            None => {
                if let Some(ct) = &exp_model.create {
                    new_table_statements(ct, &exp_model.indexes, options, &mut changes);
                }
            }
            Some(cur_model) => {
                if let (Some(cur_ct), Some(exp_ct)) = (&cur_model.create, &exp_model.create) {
                    diff_columns(&exp_ct.name, &cur_ct.columns, &exp_ct.columns, options, &mut changes);
                    diff_constraints(
                        &exp_ct.name,
                        &cur_ct.constraints,
                        &exp_ct.constraints,
                        options,
                        &mut changes,
                    );
                    diff_indexes(
                        &exp_ct.name,
                        &cur_model.indexes,
                        &exp_model.indexes,
                        options,
                        &mut changes,
                    );
                }
            }
        }
    }

    if options.drop_extra_tables {
        let expected_keys: HashSet<&str> = expected.iter().map(|(k, _)| k.as_str()).collect();
        for (key, cur_model) in current.iter() {
            if expected_keys.contains(key.as_str()) {
                continue;
            }
            if let Some(ct) = &cur_model.create {
                push(
                    &mut changes,
                    format!("drop table {}", ct.name.name.text),
                    Query::DropTable(DropTable {
                        id: NodeId::new(),
                        comments: Default::default(),
                        name: ct.name.clone(),
                        if_exists: false,
                    }),
                    &options.format,
                );
            }
        }
    }

    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_line(changes: &[DdlChange]) -> Vec<String> {
        changes.iter().map(|c| c.sql.clone()).collect()
    }

    #[test]
    fn new_table_emits_create_plus_constraints_and_indexes() {
        let mut options = DdlDiffOptions::default();
        options.format = FormatOptions::default().as_one_line();
        let changes = diff_ddl(
            "",
            "CREATE TABLE users (id INT PRIMARY KEY, email TEXT, CONSTRAINT uq_email UNIQUE (email)); \
             CREATE INDEX idx_users_email ON users (email);",
            IdentifierDialect::Postgres,
            &options,
        )
        .unwrap();
        let sqls = one_line(&changes);
        assert_eq!(sqls.len(), 3);
        assert!(sqls[0].starts_with("CREATE TABLE users"));
        assert!(sqls[1].contains("ADD CONSTRAINT uq_email UNIQUE (email)"));
        assert!(sqls[2].starts_with("CREATE INDEX idx_users_email ON users"));
    }

    #[test]
    fn missing_column_emits_add_column() {
        let mut options = DdlDiffOptions::default();
        options.format = FormatOptions::default().as_one_line();
        let changes = diff_ddl(
            "CREATE TABLE users (id INT);",
            "CREATE TABLE users (id INT, email TEXT);",
            IdentifierDialect::Postgres,
            &options,
        )
        .unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].sql, "ALTER TABLE users ADD COLUMN email TEXT");
    }

    #[test]
    fn unnamed_constraint_matches_structurally_when_names_disabled() {
        let mut options = DdlDiffOptions::default();
        options.use_names_for_signature = false;
        let changes = diff_ddl(
            "CREATE TABLE users (id INT, email TEXT, UNIQUE (email));",
            "CREATE TABLE users (id INT, email TEXT, CONSTRAINT uq_email UNIQUE (email));",
            IdentifierDialect::Postgres,
            &options,
        )
        .unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn drop_extra_tables_is_opt_in() {
        let base = DdlDiffOptions::default();
        let changes = diff_ddl(
            "CREATE TABLE legacy (id INT); CREATE TABLE users (id INT);",
            "CREATE TABLE users (id INT);",
            IdentifierDialect::Postgres,
            &base,
        )
        .unwrap();
        assert!(changes.is_empty());

        let mut dropping = base;
        dropping.drop_extra_tables = true;
        dropping.format = FormatOptions::default().as_one_line();
        let changes = diff_ddl(
            "CREATE TABLE legacy (id INT); CREATE TABLE users (id INT);",
            "CREATE TABLE users (id INT);",
            IdentifierDialect::Postgres,
            &dropping,
        )
        .unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].sql, "DROP TABLE legacy");
    }
}
