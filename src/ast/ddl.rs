//! DDL node family (§3.1 "Queries": `CreateTable`, `CreateIndex`,
//! `AlterTable`, `DropTable`, `DropIndex`) and the shared column/constraint
//! shapes the diff generator (§4.4.9) compares.

use serde::{Deserialize, Serialize};

use super::expr::{Expr, IdentifierString, QualifiedName};
use super::support::{Comments, NodeId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: IdentifierString,
    pub data_type: String,
    pub constraints: Vec<ColumnConstraint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnConstraint {
    NotNull,
    Null,
    PrimaryKey,
    Unique,
    Default(Expr),
    Check(Expr),
    References {
        table: QualifiedName,
        column: Option<IdentifierString>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableConstraint {
    PrimaryKey {
        name: Option<IdentifierString>,
        columns: Vec<IdentifierString>,
    },
    Unique {
        name: Option<IdentifierString>,
        columns: Vec<IdentifierString>,
    },
    Check {
        name: Option<IdentifierString>,
        predicate: Expr,
    },
    ForeignKey {
        name: Option<IdentifierString>,
        columns: Vec<IdentifierString>,
        references_table: QualifiedName,
        references_columns: Vec<IdentifierString>,
    },
}

impl TableConstraint {
    pub fn name(&self) -> Option<&IdentifierString> {
        match self {
            TableConstraint::PrimaryKey { name, .. }
            | TableConstraint::Unique { name, .. }
            | TableConstraint::Check { name, .. }
            | TableConstraint::ForeignKey { name, .. } => name.as_ref(),
        }
    }

    pub fn is_unique(&self) -> bool {
        matches!(
            self,
            TableConstraint::PrimaryKey { .. } | TableConstraint::Unique { .. }
        )
    }

    /// The AST-structural signature used when name-based comparison is
    /// disabled (§4.4.9 point 5): kind plus the columns/predicate/targets it
    /// covers, ignoring the constraint's own name.
    pub fn structural_signature(&self) -> String {
        match self {
            TableConstraint::PrimaryKey { columns, .. } => {
                format!("primary_key({})", join_names(columns))
            }
            TableConstraint::Unique { columns, .. } => format!("unique({})", join_names(columns)),
            TableConstraint::Check { predicate, .. } => {
                format!("check({:?})", predicate.kind)
            }
            TableConstraint::ForeignKey {
                columns,
                references_table,
                references_columns,
                ..
            } => format!(
                "foreign_key({})->{}({})",
                join_names(columns),
                references_table.name.text,
                join_names(references_columns)
            ),
        }
    }
}

fn join_names(names: &[IdentifierString]) -> String {
    names
        .iter()
        .map(|n| n.text.clone())
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDef {
    pub name: Option<IdentifierString>,
    pub unique: bool,
    pub using: Option<String>,
    pub columns: Vec<IndexColumn>,
    pub include: Vec<IdentifierString>,
    pub predicate: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexColumn {
    pub column: IdentifierString,
    pub direction: Option<super::support::OrderDirection>,
    pub nulls: Option<super::support::NullsOrder>,
}

impl IndexDef {
    /// Structural signature ignoring the index's own name (§4.4.9 point 5):
    /// kind, referenced columns, predicate, include list, UNIQUE flag and
    /// USING method.
    pub fn structural_signature(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| format!("{}:{:?}:{:?}", c.column.text, c.direction, c.nulls))
            .collect::<Vec<_>>()
            .join(",");
        let include = join_names(&self.include);
        format!(
            "unique={} using={:?} cols=({}) include=({}) predicate={:?}",
            self.unique,
            self.using,
            columns,
            include,
            self.predicate.as_ref().map(|p| format!("{:?}", p.kind))
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTable {
    pub id: NodeId,
    pub comments: Comments,
    pub name: QualifiedName,
    pub if_not_exists: bool,
    pub columns: Vec<ColumnDef>,
    pub constraints: Vec<TableConstraint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateIndex {
    pub id: NodeId,
    pub comments: Comments,
    pub table: QualifiedName,
    pub index: IndexDef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlterTable {
    pub id: NodeId,
    pub comments: Comments,
    pub table: QualifiedName,
    pub actions: Vec<AlterAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AlterAction {
    AddColumn(ColumnDef),
    DropColumn(IdentifierString),
    AddConstraint(TableConstraint),
    DropConstraint(IdentifierString),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropTable {
    pub id: NodeId,
    pub comments: Comments,
    pub name: QualifiedName,
    pub if_exists: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropIndex {
    pub id: NodeId,
    pub comments: Comments,
    pub name: QualifiedName,
    pub if_exists: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_signature_ignores_name() {
        let a = TableConstraint::Unique {
            name: Some(IdentifierString::new("uq_a")),
            columns: vec![IdentifierString::new("email")],
        };
        let b = TableConstraint::Unique {
            name: Some(IdentifierString::new("uq_b")),
            columns: vec![IdentifierString::new("email")],
        };
        assert_eq!(a.structural_signature(), b.structural_signature());
    }
}
