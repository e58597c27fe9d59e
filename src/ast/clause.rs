//! Clause node family (§3.1 "Clauses").

use serde::{Deserialize, Serialize};

use super::expr::{Expr, IdentifierString, OrderByItem, WindowFrameExpression};
use super::query::Query;
use super::source::{JoinClause, SourceExpression};
use super::support::{Comments, NodeId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithClause {
    pub id: NodeId,
    pub comments: Comments,
    pub recursive: bool,
    pub tables: Vec<CommonTable>,
}

/// A named CTE (§3.1, GLOSSARY "CTE").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonTable {
    pub id: NodeId,
    pub comments: Comments,
    pub name: IdentifierString,
    pub column_names: Vec<IdentifierString>,
    pub query: Box<Query>,
    /// Set when this entry originally used `WITH RECURSIVE` by itself
    /// (relevant to the composer, §4.4.8 point d).
    pub is_recursive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectClause {
    pub id: NodeId,
    pub comments: Comments,
    pub distinct: bool,
    pub items: Vec<SelectItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectItem {
    /// `expr [AS alias]`.
    Expr {
        value: Expr,
        alias: Option<IdentifierString>,
    },
    /// Bare `*` or `alias.*`.
    Wildcard { qualifier: Option<IdentifierString> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FromClause {
    pub id: NodeId,
    pub comments: Comments,
    pub primary: SourceExpression,
    pub joins: Vec<JoinClause>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhereClause {
    pub id: NodeId,
    pub comments: Comments,
    pub condition: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupByClause {
    pub id: NodeId,
    pub comments: Comments,
    pub items: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HavingClause {
    pub id: NodeId,
    pub comments: Comments,
    pub condition: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderByClause {
    pub id: NodeId,
    pub comments: Comments,
    pub items: Vec<OrderByItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowsClause {
    pub id: NodeId,
    pub comments: Comments,
    pub windows: Vec<(IdentifierString, WindowFrameExpression)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitClause {
    pub id: NodeId,
    pub comments: Comments,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OffsetClause {
    pub id: NodeId,
    pub comments: Comments,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchClause {
    pub id: NodeId,
    pub comments: Comments,
    pub value: Expr,
    pub with_ties: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForMode {
    Update,
    Share,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForClause {
    pub id: NodeId,
    pub comments: Comments,
    pub mode: ForMode,
    pub of: Vec<IdentifierString>,
    pub nowait: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturningClause {
    pub id: NodeId,
    pub comments: Comments,
    pub items: Vec<SelectItem>,
}

/// `SET col = expr, ...` on an `UPDATE` (§3.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetClause {
    pub id: NodeId,
    pub comments: Comments,
    pub assignments: Vec<(IdentifierString, Expr)>,
}
