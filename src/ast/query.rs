//! Query node family (§3.1 "Queries"): the top-level statement variants.

use enum_as_inner::EnumAsInner;
use serde::{Deserialize, Serialize};
use strum_macros::{Display as StrumDisplay, EnumDiscriminants};

use super::clause::{
    FetchClause, ForClause, FromClause, GroupByClause, HavingClause, LimitClause, OffsetClause,
    OrderByClause, ReturningClause, SelectClause, SelectItem, SetClause, WhereClause,
    WindowsClause, WithClause,
};
use super::ddl::{AlterTable, CreateIndex, CreateTable, DropIndex, DropTable};
use super::expr::{Expr, IdentifierString, QualifiedName};
use super::source::SourceExpression;
use super::support::{Comments, NodeId};

/// A `SELECT` with no set operator — the workhorse node every clause
/// collector and transformer ultimately operates on (§3.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleSelect {
    pub id: NodeId,
    pub comments: Comments,
    pub with: Option<WithClause>,
    pub select: SelectClause,
    pub from: Option<FromClause>,
    pub r#where: Option<WhereClause>,
    pub group_by: Option<GroupByClause>,
    pub having: Option<HavingClause>,
    pub windows: Option<WindowsClause>,
    pub order_by: Option<OrderByClause>,
    pub limit: Option<LimitClause>,
    pub offset: Option<OffsetClause>,
    pub fetch: Option<FetchClause>,
    pub for_clause: Option<ForClause>,
    pub returning: Option<ReturningClause>,
}

impl SimpleSelect {
    pub fn empty() -> Self {
        SimpleSelect {
            id: NodeId::new(),
            comments: Comments::default(),
            with: None,
            select: SelectClause {
                id: NodeId::new(),
                comments: Comments::default(),
                distinct: false,
                items: Vec::new(),
            },
            from: None,
            r#where: None,
            group_by: None,
            having: None,
            windows: None,
            order_by: None,
            limit: None,
            offset: None,
            fetch: None,
            for_clause: None,
            returning: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, StrumDisplay)]
#[strum(serialize_all = "UPPERCASE")]
pub enum SetOperator {
    Union,
    UnionAll,
    Intersect,
    IntersectAll,
    Except,
    ExceptAll,
}

/// `left <set-op> right` (§3.2 "binary set-ops": both sides must produce
/// the same output arity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinarySelect {
    pub id: NodeId,
    pub comments: Comments,
    pub with: Option<WithClause>,
    pub left: Box<Query>,
    pub op: SetOperator,
    pub right: Box<Query>,
    pub order_by: Option<OrderByClause>,
    pub limit: Option<LimitClause>,
    pub offset: Option<OffsetClause>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuesQuery {
    pub id: NodeId,
    pub comments: Comments,
    pub rows: Vec<Vec<Expr>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InsertSource {
    Values(ValuesQuery),
    Select(Box<Query>),
    DefaultValues,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insert {
    pub id: NodeId,
    pub comments: Comments,
    pub with: Option<WithClause>,
    pub table: QualifiedName,
    pub columns: Vec<IdentifierString>,
    pub source: InsertSource,
    pub returning: Option<ReturningClause>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub id: NodeId,
    pub comments: Comments,
    pub with: Option<WithClause>,
    pub table: SourceExpression,
    pub set: SetClause,
    pub from: Option<FromClause>,
    pub r#where: Option<WhereClause>,
    pub returning: Option<ReturningClause>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delete {
    pub id: NodeId,
    pub comments: Comments,
    pub with: Option<WithClause>,
    pub table: SourceExpression,
    pub using: Option<FromClause>,
    pub r#where: Option<WhereClause>,
    pub returning: Option<ReturningClause>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeMatchType {
    Matched,
    NotMatched,
    NotMatchedBySource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MergeAction {
    Insert {
        columns: Vec<IdentifierString>,
        values: Vec<Expr>,
    },
    Update(SetClause),
    Delete,
    DoNothing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeWhen {
    pub match_type: MergeMatchType,
    /// Extra `AND <condition>` qualifying this branch, beyond the merge's
    /// `ON` (§4.4.6 "MERGE": `action.WHERE`).
    pub condition: Option<Expr>,
    pub action: MergeAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Merge {
    pub id: NodeId,
    pub comments: Comments,
    pub with: Option<WithClause>,
    pub target: SourceExpression,
    pub source: SourceExpression,
    pub on: Expr,
    pub when_clauses: Vec<MergeWhen>,
    pub returning: Option<ReturningClause>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explain {
    pub id: NodeId,
    pub comments: Comments,
    pub analyze: bool,
    pub statement: Box<Query>,
}

/// The top-level statement enum: one variant per §3.1 "Queries" entry. This
/// is the single kind-tag table the visitor protocol (§4.1) and the
/// formatter's lowering step (§4.5.2) dispatch on for whole statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, EnumDiscriminants, EnumAsInner)]
#[strum_discriminants(
    name(QueryKind),
    derive(StrumDisplay, Serialize, Deserialize),
    strum(serialize_all = "snake_case")
)]
pub enum Query {
    SimpleSelect(SimpleSelect),
    BinarySelect(BinarySelect),
    ValuesQuery(ValuesQuery),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
    Merge(Merge),
    CreateTable(CreateTable),
    CreateIndex(CreateIndex),
    AlterTable(AlterTable),
    DropTable(DropTable),
    DropIndex(DropIndex),
    Explain(Explain),
}

impl Query {
    pub fn id(&self) -> NodeId {
        match self {
            Query::SimpleSelect(q) => q.id,
            Query::BinarySelect(q) => q.id,
            Query::ValuesQuery(q) => q.id,
            Query::Insert(q) => q.id,
            Query::Update(q) => q.id,
            Query::Delete(q) => q.id,
            Query::Merge(q) => q.id,
            Query::CreateTable(q) => q.id,
            Query::CreateIndex(q) => q.id,
            Query::AlterTable(q) => q.id,
            Query::DropTable(q) => q.id,
            Query::DropIndex(q) => q.id,
            Query::Explain(q) => q.id,
        }
    }

    /// The node's WITH clause, when this variant can carry one. DML/DDL
    /// statements other than `SimpleSelect`/`BinarySelect`/`Insert`/`Update`/
    /// `Delete`/`Merge` never have one.
    pub fn with_clause(&self) -> Option<&WithClause> {
        match self {
            Query::SimpleSelect(q) => q.with.as_ref(),
            Query::BinarySelect(q) => q.with.as_ref(),
            Query::Insert(q) => q.with.as_ref(),
            Query::Update(q) => q.with.as_ref(),
            Query::Delete(q) => q.with.as_ref(),
            Query::Merge(q) => q.with.as_ref(),
            _ => None,
        }
    }

    pub fn with_clause_mut(&mut self) -> Option<&mut WithClause> {
        match self {
            Query::SimpleSelect(q) => q.with.as_mut(),
            Query::BinarySelect(q) => q.with.as_mut(),
            Query::Insert(q) => q.with.as_mut(),
            Query::Update(q) => q.with.as_mut(),
            Query::Delete(q) => q.with.as_mut(),
            Query::Merge(q) => q.with.as_mut(),
            _ => None,
        }
    }

    pub fn set_with_clause(&mut self, with: Option<WithClause>) {
        match self {
            Query::SimpleSelect(q) => q.with = with,
            Query::BinarySelect(q) => q.with = with,
            Query::Insert(q) => q.with = with,
            Query::Update(q) => q.with = with,
            Query::Delete(q) => q.with = with,
            Query::Merge(q) => q.with = with,
            _ => {}
        }
    }
}

/// `SELECT *` used as a convenience default, e.g. by fixture-shadowing CTE
/// construction (§4.4.6) that needs a placeholder projection.
pub fn select_star(from: SourceExpression) -> SimpleSelect {
    let mut q = SimpleSelect::empty();
    q.select.items.push(SelectItem::Wildcard { qualifier: None });
    q.from = Some(FromClause {
        id: NodeId::new(),
        comments: Comments::default(),
        primary: from,
        joins: Vec::new(),
    });
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::source::DataSource;

    #[test]
    fn query_kind_tags_match_variant() {
        let q = Query::SimpleSelect(SimpleSelect::empty());
        assert_eq!(QueryKind::from(&q), QueryKind::SimpleSelect);
    }

    #[test]
    fn select_star_builds_wildcard_projection() {
        let src = SourceExpression::new(DataSource::TableSource(QualifiedName::unqualified("t")));
        let q = select_star(src);
        assert_eq!(q.select.items.len(), 1);
    }
}
