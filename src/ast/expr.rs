//! Value-expression node family (§3.1 "Value expressions").

use enum_as_inner::EnumAsInner;
use serde::{Deserialize, Serialize};
use strum_macros::{Display as StrumDisplay, EnumDiscriminants};

use super::query::Query;
use super::support::{Comments, NodeId, NullsOrder, OrderDirection, Span};

/// One value expression and everything a node needs per §3.1: identity, the
/// variant payload (`kind`), a span and a comment list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub id: NodeId,
    pub span: Option<Span>,
    pub comments: Comments,
    pub kind: ExprKind,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Expr {
            id: NodeId::new(),
            span: None,
            comments: Comments::default(),
            kind,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// The node's stable kind tag, used by visitor dispatch (§4.1) and by
    /// the formatter's token lowering (§4.5.2).
    pub fn tag(&self) -> ExprKindTag {
        ExprKindTag::from(&self.kind)
    }
}

/// One qualified name segment chain, e.g. `schema.table.column` or a bare
/// `column`. Used both as a standalone node (`QualifiedName`) and as the
/// payload of a `ColumnReference`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualifiedName {
    /// Leading namespace segments, outermost first (e.g. `["schema",
    /// "table"]`).
    pub namespaces: Vec<IdentifierString>,
    pub name: IdentifierString,
}

impl QualifiedName {
    pub fn unqualified(name: impl Into<String>) -> Self {
        QualifiedName {
            namespaces: Vec::new(),
            name: IdentifierString::new(name),
        }
    }

    pub fn qualified(namespaces: Vec<impl Into<String>>, name: impl Into<String>) -> Self {
        QualifiedName {
            namespaces: namespaces.into_iter().map(IdentifierString::new).collect(),
            name: IdentifierString::new(name),
        }
    }

    /// The last namespace segment, interpreted as a table/source alias when
    /// this name is a column reference (`alias.column` → `alias`).
    pub fn first_namespace(&self) -> Option<&str> {
        self.namespaces.first().map(|s| s.text.as_str())
    }
}

/// An identifier as written in source: text plus whether it was
/// double/back/bracket-quoted (which disables case-insensitive alias
/// matching, §3.2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierString {
    pub text: String,
    pub quoted: bool,
}

impl IdentifierString {
    pub fn new(text: impl Into<String>) -> Self {
        IdentifierString {
            text: text.into(),
            quoted: false,
        }
    }

    pub fn quoted(text: impl Into<String>) -> Self {
        IdentifierString {
            text: text.into(),
            quoted: true,
        }
    }

    /// Case-insensitive comparison unless either side is quoted (§3.2 alias
    /// identity).
    pub fn matches(&self, other: &str) -> bool {
        if self.quoted {
            self.text == other
        } else {
            self.text.eq_ignore_ascii_case(other)
        }
    }
}

/// A raw, unparsed string payload — used for `s"..."`-style escape hatches
/// during diffing/generalization (§4.4.9) where we deliberately don't
/// interpret vendor syntax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawString {
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, StrumDisplay)]
#[strum(serialize_all = "UPPERCASE")]
pub enum BinaryOperator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Concat,
    Like,
    NotLike,
    ILike,
    NotILike,
    In,
    NotIn,
    Is,
    IsNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, StrumDisplay)]
#[strum(serialize_all = "UPPERCASE")]
pub enum UnaryOperator {
    Not,
    Negative,
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseExpression {
    /// `CASE operand WHEN ...` (simple) vs `CASE WHEN cond ...` (searched).
    pub operand: Option<Box<Expr>>,
    pub when_clauses: Vec<(Expr, Expr)>,
    pub else_clause: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastExpression {
    pub expr: Box<Expr>,
    pub target_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetweenExpression {
    pub expr: Box<Expr>,
    pub negated: bool,
    pub low: Box<Expr>,
    pub high: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: QualifiedName,
    pub distinct: bool,
    pub args: Vec<Expr>,
    pub over: Option<Box<WindowFrameExpression>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowFrameExpression {
    pub partition_by: Vec<Expr>,
    pub order_by: Vec<OrderByItem>,
    pub frame: Option<FrameSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSpec {
    pub unit: FrameUnit,
    pub start: FrameBound,
    pub end: Option<FrameBound>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, StrumDisplay)]
#[strum(serialize_all = "UPPERCASE")]
pub enum FrameUnit {
    Rows,
    Range,
    Groups,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FrameBound {
    UnboundedPreceding,
    UnboundedFollowing,
    CurrentRow,
    Preceding(Box<Expr>),
    Following(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderByItem {
    pub value: Expr,
    pub direction: Option<OrderDirection>,
    pub nulls: Option<NullsOrder>,
}

/// A literal, kept as typed source text rather than parsed into a Rust
/// number, matching the tokenizer contract's own lexeme classification
/// (§6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiteralValue {
    Number(String),
    String(String),
    Boolean(bool),
    Null,
}

/// The value-expression node family of §3.1. One `ExprKindTag` variant per
/// kind, generated by `strum::EnumDiscriminants` — this is the "central
/// kind-tag table" the Design Notes call for, used by the formatter's
/// lowering step to choose a token-building routine (§4.5.2) without
/// needing virtual dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, EnumDiscriminants, EnumAsInner)]
#[strum_discriminants(
    name(ExprKindTag),
    derive(StrumDisplay, Serialize, Deserialize),
    strum(serialize_all = "snake_case")
)]
pub enum ExprKind {
    ColumnReference(QualifiedName),
    Literal(LiteralValue),
    Parameter(String),
    Binary {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOperator,
        expr: Box<Expr>,
    },
    FunctionCall(FunctionCall),
    Case(CaseExpression),
    Cast(CastExpression),
    Between(BetweenExpression),
    InlineQuery(Box<Query>),
    /// `[NOT] EXISTS (subquery)` (§4.4.4): a standalone boolean predicate,
    /// distinct from `InlineQuery` which is a scalar/row subquery used as a
    /// value.
    Exists {
        negated: bool,
        query: Box<Query>,
    },
    Array(Vec<Expr>),
    ArrayQuery(Box<Query>),
    ValueList(Vec<Expr>),
    WindowFrame(WindowFrameExpression),
    Paren(Box<Expr>),
    Tuple(Vec<Expr>),
    RawString(RawString),
    IdentifierString(IdentifierString),
    QualifiedName(QualifiedName),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_match_is_case_insensitive_unless_quoted() {
        let bare = IdentifierString::new("Users");
        assert!(bare.matches("users"));

        let quoted = IdentifierString::quoted("Users");
        assert!(!quoted.matches("users"));
    }

    #[test]
    fn tag_reflects_variant() {
        let e = Expr::new(ExprKind::Literal(LiteralValue::Null));
        assert_eq!(e.tag(), ExprKindTag::Literal);
    }
}
