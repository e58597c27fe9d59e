//! Source-expression node family (§3.1 "Sources").

use enum_as_inner::EnumAsInner;
use serde::{Deserialize, Serialize};
use strum_macros::{Display as StrumDisplay, EnumDiscriminants};

use super::expr::{Expr, FunctionCall, IdentifierString, QualifiedName};
use super::query::{Query, ValuesQuery};
use super::support::{Comments, NodeId, Span};

/// `FROM <datasource> [AS alias]` or a join's right-hand side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceExpression {
    pub id: NodeId,
    pub span: Option<Span>,
    pub comments: Comments,
    pub alias: Option<SourceAliasExpression>,
    pub data_source: DataSource,
}

impl SourceExpression {
    pub fn new(data_source: DataSource) -> Self {
        SourceExpression {
            id: NodeId::new(),
            span: None,
            comments: Comments::default(),
            alias: None,
            data_source,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(SourceAliasExpression {
            name: IdentifierString::new(alias),
            column_aliases: Vec::new(),
        });
        self
    }

    /// The effective name this source is addressed by elsewhere in the
    /// query: its alias if present, else the bare table name (§4.4.1,
    /// §4.4.2 both key off this).
    pub fn effective_name(&self) -> Option<&IdentifierString> {
        if let Some(alias) = &self.alias {
            Some(&alias.name)
        } else if let DataSource::TableSource(name) = &self.data_source {
            Some(&name.name)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceAliasExpression {
    pub name: IdentifierString,
    /// Explicit column aliasing, e.g. `FROM t AS a(x, y)`.
    pub column_aliases: Vec<IdentifierString>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, EnumDiscriminants, EnumAsInner)]
#[strum_discriminants(
    name(DataSourceKind),
    derive(StrumDisplay, Serialize, Deserialize),
    strum(serialize_all = "snake_case")
)]
pub enum DataSource {
    TableSource(QualifiedName),
    SubQuerySource(Box<Query>),
    FunctionSource(FunctionCall),
    ParenSource(Box<SourceExpression>),
    ValuesQuery(ValuesQuery),
}

/// `JoinClause` (§3.1 Clauses).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinClause {
    pub id: NodeId,
    pub comments: Comments,
    pub kind: JoinKind,
    pub lateral: bool,
    pub source: SourceExpression,
    pub condition: JoinCondition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, StrumDisplay)]
#[strum(serialize_all = "snake_case")]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, EnumAsInner)]
pub enum JoinCondition {
    On(Expr),
    Using(Vec<IdentifierString>),
    None,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_name_prefers_alias() {
        let src = SourceExpression::new(DataSource::TableSource(QualifiedName::unqualified(
            "users",
        )))
        .with_alias("u");
        assert_eq!(src.effective_name().unwrap().text, "u");
    }

    #[test]
    fn effective_name_falls_back_to_table_name() {
        let src = SourceExpression::new(DataSource::TableSource(QualifiedName::unqualified(
            "users",
        )));
        assert_eq!(src.effective_name().unwrap().text, "users");
    }
}
