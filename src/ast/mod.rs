//! The typed SQL AST (§3): node families for queries, clauses, sources and
//! value expressions, plus the visitor protocol that walks them (§4.1).

pub mod clause;
pub mod ddl;
pub mod expr;
pub mod fold;
pub mod query;
pub mod source;
pub mod support;

pub use clause::*;
pub use ddl::*;
pub use expr::*;
pub use fold::Visitor;
pub use query::*;
pub use source::*;
pub use support::*;
