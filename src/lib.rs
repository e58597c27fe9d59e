//! A programmable SQL query manipulation library.
//!
//! Parses SQL text (PostgreSQL-flavored, with MySQL/SQLite/SQL Server
//! identifier styles) into a typed AST, exposes a family of read-only
//! *collectors* and AST-to-AST *transformers* over that tree, and re-emits
//! SQL through a configurable two-stage formatter.
//!
//! ```ascii
//!              SQL text
//!
//!     (parse) │ ▲
//!       parse │ │ format_query
//!             ▼ │
//!
//!           AST (ast::Query)
//!             │
//!   collect::*│ transform::*
//!             │
//!           AST (possibly rewritten)
//!             │
//!   format::format_query
//!             ▼
//!
//!              SQL text
//! ```
//!
//! Entry points: [`parser::parse`]/[`parser::parse_many`] to build a tree,
//! [`format::format_query`] to re-emit one, and the `collect`/`transform`
//! modules for everything in between.

pub mod ast;
pub mod collect;
mod error;
pub mod format;
mod lexeme;
pub mod parser;
mod toposort;
pub mod transform;

pub use error::{Diagnostics, Error, Reason, WithErrorInfo};
pub use format::{format_query, format_queries, FormatOptions, IdentifierDialect};
pub use parser::{parse, parse_many};
