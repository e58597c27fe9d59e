//! Collectors (§4.3): read-only passes over the AST that gather facts for
//! callers and transformers to act on. Every collector here is built on top
//! of the [`crate::ast::Visitor`] protocol or direct recursion over the
//! query/source shapes, never both — see each submodule for which.

mod column_reference;
mod cte;
mod parameter;
mod schema;
mod selectable;
mod table_source;

pub use column_reference::collect_column_references;
pub use cte::CteCollector;
pub use parameter::{collect_parameter_names, unresolvable_parameters};
pub use schema::{SchemaAnalysis, SchemaCollector, SchemaMap, TableColumnResolver as SchemaColumnResolver};
pub use selectable::{
    DedupMode, SelectableColumn, SelectableColumnCollector,
    TableColumnResolver as SelectableColumnResolver,
};
pub use table_source::TableSourceCollector;
