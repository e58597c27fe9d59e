//! AST-to-AST transformers (§4.4): read the tree built by `parser` (possibly
//! informed by a `collect` pass), rewrite it in place, and hand it back to
//! `format` for re-emission. Each submodule implements one §4.4.N entry.

mod cte_compose;
mod cte_pruner;
mod ddl_diff;
mod dml_to_select;
mod exists_injector;
mod json_cte_builder;
mod left_join_pruner;
mod schema_meta;
mod sort_injector;
mod upstream_select_finder;

pub use cte_compose::{compose_ctes, decompose_ctes, ComposeOptions};
pub use cte_pruner::prune_unused_ctes;
pub use ddl_diff::{diff_ddl, DdlChange, DdlDiffOptions};
pub use dml_to_select::{
    delete_to_select, insert_to_select, merge_to_select, update_to_select, ConvertOptions,
    FixtureTable, MissingFixtureStrategy,
};
pub use exists_injector::{inject as inject_exists, ExistsInstruction, ExistsMode, InjectOptions};
pub use json_cte_builder::{build_json_aggregation_cte, EntityNode, JsonCteOptions};
pub use left_join_pruner::prune_unused_left_joins;
pub use schema_meta::{SchemaMetadata, TableSchema};
pub use sort_injector::{inject as inject_sort, SortInstruction};
pub use upstream_select_finder::{find_upstream_select_mut, resolve_anchor_value, select_satisfies};
