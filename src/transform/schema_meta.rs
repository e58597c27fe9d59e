//! Schema metadata shared by the transformers that need more than a
//! caller-supplied resolver closure (§4.4.1's `{tableName, columns,
//! uniqueKeys[]}`, §4.4.9's per-table column/constraint/index model).

use std::collections::HashMap;

/// One table's shape as supplied by the caller — not derived from the AST
/// (that's what the [`crate::collect::SchemaCollector`] is for); this is
/// ground-truth metadata a caller hands in, e.g. from an information_schema
/// query.
#[derive(Debug, Clone, Default)]
pub struct TableSchema {
    pub columns: Vec<String>,
    /// Each entry is one unique constraint's column list. A singleton entry
    /// `vec!["id"]` is what the LEFT-JOIN pruner looks for (§4.4.1 point
    /// 2d).
    pub unique_keys: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct SchemaMetadata(pub HashMap<String, TableSchema>);

impl SchemaMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: impl Into<String>, schema: TableSchema) -> Self {
        self.0.insert(name.into(), schema);
        self
    }

    /// Case-insensitive lookup, matching how real table names compare
    /// elsewhere in the AST (§3.2 alias identity).
    pub fn get(&self, name: &str) -> Option<&TableSchema> {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }
}
