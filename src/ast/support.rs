//! Shared scaffolding used by every node family: identity, source spans and
//! comment attachment (§3.1, §3.3).

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Stable identity of a node, used by visitors to guard against re-entry
/// (§3.2 "visitor safety") and by collectors that dedupe "by node identity"
/// (e.g. the CTE collector, §4.3).
///
/// Nodes are owned exactly once (§3.2 "uniqueness of ownership"), so two
/// `NodeId`s are never attached to the same live node — but traversals that
/// *recurse by name* (an upstream collector following a table reference into
/// a CTE body) can still reach the same node twice, which is what the
/// visited-set guards against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u64);

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

impl NodeId {
    pub fn new() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Byte-offset range into the original SQL text, as produced by the
/// tokenizer contract (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }
}

/// A single comment lexeme as delivered by the tokenizer (§6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    pub span: Option<Span>,
    /// `--` / `#` line comments vs `/* ... */` block comments.
    pub is_block: bool,
}

/// The comment list attached to a node (§3.1): comments that appear before a
/// node's own tokens, a single trailing same-line comment, and comments that
/// trail a node's closing tokens before the next sibling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comments {
    pub leading: Vec<Comment>,
    pub inline: Option<Comment>,
    pub trailing: Vec<Comment>,
}

impl Comments {
    pub fn is_empty(&self) -> bool {
        self.leading.is_empty() && self.inline.is_none() && self.trailing.is_empty()
    }
}

/// `ASC`/`DESC` on an `ORDER BY` item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDirection {
    Asc,
    Desc,
}

/// `NULLS FIRST`/`NULLS LAST`, omitted when neither flag was set (§4.4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NullsOrder {
    First,
    Last,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_are_unique() {
        let a = NodeId::new();
        let b = NodeId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn empty_comments_is_empty() {
        assert!(Comments::default().is_empty());
    }
}
