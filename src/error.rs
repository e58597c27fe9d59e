//! Error taxonomy (§7), grounded in `prql-compiler/src/error.rs`'s
//! `Span`/`Error`/`Reason` shape.

pub use anyhow::Result as AnyResult;

use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

use crate::ast::Span;

/// Why a call failed. `Simple`/`Expected`/`Unexpected`/`NotFound` mirror the
/// teacher; `InvariantViolation` and `SemanticRejection` cover the two
/// taxonomy entries from §7 the teacher has no equivalent for (AST
/// invariants, §3.2; and rejected EXISTS/sort instructions, §4.4.4/§4.4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Reason {
    Simple(String),
    Expected {
        who: Option<String>,
        expected: String,
        found: String,
    },
    Unexpected {
        found: String,
    },
    NotFound {
        name: String,
        namespace: String,
    },
    InvariantViolation(String),
    SemanticRejection(String),
}

impl Reason {
    fn message(&self) -> String {
        match self {
            Reason::Simple(text) => text.clone(),
            Reason::Expected {
                who,
                expected,
                found,
            } => {
                let who = who.clone().map(|x| format!("{x} ")).unwrap_or_default();
                format!("{who}expected {expected}, but found {found}")
            }
            Reason::Unexpected { found } => format!("unexpected {found}"),
            Reason::NotFound { name, namespace } => format!("{namespace} `{name}` not found"),
            Reason::InvariantViolation(detail) => format!("invariant violated: {detail}"),
            Reason::SemanticRejection(detail) => detail.clone(),
        }
    }
}

/// A single diagnostic. Parser errors carry a `span`; transformer errors
/// (invariant violations, semantic rejections) may or may not, depending on
/// whether the violation can be pinned to a source range.
#[derive(Debug, Clone, ThisError, Serialize, Deserialize)]
#[error("{}", self.reason.message())]
pub struct Error {
    pub span: Option<Span>,
    pub reason: Reason,
    pub help: Option<String>,
}

impl Error {
    pub fn new(reason: Reason) -> Self {
        Error {
            span: None,
            reason,
            help: None,
        }
    }

    pub fn simple(message: impl Into<String>) -> Self {
        Error::new(Reason::Simple(message.into()))
    }

    pub fn not_found(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Error::new(Reason::NotFound {
            namespace: namespace.into(),
            name: name.into(),
        })
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_span(mut self, span: Option<Span>) -> Self {
        self.span = span;
        self
    }

    pub fn message(&self) -> String {
        self.reason.message()
    }
}

/// Mirrors the teacher's `WithErrorInfo`, letting call sites thread span
/// and help text onto a `Result` without a match.
pub trait WithErrorInfo {
    fn with_help(self, help: impl Into<String>) -> Self;
    fn with_span(self, span: Option<Span>) -> Self;
}

impl<T> WithErrorInfo for Result<T, Error> {
    fn with_help(self, help: impl Into<String>) -> Self {
        self.map_err(|e| e.with_help(help))
    }

    fn with_span(self, span: Option<Span>) -> Self {
        self.map_err(|e| e.with_span(span))
    }
}

/// Aggregated diagnostics from one call — used by tolerant collectors
/// (`SchemaCollector::analyze`, §4.3/§7) that keep going after the first
/// problem instead of aborting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics(pub Vec<Error>);

impl Diagnostics {
    pub fn push(&mut self, error: Error) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message() {
        let e = Error::not_found("column", "foo");
        assert_eq!(e.message(), "column `foo` not found");
    }

    #[test]
    fn with_help_and_span_chain() {
        let e = Error::simple("bad")
            .with_help("try this")
            .with_span(Some(Span::new(0, 1)));
        assert_eq!(e.help.as_deref(), Some("try this"));
        assert!(e.span.is_some());
    }
}
