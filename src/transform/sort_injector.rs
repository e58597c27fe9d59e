//! Sort injector (§4.4.5): appends caller-named `ORDER BY` entries to a
//! `SimpleSelect`, resolving each name against the current SELECT's own
//! selectable columns (no upstream descent, unlike §4.4.3/§4.4.4).

use crate::ast::{NullsOrder, OrderByClause, OrderByItem, OrderDirection, Query, SimpleSelect};
use crate::collect::{DedupMode, SelectableColumnCollector};
use crate::error::{Error, Reason};

/// One caller-requested sort entry for a single output column name (§4.4.5).
/// `asc`/`desc` are mutually exclusive booleans in the spec surface; this
/// type collapses that into a direction plus an explicit "nothing was set"
/// state so `validate` can reject the combinations the spec calls out.
#[derive(Debug, Clone, Copy, Default)]
pub struct SortInstruction {
    pub asc: bool,
    pub desc: bool,
    pub nulls_first: bool,
    pub nulls_last: bool,
}

impl SortInstruction {
    fn validate(&self, column: &str) -> Result<(), Error> {
        if self.asc && self.desc {
            return Err(reject(format!(
                "sort instruction for `{column}` sets both asc and desc"
            )));
        }
        if self.nulls_first && self.nulls_last {
            return Err(reject(format!(
                "sort instruction for `{column}` sets both nullsFirst and nullsLast"
            )));
        }
        if !self.asc && !self.desc && !self.nulls_first && !self.nulls_last {
            return Err(reject(format!(
                "sort instruction for `{column}` sets no flags"
            )));
        }
        Ok(())
    }

    fn direction(&self) -> Option<OrderDirection> {
        // Asc is the implicit default (§4.4.5): only an explicit `desc`
        // needs a direction keyword lowered.
        if self.desc {
            Some(OrderDirection::Desc)
        } else {
            None
        }
    }

    fn nulls(&self) -> Option<NullsOrder> {
        if self.nulls_first {
            Some(NullsOrder::First)
        } else if self.nulls_last {
            Some(NullsOrder::Last)
        } else {
            None
        }
    }
}

fn reject(detail: impl Into<String>) -> Error {
    Error::new(Reason::SemanticRejection(detail.into()))
}

/// Appends one `OrderByItem` per `(column_name, instruction)` entry, in the
/// order given, to `query`'s top-level `SimpleSelect`. Ordering of the input
/// slice is preserved in the output `ORDER BY` — callers that need `b` before
/// `a` pass them in that order.
pub fn inject(query: &mut Query, conditions: &[(String, SortInstruction)]) -> Result<(), Error> {
    let select = match query {
        Query::SimpleSelect(select) => select,
        _ => {
            return Err(reject(
                "sort injection target must normalize to a SimpleSelect",
            ))
        }
    };

    let selectable = SelectableColumnCollector::new(DedupMode::ColumnNameOnly {
        normalize_underscores: false,
    })
    .collect(&Query::SimpleSelect(select.clone()));

    let mut items = Vec::with_capacity(conditions.len());
    for (name, instruction) in conditions {
        instruction.validate(name)?;
        let column = selectable
            .iter()
            .find(|c| c.alias.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::new(Reason::NotFound {
                name: name.clone(),
                namespace: "selectable column".to_string(),
            }))?;
        items.push(OrderByItem {
            value: column.value.clone(),
            direction: instruction.direction(),
            nulls: instruction.nulls(),
        });
    }

    append_order_by(select, items);
    Ok(())
}

fn append_order_by(select: &mut SimpleSelect, items: Vec<OrderByItem>) {
    match &mut select.order_by {
        Some(existing) => existing.items.extend(items),
        None => {
            select.order_by = Some(OrderByClause {
                id: crate::ast::NodeId::new(),
                comments: Default::default(),
                items,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{format_query, FormatOptions};
    use crate::parser::parse;

    #[test]
    fn injects_in_given_order_with_defaults() {
        let mut q = parse(
            "SELECT a, b FROM t",
            crate::format::IdentifierDialect::Postgres,
        )
        .unwrap();
        let conditions = vec![
            (
                "b".to_string(),
                SortInstruction {
                    desc: true,
                    nulls_last: true,
                    ..Default::default()
                },
            ),
            (
                "a".to_string(),
                SortInstruction {
                    asc: true,
                    ..Default::default()
                },
            ),
        ];
        inject(&mut q, &conditions).unwrap();
        let out = format_query(&q, &FormatOptions::default().as_one_line());
        assert_eq!(out, "SELECT a, b FROM t ORDER BY b DESC NULLS LAST, a");
    }

    #[test]
    fn rejects_contradictory_flags() {
        let mut q = parse(
            "SELECT a FROM t",
            crate::format::IdentifierDialect::Postgres,
        )
        .unwrap();
        let conditions = vec![(
            "a".to_string(),
            SortInstruction {
                asc: true,
                desc: true,
                ..Default::default()
            },
        )];
        assert!(inject(&mut q, &conditions).is_err());
    }

    #[test]
    fn rejects_all_false() {
        let mut q = parse(
            "SELECT a FROM t",
            crate::format::IdentifierDialect::Postgres,
        )
        .unwrap();
        let conditions = vec![("a".to_string(), SortInstruction::default())];
        assert!(inject(&mut q, &conditions).is_err());
    }

    #[test]
    fn errors_on_unresolvable_column() {
        let mut q = parse(
            "SELECT a FROM t",
            crate::format::IdentifierDialect::Postgres,
        )
        .unwrap();
        let conditions = vec![(
            "missing".to_string(),
            SortInstruction {
                asc: true,
                ..Default::default()
            },
        )];
        assert!(inject(&mut q, &conditions).is_err());
    }
}
