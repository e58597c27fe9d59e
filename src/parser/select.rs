//! `SELECT`/`WITH`/set-operation/source-expression parsing (§4.2, §6
//! grammar surface). The entry point `parse_query` handles the classic
//! grammar ambiguity around trailing `ORDER BY`/`LIMIT`/`OFFSET` binding to
//! the *whole* set-operation chain rather than to its last operand: operands
//! are parsed via `parse_query_term` (no trailing clauses), chained on
//! `UNION`/`INTERSECT`/`EXCEPT`, and the trailing clauses are parsed exactly
//! once afterwards and attached to whichever variant came out on top.

use crate::ast::*;
use crate::error::Error;

use super::Parser;

pub(crate) fn parse_query(p: &mut Parser) -> Result<Query, Error> {
    let comments = p.comments_here();
    let with = if p.check_keyword("WITH") {
        Some(parse_with_clause(p)?)
    } else {
        None
    };
    let mut result = parse_set_op_chain(p)?;
    if with.is_some() {
        result.set_with_clause(with);
    }
    apply_comments(&mut result, comments);
    parse_trailing_clauses(p, &mut result)?;
    Ok(result)
}

fn apply_comments(query: &mut Query, comments: Comments) {
    if comments.is_empty() {
        return;
    }
    match query {
        Query::SimpleSelect(q) => q.comments = comments,
        Query::BinarySelect(q) => q.comments = comments,
        Query::ValuesQuery(q) => q.comments = comments,
        _ => {}
    }
}

fn parse_with_clause(p: &mut Parser) -> Result<WithClause, Error> {
    p.expect_keyword("WITH")?;
    let recursive = p.eat_keyword("RECURSIVE");
    let mut tables = vec![parse_common_table(p, recursive)?];
    while p.eat_punct(",") {
        tables.push(parse_common_table(p, recursive)?);
    }
    Ok(WithClause {
        id: p.new_node_id(),
        comments: Comments::default(),
        recursive,
        tables,
    })
}

fn parse_common_table(p: &mut Parser, recursive: bool) -> Result<CommonTable, Error> {
    let comments = p.comments_here();
    let name = p.expect_identifier()?;
    let mut column_names = Vec::new();
    if p.eat_punct("(") {
        column_names.push(p.expect_identifier()?);
        while p.eat_punct(",") {
            column_names.push(p.expect_identifier()?);
        }
        p.expect_punct(")")?;
    }
    p.expect_keyword("AS")?;
    p.expect_punct("(")?;
    let query = parse_query(p)?;
    p.expect_punct(")")?;
    Ok(CommonTable {
        id: p.new_node_id(),
        comments,
        name,
        column_names,
        query: Box::new(query),
        is_recursive: recursive,
    })
}

fn parse_set_op_chain(p: &mut Parser) -> Result<Query, Error> {
    let mut left = parse_query_term(p)?;
    while let Some(op) = eat_set_operator(p) {
        let right = parse_query_term(p)?;
        left = Query::BinarySelect(BinarySelect {
            id: p.new_node_id(),
            comments: Comments::default(),
            with: None,
            left: Box::new(left),
            op,
            right: Box::new(right),
            order_by: None,
            limit: None,
            offset: None,
        });
    }
    Ok(left)
}

fn eat_set_operator(p: &mut Parser) -> Option<SetOperator> {
    if p.eat_keyword("UNION") {
        return Some(if p.eat_keyword("ALL") {
            SetOperator::UnionAll
        } else {
            p.eat_keyword("DISTINCT");
            SetOperator::Union
        });
    }
    if p.eat_keyword("INTERSECT") {
        return Some(if p.eat_keyword("ALL") {
            SetOperator::IntersectAll
        } else {
            SetOperator::Intersect
        });
    }
    if p.eat_keyword("EXCEPT") {
        return Some(if p.eat_keyword("ALL") {
            SetOperator::ExceptAll
        } else {
            SetOperator::Except
        });
    }
    None
}

fn parse_query_term(p: &mut Parser) -> Result<Query, Error> {
    if p.check_punct("(") {
        p.expect_punct("(")?;
        let inner = parse_query(p)?;
        p.expect_punct(")")?;
        return Ok(inner);
    }
    if p.check_keyword("VALUES") {
        return parse_values_as_query(p);
    }
    parse_simple_select_core(p)
}

pub(crate) fn parse_values_as_query(p: &mut Parser) -> Result<Query, Error> {
    Ok(Query::ValuesQuery(parse_values_query(p)?))
}

pub(crate) fn parse_values_query(p: &mut Parser) -> Result<ValuesQuery, Error> {
    p.expect_keyword("VALUES")?;
    let mut rows = vec![parse_values_row(p)?];
    while p.eat_punct(",") {
        rows.push(parse_values_row(p)?);
    }
    Ok(ValuesQuery {
        id: p.new_node_id(),
        comments: Comments::default(),
        rows,
    })
}

fn parse_values_row(p: &mut Parser) -> Result<Vec<Expr>, Error> {
    p.expect_punct("(")?;
    let mut row = vec![p.parse_expr()?];
    while p.eat_punct(",") {
        row.push(p.parse_expr()?);
    }
    p.expect_punct(")")?;
    Ok(row)
}

fn parse_simple_select_core(p: &mut Parser) -> Result<Query, Error> {
    p.expect_keyword("SELECT")?;
    let distinct = p.eat_keyword("DISTINCT");
    if !distinct {
        p.eat_keyword("ALL");
    }
    let mut items = vec![parse_select_item(p)?];
    while p.eat_punct(",") {
        items.push(parse_select_item(p)?);
    }
    let select = SelectClause {
        id: p.new_node_id(),
        comments: Comments::default(),
        distinct,
        items,
    };

    let from = if p.eat_keyword("FROM") {
        Some(parse_from_clause(p)?)
    } else {
        None
    };
    let r#where = if p.eat_keyword("WHERE") {
        Some(WhereClause {
            id: p.new_node_id(),
            comments: Comments::default(),
            condition: p.parse_expr()?,
        })
    } else {
        None
    };
    let group_by = if p.eat_keywords(&["GROUP", "BY"]) {
        let mut items = vec![p.parse_expr()?];
        while p.eat_punct(",") {
            items.push(p.parse_expr()?);
        }
        Some(GroupByClause {
            id: p.new_node_id(),
            comments: Comments::default(),
            items,
        })
    } else {
        None
    };
    let having = if p.eat_keyword("HAVING") {
        Some(HavingClause {
            id: p.new_node_id(),
            comments: Comments::default(),
            condition: p.parse_expr()?,
        })
    } else {
        None
    };
    let windows = if p.eat_keyword("WINDOW") {
        let mut windows = vec![parse_named_window(p)?];
        while p.eat_punct(",") {
            windows.push(parse_named_window(p)?);
        }
        Some(WindowsClause {
            id: p.new_node_id(),
            comments: Comments::default(),
            windows,
        })
    } else {
        None
    };

    Ok(Query::SimpleSelect(SimpleSelect {
        id: p.new_node_id(),
        comments: Comments::default(),
        with: None,
        select,
        from,
        r#where,
        group_by,
        having,
        windows,
        order_by: None,
        limit: None,
        offset: None,
        fetch: None,
        for_clause: None,
        returning: None,
    }))
}

fn parse_named_window(p: &mut Parser) -> Result<(IdentifierString, WindowFrameExpression), Error> {
    let name = p.expect_identifier()?;
    p.expect_keyword("AS")?;
    p.expect_punct("(")?;
    let frame = p.parse_window_frame()?;
    p.expect_punct(")")?;
    Ok((name, frame))
}

fn parse_trailing_clauses(p: &mut Parser, result: &mut Query) -> Result<(), Error> {
    let order_by = if p.eat_keywords(&["ORDER", "BY"]) {
        let mut items = vec![p.parse_order_by_item()?];
        while p.eat_punct(",") {
            items.push(p.parse_order_by_item()?);
        }
        Some(OrderByClause {
            id: p.new_node_id(),
            comments: Comments::default(),
            items,
        })
    } else {
        None
    };
    let limit = if p.eat_keyword("LIMIT") {
        Some(LimitClause {
            id: p.new_node_id(),
            comments: Comments::default(),
            value: p.parse_expr()?,
        })
    } else {
        None
    };
    let offset = if p.eat_keyword("OFFSET") {
        Some(OffsetClause {
            id: p.new_node_id(),
            comments: Comments::default(),
            value: p.parse_expr()?,
        })
    } else {
        None
    };
    let fetch = if p.eat_keywords(&["FETCH", "FIRST"]) || p.eat_keywords(&["FETCH", "NEXT"]) {
        let value = p.parse_expr()?;
        p.eat_keyword("ROWS");
        p.eat_keyword("ROW");
        let with_ties = if p.eat_keywords(&["WITH", "TIES"]) {
            true
        } else {
            p.eat_keyword("ONLY");
            false
        };
        Some(FetchClause {
            id: p.new_node_id(),
            comments: Comments::default(),
            value,
            with_ties,
        })
    } else {
        None
    };
    let for_clause = if p.eat_keyword("FOR") {
        let mode = if p.eat_keyword("UPDATE") {
            ForMode::Update
        } else {
            p.expect_keyword("SHARE")?;
            ForMode::Share
        };
        let of = if p.eat_keyword("OF") {
            let mut names = vec![p.expect_identifier()?];
            while p.eat_punct(",") {
                names.push(p.expect_identifier()?);
            }
            names
        } else {
            Vec::new()
        };
        let nowait = p.eat_keyword("NOWAIT");
        Some(ForClause {
            id: p.new_node_id(),
            comments: Comments::default(),
            mode,
            of,
            nowait,
        })
    } else {
        None
    };
    let returning = if p.eat_keyword("RETURNING") {
        Some(parse_returning_clause(p)?)
    } else {
        None
    };

    match result {
        Query::SimpleSelect(q) => {
            q.order_by = order_by;
            q.limit = limit;
            q.offset = offset;
            q.fetch = fetch;
            q.for_clause = for_clause;
            q.returning = returning;
        }
        Query::BinarySelect(q) => {
            q.order_by = order_by;
            q.limit = limit;
            q.offset = offset;
            if fetch.is_some() || for_clause.is_some() || returning.is_some() {
                return Err(p.error_simple(
                    "FETCH/FOR/RETURNING are not supported directly on a set-operation result",
                ));
            }
        }
        _ => {
            if order_by.is_some()
                || limit.is_some()
                || offset.is_some()
                || fetch.is_some()
                || for_clause.is_some()
                || returning.is_some()
            {
                return Err(p.error_simple("trailing clause not supported on this query form"));
            }
        }
    }
    Ok(())
}

fn parse_returning_clause(p: &mut Parser) -> Result<ReturningClause, Error> {
    let mut items = vec![parse_select_item(p)?];
    while p.eat_punct(",") {
        items.push(parse_select_item(p)?);
    }
    Ok(ReturningClause {
        id: p.new_node_id(),
        comments: Comments::default(),
        items,
    })
}

fn parse_select_item(p: &mut Parser) -> Result<SelectItem, Error> {
    if p.check_punct("*") {
        p.force_advance();
        return Ok(SelectItem::Wildcard { qualifier: None });
    }
    // `alias.*` requires one token of lookahead past the identifier/dot.
    if matches!(p.peek(), Some(l) if matches!(l.kind, crate::lexeme::LexemeKind::Identifier | crate::lexeme::LexemeKind::QuotedIdentifier))
        && p.peek_at(1).map_or(false, |l| l.kind == crate::lexeme::LexemeKind::Punctuation && l.value == ".")
        && p.peek_at(2).map_or(false, |l| l.kind == crate::lexeme::LexemeKind::Punctuation && l.value == "*")
    {
        let qualifier = p.expect_identifier()?;
        p.expect_punct(".")?;
        p.expect_punct("*")?;
        return Ok(SelectItem::Wildcard {
            qualifier: Some(qualifier),
        });
    }
    let value = p.parse_expr()?;
    let alias = if p.eat_keyword("AS") {
        Some(p.expect_identifier()?)
    } else if matches!(
        p.peek().map(|l| l.kind),
        Some(crate::lexeme::LexemeKind::Identifier) | Some(crate::lexeme::LexemeKind::QuotedIdentifier)
    ) {
        Some(p.expect_identifier()?)
    } else {
        None
    };
    Ok(SelectItem::Expr { value, alias })
}

pub(crate) fn parse_from_clause(p: &mut Parser) -> Result<FromClause, Error> {
    let primary = parse_source_expression(p)?;
    let mut joins = Vec::new();
    while let Some(join) = parse_join_clause(p)? {
        joins.push(join);
    }
    Ok(FromClause {
        id: p.new_node_id(),
        comments: Comments::default(),
        primary,
        joins,
    })
}

fn parse_join_clause(p: &mut Parser) -> Result<Option<JoinClause>, Error> {
    let lateral_only = p.check_keyword("LATERAL");
    let kind = if p.eat_keywords(&["INNER", "JOIN"]) {
        Some(JoinKind::Inner)
    } else if p.eat_keywords(&["LEFT", "OUTER", "JOIN"]) || p.eat_keywords(&["LEFT", "JOIN"]) {
        Some(JoinKind::Left)
    } else if p.eat_keywords(&["RIGHT", "OUTER", "JOIN"]) || p.eat_keywords(&["RIGHT", "JOIN"]) {
        Some(JoinKind::Right)
    } else if p.eat_keywords(&["FULL", "OUTER", "JOIN"]) || p.eat_keywords(&["FULL", "JOIN"]) {
        Some(JoinKind::Full)
    } else if p.eat_keywords(&["CROSS", "JOIN"]) {
        Some(JoinKind::Cross)
    } else if p.eat_keyword("JOIN") {
        Some(JoinKind::Inner)
    } else {
        None
    };
    let Some(kind) = kind else {
        if lateral_only {
            // `LATERAL` without a preceding JOIN keyword is a comma-join
            // source, handled by the caller's FROM-list loop instead.
            return Ok(None);
        }
        return Ok(None);
    };
    let lateral = p.eat_keyword("LATERAL");
    let source = parse_source_expression(p)?;
    let condition = if p.eat_keyword("ON") {
        JoinCondition::On(p.parse_expr()?)
    } else if p.eat_keyword("USING") {
        p.expect_punct("(")?;
        let mut cols = vec![p.expect_identifier()?];
        while p.eat_punct(",") {
            cols.push(p.expect_identifier()?);
        }
        p.expect_punct(")")?;
        JoinCondition::Using(cols)
    } else {
        JoinCondition::None
    };
    Ok(Some(JoinClause {
        id: p.new_node_id(),
        comments: Comments::default(),
        kind,
        lateral,
        source,
        condition,
    }))
}

fn parse_source_expression(p: &mut Parser) -> Result<SourceExpression, Error> {
    let comments = p.comments_here();
    let lateral = p.eat_keyword("LATERAL");
    let data_source = if p.check_punct("(") {
        p.expect_punct("(")?;
        if p.check_keyword("SELECT") || p.check_keyword("WITH") || p.check_keyword("VALUES") {
            let query = parse_query(p)?;
            p.expect_punct(")")?;
            DataSource::SubQuerySource(Box::new(query))
        } else {
            let inner = parse_source_expression(p)?;
            p.expect_punct(")")?;
            DataSource::ParenSource(Box::new(inner))
        }
    } else if p.check_keyword("VALUES") {
        DataSource::ValuesQuery(parse_values_query(p)?)
    } else {
        let name = p.parse_qualified_name()?;
        if p.check_punct("(") {
            let call = parse_table_function_call(p, name)?;
            DataSource::FunctionSource(call)
        } else {
            DataSource::TableSource(name)
        }
    };
    let _ = lateral; // `LATERAL` on a subquery source is implied by its enclosing JoinClause.lateral
    let alias = parse_optional_alias(p)?;
    Ok(SourceExpression {
        id: p.new_node_id(),
        span: None,
        comments,
        alias,
        data_source,
    })
}

fn parse_table_function_call(p: &mut Parser, name: QualifiedName) -> Result<FunctionCall, Error> {
    p.expect_punct("(")?;
    let mut args = Vec::new();
    if !p.check_punct(")") {
        args.push(p.parse_expr()?);
        while p.eat_punct(",") {
            args.push(p.parse_expr()?);
        }
    }
    p.expect_punct(")")?;
    Ok(FunctionCall {
        name,
        distinct: false,
        args,
        over: None,
    })
}

fn parse_optional_alias(p: &mut Parser) -> Result<Option<SourceAliasExpression>, Error> {
    let explicit_as = p.eat_keyword("AS");
    let name = if explicit_as {
        Some(p.expect_identifier()?)
    } else if matches!(
        p.peek().map(|l| l.kind),
        Some(crate::lexeme::LexemeKind::Identifier) | Some(crate::lexeme::LexemeKind::QuotedIdentifier)
    ) {
        Some(p.expect_identifier()?)
    } else {
        None
    };
    let Some(name) = name else { return Ok(None) };
    let mut column_aliases = Vec::new();
    if p.eat_punct("(") {
        column_aliases.push(p.expect_identifier()?);
        while p.eat_punct(",") {
            column_aliases.push(p.expect_identifier()?);
        }
        p.expect_punct(")")?;
    }
    Ok(Some(SourceAliasExpression {
        name,
        column_aliases,
    }))
}

#[cfg(test)]
mod tests {
    use super::super::parse;
    use crate::ast::*;
    use crate::format::IdentifierDialect;

    #[test]
    fn parses_joins_and_aliases() {
        let q = parse(
            "SELECT u.id FROM users u LEFT JOIN profiles p ON p.user_id = u.id",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        let Query::SimpleSelect(s) = q else { panic!() };
        let from = s.from.unwrap();
        assert_eq!(from.joins.len(), 1);
        assert_eq!(from.joins[0].kind, JoinKind::Left);
    }

    #[test]
    fn parses_with_recursive_cte() {
        let q = parse(
            "WITH RECURSIVE t AS (SELECT 1 AS n UNION ALL SELECT n + 1 FROM t WHERE n < 5) SELECT * FROM t",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        let with = q.with_clause().unwrap();
        assert!(with.recursive);
        assert!(with.tables[0].is_recursive);
    }

    #[test]
    fn union_trailing_order_by_attaches_to_binary_select() {
        let q = parse(
            "SELECT a FROM t UNION SELECT a FROM u ORDER BY a",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        match q {
            Query::BinarySelect(b) => assert!(b.order_by.is_some()),
            _ => panic!("expected BinarySelect"),
        }
    }

    #[test]
    fn parses_wildcard_and_qualified_wildcard() {
        let q = parse("SELECT *, t.* FROM t", IdentifierDialect::Postgres).unwrap();
        let Query::SimpleSelect(s) = q else { panic!() };
        assert_eq!(s.select.items.len(), 2);
    }
}
