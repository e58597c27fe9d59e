//! DML statement parsing (`INSERT`/`UPDATE`/`DELETE`/`MERGE`, §3.1).

use crate::ast::*;
use crate::error::Error;

use super::{select, Parser};

pub(crate) fn parse_insert(p: &mut Parser) -> Result<Query, Error> {
    p.expect_keyword("INSERT")?;
    p.expect_keyword("INTO")?;
    let table = p.parse_qualified_name()?;
    let columns = if p.check_punct("(") {
        parse_column_list(p)?
    } else {
        Vec::new()
    };
    let source = if p.eat_keywords(&["DEFAULT", "VALUES"]) {
        InsertSource::DefaultValues
    } else if p.check_keyword("VALUES") {
        InsertSource::Values(select::parse_values_query(p)?)
    } else {
        InsertSource::Select(Box::new(select::parse_query(p)?))
    };
    let returning = if p.eat_keyword("RETURNING") {
        Some(parse_returning(p)?)
    } else {
        None
    };
    Ok(Query::Insert(Insert {
        id: p.new_node_id(),
        comments: Comments::default(),
        with: None,
        table,
        columns,
        source,
        returning,
    }))
}

fn parse_column_list(p: &mut Parser) -> Result<Vec<IdentifierString>, Error> {
    p.expect_punct("(")?;
    let mut names = vec![p.expect_identifier()?];
    while p.eat_punct(",") {
        names.push(p.expect_identifier()?);
    }
    p.expect_punct(")")?;
    Ok(names)
}

fn parse_returning(p: &mut Parser) -> Result<ReturningClause, Error> {
    let mut items = vec![parse_returning_item(p)?];
    while p.eat_punct(",") {
        items.push(parse_returning_item(p)?);
    }
    Ok(ReturningClause {
        id: p.new_node_id(),
        comments: Comments::default(),
        items,
    })
}

fn parse_returning_item(p: &mut Parser) -> Result<SelectItem, Error> {
    if p.check_punct("*") {
        p.force_advance();
        return Ok(SelectItem::Wildcard { qualifier: None });
    }
    let value = p.parse_expr()?;
    let alias = if p.eat_keyword("AS") {
        Some(p.expect_identifier()?)
    } else {
        None
    };
    Ok(SelectItem::Expr { value, alias })
}

pub(crate) fn parse_update(p: &mut Parser) -> Result<Query, Error> {
    p.expect_keyword("UPDATE")?;
    let table = parse_target_source(p)?;
    p.expect_keyword("SET")?;
    let mut assignments = vec![parse_assignment(p)?];
    while p.eat_punct(",") {
        assignments.push(parse_assignment(p)?);
    }
    let set = SetClause {
        id: p.new_node_id(),
        comments: Comments::default(),
        assignments,
    };
    let from = if p.eat_keyword("FROM") {
        Some(select::parse_from_clause(p)?)
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
    let returning = if p.eat_keyword("RETURNING") {
        Some(parse_returning(p)?)
    } else {
        None
    };
    Ok(Query::Update(Update {
        id: p.new_node_id(),
        comments: Comments::default(),
        with: None,
        table,
        set,
        from,
        r#where,
        returning,
    }))
}

fn parse_assignment(p: &mut Parser) -> Result<(IdentifierString, Expr), Error> {
    let name = p.expect_identifier()?;
    p.expect_punct("=")?;
    let value = p.parse_expr()?;
    Ok((name, value))
}

/// A bare table name with an optional alias, used as an `UPDATE`/`DELETE`/
/// `MERGE` target — never a subquery or join, so this is a thin wrapper
/// around `SourceExpression` rather than the full `FROM`-list grammar.
fn parse_target_source(p: &mut Parser) -> Result<SourceExpression, Error> {
    let name = p.parse_qualified_name()?;
    let data_source = DataSource::TableSource(name);
    let alias = parse_optional_target_alias(p)?;
    Ok(SourceExpression {
        id: p.new_node_id(),
        span: None,
        comments: Comments::default(),
        alias,
        data_source,
    })
}

fn parse_optional_target_alias(p: &mut Parser) -> Result<Option<SourceAliasExpression>, Error> {
    let explicit_as = p.eat_keyword("AS");
    let name = if explicit_as {
        Some(p.expect_identifier()?)
    } else if matches!(
        p.peek().map(|l| l.kind),
        Some(crate::lexeme::LexemeKind::Identifier) | Some(crate::lexeme::LexemeKind::QuotedIdentifier)
    ) && !p.check_any_keyword(&["SET", "USING", "ON", "WHERE", "WHEN"])
    {
        Some(p.expect_identifier()?)
    } else {
        None
    };
    Ok(name.map(|name| SourceAliasExpression {
        name,
        column_aliases: Vec::new(),
    }))
}

pub(crate) fn parse_delete(p: &mut Parser) -> Result<Query, Error> {
    p.expect_keyword("DELETE")?;
    p.expect_keyword("FROM")?;
    let table = parse_target_source(p)?;
    let using = if p.eat_keyword("USING") {
        Some(select::parse_from_clause(p)?)
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
    let returning = if p.eat_keyword("RETURNING") {
        Some(parse_returning(p)?)
    } else {
        None
    };
    Ok(Query::Delete(Delete {
        id: p.new_node_id(),
        comments: Comments::default(),
        with: None,
        table,
        using,
        r#where,
        returning,
    }))
}

pub(crate) fn parse_merge(p: &mut Parser) -> Result<Query, Error> {
    p.expect_keyword("MERGE")?;
    p.expect_keyword("INTO")?;
    let target = parse_target_source(p)?;
    p.expect_keyword("USING")?;
    let source = parse_merge_source(p)?;
    p.expect_keyword("ON")?;
    let on = p.parse_expr()?;
    let mut when_clauses = vec![parse_merge_when(p)?];
    while p.check_keyword("WHEN") {
        when_clauses.push(parse_merge_when(p)?);
    }
    let returning = if p.eat_keyword("RETURNING") {
        Some(parse_returning(p)?)
    } else {
        None
    };
    Ok(Query::Merge(Merge {
        id: p.new_node_id(),
        comments: Comments::default(),
        with: None,
        target,
        source,
        on,
        when_clauses,
        returning,
    }))
}

fn parse_merge_source(p: &mut Parser) -> Result<SourceExpression, Error> {
    if p.check_punct("(") {
        p.expect_punct("(")?;
        let query = select::parse_query(p)?;
        p.expect_punct(")")?;
        let alias = parse_optional_target_alias(p)?;
        return Ok(SourceExpression {
            id: p.new_node_id(),
            span: None,
            comments: Comments::default(),
            alias,
            data_source: DataSource::SubQuerySource(Box::new(query)),
        });
    }
    parse_target_source(p)
}

fn parse_merge_when(p: &mut Parser) -> Result<MergeWhen, Error> {
    p.expect_keyword("WHEN")?;
    let match_type = if p.eat_keyword("MATCHED") {
        MergeMatchType::Matched
    } else {
        p.expect_keyword("NOT")?;
        p.expect_keyword("MATCHED")?;
        if p.eat_keywords(&["BY", "SOURCE"]) {
            MergeMatchType::NotMatchedBySource
        } else {
            p.eat_keywords(&["BY", "TARGET"]);
            MergeMatchType::NotMatched
        }
    };
    let condition = if p.eat_keyword("AND") {
        Some(p.parse_expr()?)
    } else {
        None
    };
    p.expect_keyword("THEN")?;
    let action = if p.eat_keyword("INSERT") {
        let columns = if p.check_punct("(") {
            parse_column_list(p)?
        } else {
            Vec::new()
        };
        p.expect_keyword("VALUES")?;
        p.expect_punct("(")?;
        let mut values = vec![p.parse_expr()?];
        while p.eat_punct(",") {
            values.push(p.parse_expr()?);
        }
        p.expect_punct(")")?;
        MergeAction::Insert { columns, values }
    } else if p.eat_keyword("UPDATE") {
        p.expect_keyword("SET")?;
        let mut assignments = vec![parse_assignment(p)?];
        while p.eat_punct(",") {
            assignments.push(parse_assignment(p)?);
        }
        MergeAction::Update(SetClause {
            id: p.new_node_id(),
            comments: Comments::default(),
            assignments,
        })
    } else if p.eat_keyword("DELETE") {
        MergeAction::Delete
    } else {
        p.expect_keyword("DO")?;
        p.expect_keyword("NOTHING")?;
        MergeAction::DoNothing
    };
    Ok(MergeWhen {
        match_type,
        condition,
        action,
    })
}

#[cfg(test)]
mod tests {
    use super::super::parse;
    use crate::ast::*;
    use crate::format::IdentifierDialect;

    #[test]
    fn parses_insert_values_with_returning() {
        let q = parse(
            "INSERT INTO users (id, email) VALUES (1, 'a@example.com') RETURNING id",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        let Query::Insert(i) = q else { panic!() };
        assert_eq!(i.columns.len(), 2);
        assert!(matches!(i.source, InsertSource::Values(_)));
        assert!(i.returning.is_some());
    }

    #[test]
    fn parses_insert_select() {
        let q = parse(
            "INSERT INTO archive SELECT * FROM users WHERE deleted",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        let Query::Insert(i) = q else { panic!() };
        assert!(matches!(i.source, InsertSource::Select(_)));
    }

    #[test]
    fn parses_update_with_from() {
        let q = parse(
            "UPDATE users u SET active = false FROM audits a WHERE a.user_id = u.id",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        let Query::Update(u) = q else { panic!() };
        assert_eq!(u.set.assignments.len(), 1);
        assert!(u.from.is_some());
    }

    #[test]
    fn parses_delete_using() {
        let q = parse(
            "DELETE FROM users USING audits WHERE audits.user_id = users.id",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        let Query::Delete(d) = q else { panic!() };
        assert!(d.using.is_some());
    }

    #[test]
    fn parses_merge_with_matched_and_not_matched() {
        let q = parse(
            "MERGE INTO t USING s ON t.id = s.id \
             WHEN MATCHED THEN UPDATE SET v = s.v \
             WHEN NOT MATCHED THEN INSERT (id, v) VALUES (s.id, s.v)",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        let Query::Merge(m) = q else { panic!() };
        assert_eq!(m.when_clauses.len(), 2);
    }
}
