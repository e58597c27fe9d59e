//! DDL statement parsing (`CREATE TABLE`/`CREATE INDEX`/`ALTER TABLE`/
//! `DROP TABLE`/`DROP INDEX`/`EXPLAIN`, §3.1).

use crate::ast::*;
use crate::error::Error;
use crate::lexeme::LexemeKind;

use super::Parser;

pub(crate) fn parse_explain(p: &mut Parser) -> Result<Query, Error> {
    p.expect_keyword("EXPLAIN")?;
    let analyze = p.eat_keyword("ANALYZE");
    if p.eat_punct("(") {
        // Option list (`EXPLAIN (FORMAT JSON, ANALYZE)`) isn't modeled by
        // the AST beyond the bare `analyze` flag; skip to the closing paren.
        let mut depth = 1;
        while depth > 0 {
            if p.eat_punct("(") {
                depth += 1;
            } else if p.eat_punct(")") {
                depth -= 1;
            } else if p.is_eof() {
                return Err(p.error_here(")"));
            } else {
                p.force_advance();
            }
        }
    }
    let statement = p.parse_statement_inner()?;
    Ok(Query::Explain(Explain {
        id: p.new_node_id(),
        comments: Comments::default(),
        analyze,
        statement: Box::new(statement),
    }))
}

pub(crate) fn parse_create(p: &mut Parser) -> Result<Query, Error> {
    p.expect_keyword("CREATE")?;
    let unique = p.eat_keyword("UNIQUE");
    if p.eat_keyword("INDEX") {
        return parse_create_index(p, unique);
    }
    p.expect_keyword("TABLE")?;
    let if_not_exists = p.eat_keywords(&["IF", "NOT", "EXISTS"]);
    let name = p.parse_qualified_name()?;
    p.expect_punct("(")?;
    let mut columns = Vec::new();
    let mut constraints = Vec::new();
    loop {
        if is_table_constraint_start(p) {
            constraints.push(parse_table_constraint(p)?);
        } else {
            columns.push(parse_column_def(p)?);
        }
        if !p.eat_punct(",") {
            break;
        }
    }
    p.expect_punct(")")?;
    Ok(Query::CreateTable(CreateTable {
        id: p.new_node_id(),
        comments: Comments::default(),
        name,
        if_not_exists,
        columns,
        constraints,
    }))
}

fn is_table_constraint_start(p: &Parser) -> bool {
    p.check_keyword("PRIMARY")
        || p.check_keyword("UNIQUE")
        || p.check_keyword("CHECK")
        || p.check_keyword("FOREIGN")
        || p.check_keyword("CONSTRAINT")
}

fn parse_constraint_name(p: &mut Parser) -> Result<Option<IdentifierString>, Error> {
    if p.eat_keyword("CONSTRAINT") {
        Ok(Some(p.expect_identifier()?))
    } else {
        Ok(None)
    }
}

fn parse_table_constraint(p: &mut Parser) -> Result<TableConstraint, Error> {
    let name = parse_constraint_name(p)?;
    if p.eat_keywords(&["PRIMARY", "KEY"]) {
        return Ok(TableConstraint::PrimaryKey {
            name,
            columns: parse_column_list(p)?,
        });
    }
    if p.eat_keyword("UNIQUE") {
        return Ok(TableConstraint::Unique {
            name,
            columns: parse_column_list(p)?,
        });
    }
    if p.eat_keyword("CHECK") {
        p.expect_punct("(")?;
        let predicate = p.parse_expr()?;
        p.expect_punct(")")?;
        return Ok(TableConstraint::Check { name, predicate });
    }
    p.expect_keyword("FOREIGN")?;
    p.expect_keyword("KEY")?;
    let columns = parse_column_list(p)?;
    p.expect_keyword("REFERENCES")?;
    let references_table = p.parse_qualified_name()?;
    let references_columns = if p.check_punct("(") {
        parse_column_list(p)?
    } else {
        Vec::new()
    };
    Ok(TableConstraint::ForeignKey {
        name,
        columns,
        references_table,
        references_columns,
    })
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

fn parse_column_def(p: &mut Parser) -> Result<ColumnDef, Error> {
    let name = p.expect_identifier()?;
    let data_type = parse_data_type(p)?;
    let mut constraints = Vec::new();
    loop {
        if p.eat_keywords(&["NOT", "NULL"]) {
            constraints.push(ColumnConstraint::NotNull);
        } else if p.eat_keyword("NULL") {
            constraints.push(ColumnConstraint::Null);
        } else if p.eat_keywords(&["PRIMARY", "KEY"]) {
            constraints.push(ColumnConstraint::PrimaryKey);
        } else if p.eat_keyword("UNIQUE") {
            constraints.push(ColumnConstraint::Unique);
        } else if p.eat_keyword("DEFAULT") {
            constraints.push(ColumnConstraint::Default(p.parse_expr()?));
        } else if p.eat_keyword("CHECK") {
            p.expect_punct("(")?;
            let predicate = p.parse_expr()?;
            p.expect_punct(")")?;
            constraints.push(ColumnConstraint::Check(predicate));
        } else if p.eat_keyword("REFERENCES") {
            let table = p.parse_qualified_name()?;
            let column = if p.eat_punct("(") {
                let name = p.expect_identifier()?;
                p.expect_punct(")")?;
                Some(name)
            } else {
                None
            };
            constraints.push(ColumnConstraint::References { table, column });
        } else {
            break;
        }
    }
    Ok(ColumnDef {
        name,
        data_type,
        constraints,
    })
}

/// A data type name, e.g. `INT`, `VARCHAR(255)`, `NUMERIC(10, 2)`.
fn parse_data_type(p: &mut Parser) -> Result<String, Error> {
    let mut text = p.expect_identifier()?.text;
    if p.eat_punct("(") {
        text.push('(');
        let mut first = true;
        loop {
            if p.check_punct(")") {
                break;
            }
            if !first {
                text.push_str(", ");
            }
            first = false;
            match p.peek().map(|l| l.kind) {
                Some(LexemeKind::NumberLiteral) => {
                    let value = p.peek().unwrap().value.clone();
                    p.force_advance();
                    text.push_str(&value);
                }
                _ => text.push_str(&p.expect_identifier()?.text),
            }
            if !p.eat_punct(",") {
                break;
            }
        }
        p.expect_punct(")")?;
        text.push(')');
    }
    // Multi-word types (`DOUBLE PRECISION`, `CHARACTER VARYING`).
    while matches!(p.peek().map(|l| l.kind), Some(LexemeKind::Identifier) | Some(LexemeKind::Keyword))
        && !p.check_any_keyword(&["NOT", "NULL", "PRIMARY", "UNIQUE", "DEFAULT", "CHECK", "REFERENCES"])
    {
        text.push(' ');
        text.push_str(&p.expect_identifier()?.text);
    }
    Ok(text)
}

fn parse_create_index(p: &mut Parser, unique: bool) -> Result<Query, Error> {
    p.eat_keywords(&["IF", "NOT", "EXISTS"]);
    let name = if !p.check_keyword("ON") {
        Some(p.expect_identifier()?)
    } else {
        None
    };
    p.expect_keyword("ON")?;
    let table = p.parse_qualified_name()?;
    let using = if p.eat_keyword("USING") {
        Some(p.expect_identifier()?.text)
    } else {
        None
    };
    p.expect_punct("(")?;
    let mut columns = vec![parse_index_column(p)?];
    while p.eat_punct(",") {
        columns.push(parse_index_column(p)?);
    }
    p.expect_punct(")")?;
    let include = if p.eat_keyword("INCLUDE") {
        parse_column_list(p)?
    } else {
        Vec::new()
    };
    let predicate = if p.eat_keyword("WHERE") {
        Some(p.parse_expr()?)
    } else {
        None
    };
    Ok(Query::CreateIndex(CreateIndex {
        id: p.new_node_id(),
        comments: Comments::default(),
        table,
        index: IndexDef {
            name,
            unique,
            using,
            columns,
            include,
            predicate,
        },
    }))
}

fn parse_index_column(p: &mut Parser) -> Result<IndexColumn, Error> {
    let column = p.expect_identifier()?;
    let direction = if p.eat_keyword("ASC") {
        Some(OrderDirection::Asc)
    } else if p.eat_keyword("DESC") {
        Some(OrderDirection::Desc)
    } else {
        None
    };
    let nulls = if p.eat_keywords(&["NULLS", "FIRST"]) {
        Some(NullsOrder::First)
    } else if p.eat_keywords(&["NULLS", "LAST"]) {
        Some(NullsOrder::Last)
    } else {
        None
    };
    Ok(IndexColumn {
        column,
        direction,
        nulls,
    })
}

pub(crate) fn parse_alter_table(p: &mut Parser) -> Result<Query, Error> {
    p.expect_keyword("ALTER")?;
    p.expect_keyword("TABLE")?;
    p.eat_keywords(&["IF", "EXISTS"]);
    let table = p.parse_qualified_name()?;
    let mut actions = vec![parse_alter_action(p)?];
    while p.eat_punct(",") {
        actions.push(parse_alter_action(p)?);
    }
    Ok(Query::AlterTable(AlterTable {
        id: p.new_node_id(),
        comments: Comments::default(),
        table,
        actions,
    }))
}

fn parse_alter_action(p: &mut Parser) -> Result<AlterAction, Error> {
    if p.eat_keyword("ADD") {
        if is_table_constraint_start(p) {
            return Ok(AlterAction::AddConstraint(parse_table_constraint(p)?));
        }
        p.eat_keyword("COLUMN");
        p.eat_keywords(&["IF", "NOT", "EXISTS"]);
        return Ok(AlterAction::AddColumn(parse_column_def(p)?));
    }
    p.expect_keyword("DROP")?;
    if p.eat_keyword("CONSTRAINT") {
        p.eat_keywords(&["IF", "EXISTS"]);
        return Ok(AlterAction::DropConstraint(p.expect_identifier()?));
    }
    p.eat_keyword("COLUMN");
    p.eat_keywords(&["IF", "EXISTS"]);
    Ok(AlterAction::DropColumn(p.expect_identifier()?))
}

pub(crate) fn parse_drop(p: &mut Parser) -> Result<Query, Error> {
    p.expect_keyword("DROP")?;
    if p.eat_keyword("INDEX") {
        let if_exists = p.eat_keywords(&["IF", "EXISTS"]);
        let name = p.parse_qualified_name()?;
        return Ok(Query::DropIndex(DropIndex {
            id: p.new_node_id(),
            comments: Comments::default(),
            name,
            if_exists,
        }));
    }
    p.expect_keyword("TABLE")?;
    let if_exists = p.eat_keywords(&["IF", "EXISTS"]);
    let name = p.parse_qualified_name()?;
    Ok(Query::DropTable(DropTable {
        id: p.new_node_id(),
        comments: Comments::default(),
        name,
        if_exists,
    }))
}

#[cfg(test)]
mod tests {
    use super::super::parse;
    use crate::ast::*;
    use crate::format::IdentifierDialect;

    #[test]
    fn parses_create_table_with_constraints() {
        let q = parse(
            "CREATE TABLE users (id INT PRIMARY KEY, email VARCHAR(255) NOT NULL UNIQUE, CHECK (id > 0))",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        let Query::CreateTable(t) = q else { panic!() };
        assert_eq!(t.columns.len(), 2);
        assert_eq!(t.constraints.len(), 1);
    }

    #[test]
    fn parses_create_index() {
        let q = parse(
            "CREATE UNIQUE INDEX idx_users_email ON users (email)",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        let Query::CreateIndex(i) = q else { panic!() };
        assert!(i.index.unique);
    }

    #[test]
    fn parses_alter_table_add_column() {
        let q = parse(
            "ALTER TABLE users ADD COLUMN age INT",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        let Query::AlterTable(t) = q else { panic!() };
        assert!(matches!(t.actions[0], AlterAction::AddColumn(_)));
    }

    #[test]
    fn parses_drop_table_if_exists() {
        let q = parse("DROP TABLE IF EXISTS users", IdentifierDialect::Postgres).unwrap();
        let Query::DropTable(t) = q else { panic!() };
        assert!(t.if_exists);
    }

    #[test]
    fn parses_explain_analyze() {
        let q = parse(
            "EXPLAIN ANALYZE SELECT 1 FROM t",
            IdentifierDialect::Postgres,
        )
        .unwrap();
        let Query::Explain(e) = q else { panic!() };
        assert!(e.analyze);
    }
}
