//! Value-expression parsing (§3.1 "Value expressions", §6 grammar surface):
//! a conventional precedence-climbing descent — `OR` binds loosest, then
//! `AND`, then `NOT`, then comparisons (`=`, `BETWEEN`, `IN`, `LIKE`, `IS
//! [NOT] NULL`), then string concat `||`, then `+ -`, then `* / %`, then
//! unary minus, bottoming out at primaries (literals, column references,
//! function calls, `CASE`, `CAST`, parenthesized/subquery expressions,
//! `ARRAY`, `EXISTS`).

use crate::ast::*;
use crate::error::Error;
use crate::lexeme::LexemeKind;

use super::{select, Parser};

impl<'a> Parser<'a> {
    pub(crate) fn parse_expr(&mut self) -> Result<Expr, Error> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_and()?;
        while self.eat_keyword("OR") {
            let right = self.parse_and()?;
            left = binary(BinaryOperator::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_not()?;
        while self.eat_keyword("AND") {
            let right = self.parse_not()?;
            left = binary(BinaryOperator::And, left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, Error> {
        if self.check_keyword("NOT") && self.peek_at(1).map_or(false, |l| {
            l.kind == LexemeKind::Keyword && l.value.eq_ignore_ascii_case("EXISTS")
        }) {
            self.eat_keyword("NOT");
            return self.parse_exists(true);
        }
        if self.eat_keyword("NOT") {
            let inner = self.parse_not()?;
            return Ok(Expr::new(ExprKind::Unary {
                op: UnaryOperator::Not,
                expr: Box::new(inner),
            }));
        }
        self.parse_comparison()
    }

    fn parse_exists(&mut self, negated: bool) -> Result<Expr, Error> {
        self.expect_keyword("EXISTS")?;
        self.expect_punct("(")?;
        let query = select::parse_query(self)?;
        self.expect_punct(")")?;
        Ok(Expr::new(ExprKind::Exists {
            negated,
            query: Box::new(query),
        }))
    }

    fn parse_comparison(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_concat()?;
        loop {
            if let Some(op) = self.peek_comparison_operator() {
                self.bump_operator();
                let right = self.parse_concat()?;
                left = binary(op, left, right);
                continue;
            }
            let negated = self.check_keyword("NOT")
                && matches!(
                    self.peek_at(1),
                    Some(l) if l.kind == LexemeKind::Keyword
                        && matches!(l.value.to_ascii_uppercase().as_str(), "BETWEEN" | "IN" | "LIKE" | "ILIKE")
                );
            if negated {
                self.eat_keyword("NOT");
            }
            if self.eat_keyword("BETWEEN") {
                let low = self.parse_concat()?;
                self.expect_keyword("AND")?;
                let high = self.parse_concat()?;
                left = Expr::new(ExprKind::Between(BetweenExpression {
                    expr: Box::new(left),
                    negated,
                    low: Box::new(low),
                    high: Box::new(high),
                }));
                continue;
            }
            if self.eat_keyword("IN") {
                let right = self.parse_in_rhs()?;
                left = binary(if negated { BinaryOperator::NotIn } else { BinaryOperator::In }, left, right);
                continue;
            }
            if self.eat_keyword("ILIKE") {
                let right = self.parse_concat()?;
                left = binary(if negated { BinaryOperator::NotILike } else { BinaryOperator::ILike }, left, right);
                continue;
            }
            if self.eat_keyword("LIKE") {
                let right = self.parse_concat()?;
                left = binary(if negated { BinaryOperator::NotLike } else { BinaryOperator::Like }, left, right);
                continue;
            }
            if negated {
                return Err(self.error_here("BETWEEN, IN, LIKE or ILIKE after NOT"));
            }
            if self.eat_keyword("IS") {
                let is_negated = self.eat_keyword("NOT");
                if self.eat_keyword("NULL") {
                    left = Expr::new(ExprKind::Unary {
                        op: if is_negated { UnaryOperator::IsNotNull } else { UnaryOperator::IsNull },
                        expr: Box::new(left),
                    });
                } else {
                    let right = self.parse_concat()?;
                    left = binary(if is_negated { BinaryOperator::IsNot } else { BinaryOperator::Is }, left, right);
                }
                continue;
            }
            break;
        }
        Ok(left)
    }

    fn parse_in_rhs(&mut self) -> Result<Expr, Error> {
        self.expect_punct("(")?;
        if self.check_keyword("SELECT") || self.check_keyword("WITH") || self.check_keyword("VALUES") {
            let query = select::parse_query(self)?;
            self.expect_punct(")")?;
            return Ok(Expr::new(ExprKind::InlineQuery(Box::new(query))));
        }
        let mut items = vec![self.parse_expr()?];
        while self.eat_punct(",") {
            items.push(self.parse_expr()?);
        }
        self.expect_punct(")")?;
        Ok(Expr::new(ExprKind::ValueList(items)))
    }

    fn peek_comparison_operator(&self) -> Option<BinaryOperator> {
        let lex = self.peek()?;
        if lex.kind != LexemeKind::Punctuation {
            return None;
        }
        Some(match lex.value.as_str() {
            "=" => BinaryOperator::Eq,
            "<>" | "!=" => BinaryOperator::NotEq,
            "<=" => BinaryOperator::LtEq,
            ">=" => BinaryOperator::GtEq,
            "<" => BinaryOperator::Lt,
            ">" => BinaryOperator::Gt,
            _ => return None,
        })
    }

    fn bump_operator(&mut self) {
        self.eat_any_punct(&["<=", ">=", "<>", "!=", "<", ">", "="]);
    }

    fn eat_any_punct(&mut self, candidates: &[&str]) -> bool {
        for c in candidates {
            if self.eat_punct(c) {
                return true;
            }
        }
        false
    }

    fn parse_concat(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_additive()?;
        while self.eat_punct("||") {
            let right = self.parse_additive()?;
            left = binary(BinaryOperator::Concat, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_multiplicative()?;
        loop {
            if self.eat_punct("+") {
                let right = self.parse_multiplicative()?;
                left = binary(BinaryOperator::Add, left, right);
            } else if self.eat_punct("-") {
                let right = self.parse_multiplicative()?;
                left = binary(BinaryOperator::Subtract, left, right);
            } else {
                break;
            }
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_unary()?;
        loop {
            if self.eat_punct("*") {
                let right = self.parse_unary()?;
                left = binary(BinaryOperator::Multiply, left, right);
            } else if self.eat_punct("/") {
                let right = self.parse_unary()?;
                left = binary(BinaryOperator::Divide, left, right);
            } else if self.eat_punct("%") {
                let right = self.parse_unary()?;
                left = binary(BinaryOperator::Modulo, left, right);
            } else {
                break;
            }
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, Error> {
        if self.eat_punct("-") {
            let inner = self.parse_unary()?;
            return Ok(Expr::new(ExprKind::Unary {
                op: UnaryOperator::Negative,
                expr: Box::new(inner),
            }));
        }
        self.parse_cast_postfix()
    }

    /// Handles Postgres-style `expr::type` cast suffixes after an otherwise
    /// complete primary.
    fn parse_cast_postfix(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_primary()?;
        while self.eat_punct("::") {
            let target_type = self.parse_type_name()?;
            expr = Expr::new(ExprKind::Cast(CastExpression {
                expr: Box::new(expr),
                target_type,
            }));
        }
        Ok(expr)
    }

    fn parse_type_name(&mut self) -> Result<String, Error> {
        let name = self.expect_identifier()?;
        let mut text = name.text;
        if self.eat_punct("(") {
            text.push('(');
            let mut first = true;
            loop {
                if self.check_punct(")") {
                    break;
                }
                if !first {
                    text.push_str(", ");
                }
                first = false;
                match self.peek().map(|l| l.kind) {
                    Some(LexemeKind::NumberLiteral) => {
                        text.push_str(&self.bump_value());
                    }
                    _ => text.push_str(&self.expect_identifier()?.text),
                }
                if !self.eat_punct(",") {
                    break;
                }
            }
            self.expect_punct(")")?;
            text.push(')');
        }
        Ok(text)
    }

    fn bump_value(&mut self) -> String {
        self.peek().map(|l| l.value.clone()).unwrap_or_default()
    }

    fn parse_primary(&mut self) -> Result<Expr, Error> {
        if self.check_keyword("EXISTS") {
            return self.parse_exists(false);
        }
        if self.check_keyword("CASE") {
            return self.parse_case();
        }
        if self.check_keyword("CAST") {
            return self.parse_cast();
        }
        if self.check_keyword("ARRAY") {
            return self.parse_array();
        }
        if self.eat_keyword("TRUE") {
            return Ok(Expr::new(ExprKind::Literal(LiteralValue::Boolean(true))));
        }
        if self.eat_keyword("FALSE") {
            return Ok(Expr::new(ExprKind::Literal(LiteralValue::Boolean(false))));
        }
        if self.eat_keyword("NULL") {
            return Ok(Expr::new(ExprKind::Literal(LiteralValue::Null)));
        }
        if self.eat_keyword("DEFAULT") {
            return Ok(Expr::new(ExprKind::IdentifierString(IdentifierString::new(
                "DEFAULT",
            ))));
        }
        match self.peek().map(|l| l.kind) {
            Some(LexemeKind::NumberLiteral) => {
                let value = self.bump_value();
                self.force_advance();
                return Ok(Expr::new(ExprKind::Literal(LiteralValue::Number(value))));
            }
            Some(LexemeKind::StringLiteral) => {
                let raw = self.bump_value();
                self.force_advance();
                let inner = raw[1..raw.len() - 1].replace("''", "'");
                return Ok(Expr::new(ExprKind::Literal(LiteralValue::String(inner))));
            }
            Some(LexemeKind::Parameter) => {
                let value = self.bump_value();
                self.force_advance();
                return Ok(Expr::new(ExprKind::Parameter(value)));
            }
            _ => {}
        }
        if self.check_punct("(") {
            return self.parse_paren_or_subquery();
        }
        // Identifier / qualified name, possibly a function call.
        let name = self.parse_qualified_name()?;
        if self.check_punct("(") {
            return self.parse_function_call(name);
        }
        Ok(Expr::new(ExprKind::ColumnReference(name)))
    }

    fn parse_case(&mut self) -> Result<Expr, Error> {
        self.expect_keyword("CASE")?;
        let operand = if !self.check_keyword("WHEN") {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        let mut when_clauses = Vec::new();
        while self.eat_keyword("WHEN") {
            let when = self.parse_expr()?;
            self.expect_keyword("THEN")?;
            let then = self.parse_expr()?;
            when_clauses.push((when, then));
        }
        if when_clauses.is_empty() {
            return Err(self.error_here("WHEN"));
        }
        let else_clause = if self.eat_keyword("ELSE") {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        self.expect_keyword("END")?;
        Ok(Expr::new(ExprKind::Case(CaseExpression {
            operand,
            when_clauses,
            else_clause,
        })))
    }

    fn parse_cast(&mut self) -> Result<Expr, Error> {
        self.expect_keyword("CAST")?;
        self.expect_punct("(")?;
        let expr = self.parse_expr()?;
        self.expect_keyword("AS")?;
        let target_type = self.parse_type_name()?;
        self.expect_punct(")")?;
        Ok(Expr::new(ExprKind::Cast(CastExpression {
            expr: Box::new(expr),
            target_type,
        })))
    }

    fn parse_array(&mut self) -> Result<Expr, Error> {
        self.expect_keyword("ARRAY")?;
        if self.eat_punct("(") {
            let query = select::parse_query(self)?;
            self.expect_punct(")")?;
            return Ok(Expr::new(ExprKind::ArrayQuery(Box::new(query))));
        }
        self.expect_punct("[")?;
        let mut items = Vec::new();
        if !self.check_punct("]") {
            items.push(self.parse_expr()?);
            while self.eat_punct(",") {
                items.push(self.parse_expr()?);
            }
        }
        self.expect_punct("]")?;
        Ok(Expr::new(ExprKind::Array(items)))
    }

    fn parse_paren_or_subquery(&mut self) -> Result<Expr, Error> {
        self.expect_punct("(")?;
        if self.check_keyword("SELECT") || self.check_keyword("WITH") || self.check_keyword("VALUES") {
            let query = select::parse_query(self)?;
            self.expect_punct(")")?;
            return Ok(Expr::new(ExprKind::InlineQuery(Box::new(query))));
        }
        let mut items = vec![self.parse_expr()?];
        while self.eat_punct(",") {
            items.push(self.parse_expr()?);
        }
        self.expect_punct(")")?;
        if items.len() == 1 {
            Ok(Expr::new(ExprKind::Paren(Box::new(items.pop().unwrap()))))
        } else {
            Ok(Expr::new(ExprKind::Tuple(items)))
        }
    }

    fn parse_function_call(&mut self, name: QualifiedName) -> Result<Expr, Error> {
        self.expect_punct("(")?;
        let distinct = self.eat_keyword("DISTINCT");
        let mut args = Vec::new();
        if !self.check_punct(")") {
            // `*` inside e.g. `count(*)` is kept as a bare identifier arg.
            if self.check_punct("*") {
                self.force_advance();
                args.push(Expr::new(ExprKind::IdentifierString(IdentifierString::new("*"))));
            } else {
                args.push(self.parse_expr()?);
            }
            while self.eat_punct(",") {
                args.push(self.parse_expr()?);
            }
        }
        self.expect_punct(")")?;
        let over = if self.eat_keyword("OVER") {
            self.expect_punct("(")?;
            let frame = self.parse_window_frame()?;
            self.expect_punct(")")?;
            Some(Box::new(frame))
        } else {
            None
        };
        Ok(Expr::new(ExprKind::FunctionCall(FunctionCall {
            name,
            distinct,
            args,
            over,
        })))
    }

    pub(crate) fn parse_window_frame(&mut self) -> Result<WindowFrameExpression, Error> {
        let mut partition_by = Vec::new();
        if self.eat_keywords(&["PARTITION", "BY"]) {
            partition_by.push(self.parse_expr()?);
            while self.eat_punct(",") {
                partition_by.push(self.parse_expr()?);
            }
        }
        let mut order_by = Vec::new();
        if self.eat_keywords(&["ORDER", "BY"]) {
            order_by.push(self.parse_order_by_item()?);
            while self.eat_punct(",") {
                order_by.push(self.parse_order_by_item()?);
            }
        }
        let frame = if self.check_any_keyword(&["ROWS", "RANGE", "GROUPS"]) {
            Some(self.parse_frame_spec()?)
        } else {
            None
        };
        Ok(WindowFrameExpression {
            partition_by,
            order_by,
            frame,
        })
    }

    fn parse_frame_spec(&mut self) -> Result<FrameSpec, Error> {
        let unit = if self.eat_keyword("ROWS") {
            FrameUnit::Rows
        } else if self.eat_keyword("RANGE") {
            FrameUnit::Range
        } else {
            self.expect_keyword("GROUPS")?;
            FrameUnit::Groups
        };
        let between = self.eat_keyword("BETWEEN");
        let start = self.parse_frame_bound()?;
        let end = if between {
            self.expect_keyword("AND")?;
            Some(self.parse_frame_bound()?)
        } else {
            None
        };
        Ok(FrameSpec { unit, start, end })
    }

    fn parse_frame_bound(&mut self) -> Result<FrameBound, Error> {
        if self.eat_keywords(&["UNBOUNDED", "PRECEDING"]) {
            return Ok(FrameBound::UnboundedPreceding);
        }
        if self.eat_keywords(&["UNBOUNDED", "FOLLOWING"]) {
            return Ok(FrameBound::UnboundedFollowing);
        }
        if self.eat_keywords(&["CURRENT", "ROW"]) {
            return Ok(FrameBound::CurrentRow);
        }
        let value = self.parse_additive()?;
        if self.eat_keyword("PRECEDING") {
            return Ok(FrameBound::Preceding(Box::new(value)));
        }
        self.expect_keyword("FOLLOWING")?;
        Ok(FrameBound::Following(Box::new(value)))
    }

    pub(crate) fn parse_order_by_item(&mut self) -> Result<OrderByItem, Error> {
        let value = self.parse_expr()?;
        let direction = if self.eat_keyword("ASC") {
            Some(OrderDirection::Asc)
        } else if self.eat_keyword("DESC") {
            Some(OrderDirection::Desc)
        } else {
            None
        };
        let nulls = if self.eat_keywords(&["NULLS", "FIRST"]) {
            Some(NullsOrder::First)
        } else if self.eat_keywords(&["NULLS", "LAST"]) {
            Some(NullsOrder::Last)
        } else {
            None
        };
        Ok(OrderByItem {
            value,
            direction,
            nulls,
        })
    }
}

fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Expr {
    Expr::new(ExprKind::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

#[cfg(test)]
mod tests {
    use super::super::parse;
    use crate::ast::*;
    use crate::format::IdentifierDialect;

    fn where_expr(sql: &str) -> Expr {
        let q = parse(sql, IdentifierDialect::Postgres).unwrap();
        match q {
            Query::SimpleSelect(s) => s.r#where.unwrap().condition,
            _ => panic!("expected select"),
        }
    }

    #[test]
    fn precedence_and_binds_tighter_than_or() {
        let e = where_expr("SELECT 1 FROM t WHERE a = 1 OR b = 2 AND c = 3");
        match e.kind {
            ExprKind::Binary { op: BinaryOperator::Or, .. } => {}
            other => panic!("expected top-level OR, got {other:?}"),
        }
    }

    #[test]
    fn between_and_in_and_like() {
        assert!(matches!(
            where_expr("SELECT 1 FROM t WHERE a BETWEEN 1 AND 2").kind,
            ExprKind::Between(_)
        ));
        assert!(matches!(
            where_expr("SELECT 1 FROM t WHERE a IN (1, 2, 3)").kind,
            ExprKind::Binary { op: BinaryOperator::In, .. }
        ));
        assert!(matches!(
            where_expr("SELECT 1 FROM t WHERE a LIKE 'x%'").kind,
            ExprKind::Binary { op: BinaryOperator::Like, .. }
        ));
    }

    #[test]
    fn exists_subquery() {
        let e = where_expr("SELECT 1 FROM t WHERE EXISTS (SELECT 1 FROM u)");
        assert!(matches!(e.kind, ExprKind::Exists { negated: false, .. }));
    }

    #[test]
    fn not_exists_subquery() {
        let e = where_expr("SELECT 1 FROM t WHERE NOT EXISTS (SELECT 1 FROM u)");
        assert!(matches!(e.kind, ExprKind::Exists { negated: true, .. }));
    }

    #[test]
    fn cast_and_case() {
        assert!(matches!(
            where_expr("SELECT 1 FROM t WHERE CAST(a AS int) = 1").kind,
            ExprKind::Binary { .. }
        ));
        let e = where_expr("SELECT 1 FROM t WHERE (CASE WHEN a = 1 THEN 2 ELSE 3 END) = 2");
        assert!(matches!(e.kind, ExprKind::Binary { .. }));
    }
}
