//! Stage (a) of the formatter: deterministic lowering from the AST to a
//! `PrintToken` tree (§4.5.2). Every AST kind maps to exactly one lowering
//! routine here; the line printer (`printer.rs`) never looks at the AST.

use crate::ast::*;

use super::options::FormatOptions;
use super::token::{comment_tokens, ContainerType, PrintToken, TokenType};

fn header_only(opts: &FormatOptions) -> bool {
    matches!(
        opts.comment_export_mode,
        super::options::CommentExportMode::HeaderOnly | super::options::CommentExportMode::TopHeaderOnly
    )
}

fn comments_enabled(opts: &FormatOptions) -> bool {
    !matches!(opts.comment_export_mode, super::options::CommentExportMode::None)
}

fn with_comments(comments: &Comments, opts: &FormatOptions, mut tokens: Vec<PrintToken>) -> Vec<PrintToken> {
    if !comments_enabled(opts) || comments.is_empty() {
        return tokens;
    }
    let mut out = comment_tokens(comments, header_only(opts));
    out.append(&mut tokens);
    if let Some(inline) = &comments.inline {
        out.push(PrintToken::leaf(TokenType::Comment, &inline.text));
    }
    for c in &comments.trailing {
        if header_only(opts) && !c.is_block {
            continue;
        }
        out.push(PrintToken {
            token_type: TokenType::Comment,
            text: c.text.clone(),
            container_type: Some(ContainerType::CommentBlock),
            inner_tokens: Vec::new(),
            keyword_tokens: Vec::new(),
            is_header_comment: false,
        });
    }
    out
}

fn ident(id: &IdentifierString, opts: &FormatOptions) -> PrintToken {
    PrintToken::identifier(super::identifier::render_identifier(id, opts.identifier_escape))
}

fn qualified_name(name: &QualifiedName, opts: &FormatOptions) -> Vec<PrintToken> {
    let mut out = Vec::new();
    for ns in &name.namespaces {
        out.push(ident(ns, opts));
        out.push(PrintToken::leaf(TokenType::Operator, "."));
    }
    out.push(ident(&name.name, opts));
    out
}

fn kw(text: &str) -> PrintToken {
    PrintToken::keyword(text)
}

fn sp() -> PrintToken {
    PrintToken::space()
}

fn join_with_commas(items: Vec<Vec<PrintToken>>, container: ContainerType) -> Vec<PrintToken> {
    let mut out = Vec::new();
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            out.push(PrintToken {
                container_type: Some(container),
                ..PrintToken::comma()
            });
            out.push(sp());
        }
        out.extend(item);
    }
    out
}

pub fn lower_query(query: &Query, opts: &FormatOptions) -> PrintToken {
    let tokens = lower_query_tokens(query, opts);
    PrintToken::container(ContainerType::None, tokens)
}

pub fn lower_query_tokens(query: &Query, opts: &FormatOptions) -> Vec<PrintToken> {
    match query {
        Query::SimpleSelect(q) => lower_simple_select(q, opts),
        Query::BinarySelect(q) => lower_binary_select(q, opts),
        Query::ValuesQuery(q) => lower_values_query(q, opts),
        Query::Insert(q) => lower_insert(q, opts),
        Query::Update(q) => lower_update(q, opts),
        Query::Delete(q) => lower_delete(q, opts),
        Query::Merge(q) => lower_merge(q, opts),
        Query::CreateTable(q) => lower_create_table(q, opts),
        Query::CreateIndex(q) => lower_create_index(q, opts),
        Query::AlterTable(q) => lower_alter_table(q, opts),
        Query::DropTable(q) => lower_drop_table(q, opts),
        Query::DropIndex(q) => lower_drop_index(q, opts),
        Query::Explain(q) => lower_explain(q, opts),
    }
}

fn lower_with_clause(with: &WithClause, opts: &FormatOptions) -> Vec<PrintToken> {
    let mut out = vec![kw("WITH")];
    if with.recursive {
        out.push(sp());
        out.push(kw("RECURSIVE"));
    }
    out.push(sp());
    let ctes = with
        .tables
        .iter()
        .map(|cte| lower_common_table(cte, opts))
        .collect();
    out.push(PrintToken::container(
        ContainerType::WithClause,
        join_with_commas(ctes, ContainerType::WithClause),
    ));
    out
}

fn lower_common_table(cte: &CommonTable, opts: &FormatOptions) -> Vec<PrintToken> {
    let mut head = vec![ident(&cte.name, opts)];
    if !cte.column_names.is_empty() {
        let cols = cte
            .column_names
            .iter()
            .map(|c| vec![ident(c, opts)])
            .collect();
        head.push(PrintToken::paren(
            ContainerType::InsertClause,
            "(",
            ")",
            join_with_commas(cols, ContainerType::InsertClause),
        ));
    }
    head.push(sp());
    head.push(kw("AS"));
    head.push(sp());
    let body = lower_query_tokens(&cte.query, opts);
    head.push(PrintToken::paren(
        ContainerType::CommonTable,
        "(",
        ")",
        body,
    ));
    with_comments(&cte.comments, opts, head)
}

fn lower_simple_select(select: &SimpleSelect, opts: &FormatOptions) -> Vec<PrintToken> {
    let mut out = Vec::new();
    if let Some(with) = &select.with {
        out.extend(lower_with_clause(with, opts));
        out.push(sp());
    }
    out.push(kw("SELECT"));
    if select.select.distinct {
        out.push(sp());
        out.push(kw("DISTINCT"));
    }
    out.push(sp());
    let items = select
        .select
        .items
        .iter()
        .map(|i| lower_select_item(i, opts))
        .collect();
    out.push(PrintToken::container(
        ContainerType::SelectClause,
        join_with_commas(items, ContainerType::SelectClause),
    ));

    if let Some(from) = &select.from {
        out.push(sp());
        out.extend(lower_from_clause(from, opts));
    }
    if let Some(w) = &select.r#where {
        out.push(sp());
        out.push(kw("WHERE"));
        out.push(sp());
        out.push(PrintToken::container(
            ContainerType::WhereClause,
            lower_expr(&w.condition, opts),
        ));
    }
    if let Some(g) = &select.group_by {
        out.push(sp());
        out.push(kw("GROUP"));
        out.push(sp());
        out.push(kw("BY"));
        out.push(sp());
        let items = g.items.iter().map(|e| lower_expr(e, opts)).collect();
        out.push(PrintToken::container(
            ContainerType::GroupByClause,
            join_with_commas(items, ContainerType::GroupByClause),
        ));
    }
    if let Some(h) = &select.having {
        out.push(sp());
        out.push(kw("HAVING"));
        out.push(sp());
        out.extend(lower_expr(&h.condition, opts));
    }
    if let Some(windows) = &select.windows {
        out.push(sp());
        out.push(kw("WINDOW"));
        out.push(sp());
        let items = windows
            .windows
            .iter()
            .map(|(name, frame)| {
                let mut t = vec![ident(name, opts), sp(), kw("AS"), sp()];
                t.push(PrintToken::paren(
                    ContainerType::WindowFrame,
                    "(",
                    ")",
                    lower_window(frame, opts),
                ));
                t
            })
            .collect();
        out.extend(join_with_commas(items, ContainerType::None));
    }
    if let Some(o) = &select.order_by {
        out.push(sp());
        out.extend(lower_order_by(o, opts));
    }
    if let Some(l) = &select.limit {
        out.push(sp());
        out.push(kw("LIMIT"));
        out.push(sp());
        out.extend(lower_expr(&l.value, opts));
    }
    if let Some(o) = &select.offset {
        out.push(sp());
        out.push(kw("OFFSET"));
        out.push(sp());
        out.extend(lower_expr(&o.value, opts));
    }
    if let Some(f) = &select.fetch {
        out.push(sp());
        out.push(kw("FETCH"));
        out.push(sp());
        out.push(kw("FIRST"));
        out.push(sp());
        out.extend(lower_expr(&f.value, opts));
        out.push(sp());
        out.push(kw("ROWS"));
        out.push(sp());
        out.push(kw(if f.with_ties { "WITH TIES" } else { "ONLY" }));
    }
    if let Some(fc) = &select.for_clause {
        out.push(sp());
        out.push(kw("FOR"));
        out.push(sp());
        out.push(kw(match fc.mode {
            ForMode::Update => "UPDATE",
            ForMode::Share => "SHARE",
        }));
        if !fc.of.is_empty() {
            out.push(sp());
            out.push(kw("OF"));
            out.push(sp());
            let names = fc.of.iter().map(|n| vec![ident(n, opts)]).collect();
            out.extend(join_with_commas(names, ContainerType::None));
        }
        if fc.nowait {
            out.push(sp());
            out.push(kw("NOWAIT"));
        }
    }
    if let Some(r) = &select.returning {
        out.push(sp());
        out.extend(lower_returning(r, opts));
    }
    with_comments(&select.comments, opts, out)
}

fn lower_order_by(order: &OrderByClause, opts: &FormatOptions) -> Vec<PrintToken> {
    let mut out = vec![kw("ORDER"), sp(), kw("BY"), sp()];
    let items = order
        .items
        .iter()
        .map(|item| {
            let mut t = lower_expr(&item.value, opts);
            if let Some(dir) = item.direction {
                t.push(sp());
                t.push(kw(match dir {
                    OrderDirection::Asc => "ASC",
                    OrderDirection::Desc => "DESC",
                }));
            }
            if let Some(nulls) = item.nulls {
                t.push(sp());
                t.push(kw("NULLS"));
                t.push(sp());
                t.push(kw(match nulls {
                    NullsOrder::First => "FIRST",
                    NullsOrder::Last => "LAST",
                }));
            }
            t
        })
        .collect();
    out.push(PrintToken::container(
        ContainerType::OrderByClause,
        join_with_commas(items, ContainerType::OrderByClause),
    ));
    out
}

fn lower_returning(r: &ReturningClause, opts: &FormatOptions) -> Vec<PrintToken> {
    let mut out = vec![kw("RETURNING"), sp()];
    let items = r.items.iter().map(|i| lower_select_item(i, opts)).collect();
    out.push(PrintToken::container(
        ContainerType::ReturningClause,
        join_with_commas(items, ContainerType::ReturningClause),
    ));
    out
}

fn lower_select_item(item: &SelectItem, opts: &FormatOptions) -> Vec<PrintToken> {
    match item {
        SelectItem::Wildcard { qualifier } => {
            let mut out = Vec::new();
            if let Some(q) = qualifier {
                out.push(ident(q, opts));
                out.push(PrintToken::leaf(TokenType::Operator, "."));
            }
            out.push(PrintToken::leaf(TokenType::Operator, "*"));
            out
        }
        SelectItem::Expr { value, alias } => {
            let mut out = lower_expr(value, opts);
            if let Some(alias) = alias {
                out.push(sp());
                out.push(kw("AS"));
                out.push(sp());
                out.push(ident(alias, opts));
            }
            out
        }
    }
}

fn lower_from_clause(from: &FromClause, opts: &FormatOptions) -> Vec<PrintToken> {
    let mut out = vec![kw("FROM"), sp()];
    let mut inner = lower_source_expression(&from.primary, opts);
    for join in &from.joins {
        inner.push(sp());
        inner.extend(lower_join_clause(join, opts));
    }
    out.push(PrintToken::container(ContainerType::FromClause, inner));
    out
}

fn lower_join_clause(join: &JoinClause, opts: &FormatOptions) -> Vec<PrintToken> {
    let mut out = Vec::new();
    if join.lateral {
        out.push(kw("LATERAL"));
        out.push(sp());
    }
    out.push(kw(match join.kind {
        JoinKind::Inner => "INNER",
        JoinKind::Left => "LEFT",
        JoinKind::Right => "RIGHT",
        JoinKind::Full => "FULL",
        JoinKind::Cross => "CROSS",
    }));
    out.push(sp());
    out.push(kw("JOIN"));
    out.push(sp());
    out.extend(lower_source_expression(&join.source, opts));
    match &join.condition {
        JoinCondition::On(expr) => {
            out.push(sp());
            out.push(kw("ON"));
            out.push(sp());
            out.extend(lower_expr(expr, opts));
        }
        JoinCondition::Using(cols) => {
            out.push(sp());
            out.push(kw("USING"));
            out.push(sp());
            let cols = cols.iter().map(|c| vec![ident(c, opts)]).collect();
            out.push(PrintToken::paren(
                ContainerType::JoinClause,
                "(",
                ")",
                join_with_commas(cols, ContainerType::JoinClause),
            ));
        }
        JoinCondition::None => {}
    }
    vec![PrintToken::container(ContainerType::JoinClause, out)]
}

fn lower_source_expression(source: &SourceExpression, opts: &FormatOptions) -> Vec<PrintToken> {
    let mut out = match &source.data_source {
        DataSource::TableSource(name) => qualified_name(name, opts),
        DataSource::SubQuerySource(query) => vec![PrintToken::paren(
            ContainerType::InlineQuery,
            "(",
            ")",
            lower_query_tokens(query, opts),
        )],
        DataSource::FunctionSource(call) => lower_function_call(call, opts),
        DataSource::ParenSource(inner) => vec![PrintToken::paren(
            ContainerType::ParenExpression,
            "(",
            ")",
            lower_source_expression(inner, opts),
        )],
        DataSource::ValuesQuery(values) => lower_values_query(values, opts),
    };
    if let Some(alias) = &source.alias {
        out.push(sp());
        out.push(kw("AS"));
        out.push(sp());
        out.push(ident(&alias.name, opts));
        if !alias.column_aliases.is_empty() {
            let cols = alias
                .column_aliases
                .iter()
                .map(|c| vec![ident(c, opts)])
                .collect();
            out.push(PrintToken::paren(
                ContainerType::None,
                "(",
                ")",
                join_with_commas(cols, ContainerType::None),
            ));
        }
    }
    out
}

fn lower_values_query(values: &ValuesQuery, opts: &FormatOptions) -> Vec<PrintToken> {
    let mut out = vec![kw("VALUES"), sp()];
    let rows = values
        .rows
        .iter()
        .map(|row| {
            let items = row.iter().map(|e| lower_expr(e, opts)).collect();
            vec![PrintToken::paren(
                ContainerType::Values,
                "(",
                ")",
                join_with_commas(items, ContainerType::Values),
            )]
        })
        .collect();
    out.push(PrintToken::container(
        ContainerType::Values,
        join_with_commas(rows, ContainerType::Values),
    ));
    out
}

fn lower_binary_select(select: &BinarySelect, opts: &FormatOptions) -> Vec<PrintToken> {
    let mut out = Vec::new();
    if let Some(with) = &select.with {
        out.extend(lower_with_clause(with, opts));
        out.push(sp());
    }
    out.extend(lower_query_tokens(&select.left, opts));
    out.push(sp());
    out.push(kw(match select.op {
        SetOperator::Union => "UNION",
        SetOperator::UnionAll => "UNION ALL",
        SetOperator::Intersect => "INTERSECT",
        SetOperator::IntersectAll => "INTERSECT ALL",
        SetOperator::Except => "EXCEPT",
        SetOperator::ExceptAll => "EXCEPT ALL",
    }));
    out.push(sp());
    out.extend(lower_query_tokens(&select.right, opts));
    if let Some(o) = &select.order_by {
        out.push(sp());
        out.extend(lower_order_by(o, opts));
    }
    if let Some(l) = &select.limit {
        out.push(sp());
        out.push(kw("LIMIT"));
        out.push(sp());
        out.extend(lower_expr(&l.value, opts));
    }
    if let Some(o) = &select.offset {
        out.push(sp());
        out.push(kw("OFFSET"));
        out.push(sp());
        out.extend(lower_expr(&o.value, opts));
    }
    out
}

fn lower_insert(insert: &Insert, opts: &FormatOptions) -> Vec<PrintToken> {
    let mut out = Vec::new();
    if let Some(with) = &insert.with {
        out.extend(lower_with_clause(with, opts));
        out.push(sp());
    }
    out.push(kw("INSERT"));
    out.push(sp());
    out.push(kw("INTO"));
    out.push(sp());
    out.extend(qualified_name(&insert.table, opts));
    if !insert.columns.is_empty() {
        out.push(sp());
        let cols = insert
            .columns
            .iter()
            .map(|c| vec![ident(c, opts)])
            .collect();
        out.push(PrintToken::paren(
            ContainerType::InsertClause,
            "(",
            ")",
            join_with_commas(cols, ContainerType::InsertClause),
        ));
    }
    out.push(sp());
    match &insert.source {
        InsertSource::DefaultValues => {
            out.push(kw("DEFAULT"));
            out.push(sp());
            out.push(kw("VALUES"));
        }
        InsertSource::Values(values) => out.extend(lower_values_query(values, opts)),
        InsertSource::Select(query) => out.extend(lower_query_tokens(query, opts)),
    }
    if let Some(r) = &insert.returning {
        out.push(sp());
        out.extend(lower_returning(r, opts));
    }
    out
}

fn lower_update(update: &Update, opts: &FormatOptions) -> Vec<PrintToken> {
    let mut out = Vec::new();
    if let Some(with) = &update.with {
        out.extend(lower_with_clause(with, opts));
        out.push(sp());
    }
    out.push(kw("UPDATE"));
    out.push(sp());
    out.extend(lower_source_expression(&update.table, opts));
    out.push(sp());
    out.push(kw("SET"));
    out.push(sp());
    let assigns = update
        .set
        .assignments
        .iter()
        .map(|(col, value)| {
            let mut t = vec![ident(col, opts), PrintToken::operator("="), sp()];
            t.extend(lower_expr(value, opts));
            t
        })
        .collect();
    out.extend(join_with_commas(assigns, ContainerType::None));
    if let Some(from) = &update.from {
        out.push(sp());
        out.extend(lower_from_clause(from, opts));
    }
    if let Some(w) = &update.r#where {
        out.push(sp());
        out.push(kw("WHERE"));
        out.push(sp());
        out.extend(lower_expr(&w.condition, opts));
    }
    if let Some(r) = &update.returning {
        out.push(sp());
        out.extend(lower_returning(r, opts));
    }
    out
}

fn lower_delete(delete: &Delete, opts: &FormatOptions) -> Vec<PrintToken> {
    let mut out = Vec::new();
    if let Some(with) = &delete.with {
        out.extend(lower_with_clause(with, opts));
        out.push(sp());
    }
    out.push(kw("DELETE"));
    out.push(sp());
    out.push(kw("FROM"));
    out.push(sp());
    out.extend(lower_source_expression(&delete.table, opts));
    if let Some(using) = &delete.using {
        out.push(sp());
        out.push(kw("USING"));
        out.push(sp());
        out.extend(lower_source_expression(&using.primary, opts));
        for join in &using.joins {
            out.push(sp());
            out.extend(lower_join_clause(join, opts));
        }
    }
    if let Some(w) = &delete.r#where {
        out.push(sp());
        out.push(kw("WHERE"));
        out.push(sp());
        out.extend(lower_expr(&w.condition, opts));
    }
    if let Some(r) = &delete.returning {
        out.push(sp());
        out.extend(lower_returning(r, opts));
    }
    out
}

fn lower_merge(merge: &Merge, opts: &FormatOptions) -> Vec<PrintToken> {
    let mut out = Vec::new();
    if let Some(with) = &merge.with {
        out.extend(lower_with_clause(with, opts));
        out.push(sp());
    }
    out.push(kw("MERGE"));
    out.push(sp());
    out.push(kw("INTO"));
    out.push(sp());
    out.extend(lower_source_expression(&merge.target, opts));
    out.push(sp());
    out.push(kw("USING"));
    out.push(sp());
    out.extend(lower_source_expression(&merge.source, opts));
    out.push(sp());
    out.push(kw("ON"));
    out.push(sp());
    out.extend(lower_expr(&merge.on, opts));
    for when in &merge.when_clauses {
        out.push(sp());
        out.extend(lower_merge_when(when, opts));
    }
    if let Some(r) = &merge.returning {
        out.push(sp());
        out.extend(lower_returning(r, opts));
    }
    out
}

fn lower_merge_when(when: &MergeWhen, opts: &FormatOptions) -> Vec<PrintToken> {
    let mut out = vec![kw("WHEN"), sp()];
    out.push(kw(match when.match_type {
        MergeMatchType::Matched => "MATCHED",
        MergeMatchType::NotMatched => "NOT MATCHED",
        MergeMatchType::NotMatchedBySource => "NOT MATCHED BY SOURCE",
    }));
    if let Some(cond) = &when.condition {
        out.push(sp());
        out.push(kw("AND"));
        out.push(sp());
        out.extend(lower_expr(cond, opts));
    }
    out.push(sp());
    out.push(kw("THEN"));
    out.push(sp());
    match &when.action {
        MergeAction::DoNothing => out.push(kw("DO NOTHING")),
        MergeAction::Delete => out.push(kw("DELETE")),
        MergeAction::Update(set) => {
            out.push(kw("UPDATE"));
            out.push(sp());
            out.push(kw("SET"));
            out.push(sp());
            let assigns = set
                .assignments
                .iter()
                .map(|(col, value)| {
                    let mut t = vec![ident(col, opts), PrintToken::operator("="), sp()];
                    t.extend(lower_expr(value, opts));
                    t
                })
                .collect();
            out.extend(join_with_commas(assigns, ContainerType::None));
        }
        MergeAction::Insert { columns, values } => {
            out.push(kw("INSERT"));
            if !columns.is_empty() {
                out.push(sp());
                let cols = columns.iter().map(|c| vec![ident(c, opts)]).collect();
                out.push(PrintToken::paren(
                    ContainerType::InsertClause,
                    "(",
                    ")",
                    join_with_commas(cols, ContainerType::InsertClause),
                ));
            }
            out.push(sp());
            out.push(kw("VALUES"));
            out.push(sp());
            let vals = values.iter().map(|v| lower_expr(v, opts)).collect();
            out.push(PrintToken::paren(
                ContainerType::Values,
                "(",
                ")",
                join_with_commas(vals, ContainerType::Values),
            ));
        }
    }
    vec![PrintToken::container(ContainerType::MergeWhenClause, out)]
}

pub fn lower_expr(expr: &Expr, opts: &FormatOptions) -> Vec<PrintToken> {
    let tokens = match &expr.kind {
        ExprKind::ColumnReference(name) | ExprKind::QualifiedName(name) => {
            qualified_name(name, opts)
        }
        ExprKind::Literal(lit) => vec![lower_literal(lit)],
        ExprKind::Parameter(name) => vec![PrintToken::leaf(TokenType::Literal, name)],
        ExprKind::Binary { op, left, right } => {
            let mut out = lower_expr(left, opts);
            out.push(sp());
            out.push(binary_operator_token(*op));
            out.push(sp());
            out.extend(lower_expr(right, opts));
            out
        }
        ExprKind::Unary { op, expr } => match op {
            UnaryOperator::Not => {
                let mut out = vec![kw("NOT"), sp()];
                out.extend(lower_expr(expr, opts));
                out
            }
            UnaryOperator::Negative => {
                let mut out = vec![PrintToken::operator("-")];
                out.extend(lower_expr(expr, opts));
                out
            }
            UnaryOperator::IsNull => {
                let mut out = lower_expr(expr, opts);
                out.push(sp());
                out.push(kw("IS NULL"));
                out
            }
            UnaryOperator::IsNotNull => {
                let mut out = lower_expr(expr, opts);
                out.push(sp());
                out.push(kw("IS NOT NULL"));
                out
            }
        },
        ExprKind::FunctionCall(call) => lower_function_call(call, opts),
        ExprKind::Case(case) => lower_case(case, opts),
        ExprKind::Cast(cast) => {
            let mut out = vec![kw("CAST"), PrintToken::leaf(TokenType::Parenthesis, "(")];
            out.extend(lower_expr(&cast.expr, opts));
            out.push(sp());
            out.push(kw("AS"));
            out.push(sp());
            out.push(PrintToken::identifier(cast.target_type.clone()));
            out.push(PrintToken::leaf(TokenType::Parenthesis, ")"));
            out
        }
        ExprKind::Between(between) => {
            let mut out = lower_expr(&between.expr, opts);
            out.push(sp());
            if between.negated {
                out.push(kw("NOT"));
                out.push(sp());
            }
            out.push(kw("BETWEEN"));
            out.push(sp());
            let mut inner = lower_expr(&between.low, opts);
            inner.push(sp());
            inner.push(kw("AND"));
            inner.push(sp());
            inner.extend(lower_expr(&between.high, opts));
            out.push(PrintToken::container(ContainerType::BetweenExpression, inner));
            out
        }
        ExprKind::InlineQuery(query) => vec![PrintToken::paren(
            ContainerType::InlineQuery,
            "(",
            ")",
            lower_query_tokens(query, opts),
        )],
        ExprKind::Exists { negated, query } => {
            let mut out = Vec::new();
            if *negated {
                out.push(kw("NOT"));
                out.push(sp());
            }
            out.push(kw("EXISTS"));
            out.push(sp());
            out.push(PrintToken::paren(
                ContainerType::InlineQuery,
                "(",
                ")",
                lower_query_tokens(query, opts),
            ));
            out
        }
        ExprKind::Array(items) => {
            let mut out = vec![kw("ARRAY")];
            let elems = items.iter().map(|e| lower_expr(e, opts)).collect();
            out.push(PrintToken::paren(
                ContainerType::None,
                "[",
                "]",
                join_with_commas(elems, ContainerType::None),
            ));
            out
        }
        ExprKind::ArrayQuery(query) => {
            let mut out = vec![kw("ARRAY"), PrintToken::leaf(TokenType::Parenthesis, "(")];
            out.extend(lower_query_tokens(query, opts));
            out.push(PrintToken::leaf(TokenType::Parenthesis, ")"));
            out
        }
        ExprKind::ValueList(items) => {
            let elems = items.iter().map(|e| lower_expr(e, opts)).collect();
            vec![PrintToken::paren(
                ContainerType::Values,
                "(",
                ")",
                join_with_commas(elems, ContainerType::Values),
            )]
        }
        ExprKind::WindowFrame(window) => lower_window(window, opts),
        ExprKind::Paren(inner) => vec![PrintToken::paren(
            ContainerType::ParenExpression,
            "(",
            ")",
            lower_expr(inner, opts),
        )],
        ExprKind::Tuple(items) => {
            let elems = items.iter().map(|e| lower_expr(e, opts)).collect();
            vec![PrintToken::paren(
                ContainerType::None,
                "(",
                ")",
                join_with_commas(elems, ContainerType::None),
            )]
        }
        ExprKind::RawString(raw) => vec![PrintToken::leaf(TokenType::Literal, raw.text.clone())],
        ExprKind::IdentifierString(id) => vec![ident(id, opts)],
    };
    with_comments(&expr.comments, opts, tokens)
}

/// Renders a binary operator's surface text. `AND`/`OR` come back as keyword
/// tokens so the printer's logical-break rules (§4.5.3 `andBreak`/`orBreak`)
/// can find them by text; the rest are symbolic operator tokens.
fn binary_operator_token(op: BinaryOperator) -> PrintToken {
    match op {
        BinaryOperator::Eq => PrintToken::operator("="),
        BinaryOperator::NotEq => PrintToken::operator("<>"),
        BinaryOperator::Lt => PrintToken::operator("<"),
        BinaryOperator::LtEq => PrintToken::operator("<="),
        BinaryOperator::Gt => PrintToken::operator(">"),
        BinaryOperator::GtEq => PrintToken::operator(">="),
        BinaryOperator::Add => PrintToken::operator("+"),
        BinaryOperator::Subtract => PrintToken::operator("-"),
        BinaryOperator::Multiply => PrintToken::operator("*"),
        BinaryOperator::Divide => PrintToken::operator("/"),
        BinaryOperator::Modulo => PrintToken::operator("%"),
        BinaryOperator::Concat => PrintToken::operator("||"),
        BinaryOperator::And => kw("AND"),
        BinaryOperator::Or => kw("OR"),
        BinaryOperator::Like => kw("LIKE"),
        BinaryOperator::NotLike => kw("NOT LIKE"),
        BinaryOperator::ILike => kw("ILIKE"),
        BinaryOperator::NotILike => kw("NOT ILIKE"),
        BinaryOperator::In => kw("IN"),
        BinaryOperator::NotIn => kw("NOT IN"),
        BinaryOperator::Is => kw("IS"),
        BinaryOperator::IsNot => kw("IS NOT"),
    }
}

fn lower_literal(lit: &LiteralValue) -> PrintToken {
    match lit {
        LiteralValue::Number(n) => PrintToken::literal(n.clone()),
        LiteralValue::String(s) => PrintToken::literal(format!("'{}'", s.replace('\'', "''"))),
        LiteralValue::Boolean(b) => PrintToken::keyword(if *b { "TRUE" } else { "FALSE" }),
        LiteralValue::Null => PrintToken::keyword("NULL"),
    }
}

fn lower_function_call(call: &FunctionCall, opts: &FormatOptions) -> Vec<PrintToken> {
    let mut out = qualified_name(&call.name, opts);
    let mut args = Vec::new();
    if call.distinct {
        args.push(kw("DISTINCT"));
        args.push(sp());
    }
    let arg_items = call.args.iter().map(|a| lower_expr(a, opts)).collect();
    args.extend(join_with_commas(arg_items, ContainerType::None));
    out.push(PrintToken::paren(ContainerType::ParenExpression, "(", ")", args));
    if let Some(over) = &call.over {
        out.push(sp());
        out.push(kw("OVER"));
        out.push(sp());
        out.push(PrintToken::paren(
            ContainerType::WindowFrame,
            "(",
            ")",
            lower_window(over, opts),
        ));
    }
    out
}

fn lower_window(window: &WindowFrameExpression, opts: &FormatOptions) -> Vec<PrintToken> {
    let mut out = Vec::new();
    if !window.partition_by.is_empty() {
        out.push(kw("PARTITION"));
        out.push(sp());
        out.push(kw("BY"));
        out.push(sp());
        let items = window.partition_by.iter().map(|e| lower_expr(e, opts)).collect();
        out.extend(join_with_commas(items, ContainerType::None));
    }
    if !window.order_by.is_empty() {
        if !out.is_empty() {
            out.push(sp());
        }
        out.push(kw("ORDER"));
        out.push(sp());
        out.push(kw("BY"));
        out.push(sp());
        let items = window
            .order_by
            .iter()
            .map(|item| {
                let mut t = lower_expr(&item.value, opts);
                if let Some(dir) = item.direction {
                    t.push(sp());
                    t.push(kw(match dir {
                        OrderDirection::Asc => "ASC",
                        OrderDirection::Desc => "DESC",
                    }));
                }
                t
            })
            .collect();
        out.extend(join_with_commas(items, ContainerType::None));
    }
    if let Some(frame) = &window.frame {
        if !out.is_empty() {
            out.push(sp());
        }
        out.push(kw(match frame.unit {
            FrameUnit::Rows => "ROWS",
            FrameUnit::Range => "RANGE",
            FrameUnit::Groups => "GROUPS",
        }));
        out.push(sp());
        if frame.end.is_some() {
            out.push(kw("BETWEEN"));
            out.push(sp());
        }
        out.extend(lower_frame_bound(&frame.start, opts));
        if let Some(end) = &frame.end {
            out.push(sp());
            out.push(kw("AND"));
            out.push(sp());
            out.extend(lower_frame_bound(end, opts));
        }
    }
    out
}

fn lower_frame_bound(bound: &FrameBound, opts: &FormatOptions) -> Vec<PrintToken> {
    match bound {
        FrameBound::UnboundedPreceding => vec![kw("UNBOUNDED PRECEDING")],
        FrameBound::UnboundedFollowing => vec![kw("UNBOUNDED FOLLOWING")],
        FrameBound::CurrentRow => vec![kw("CURRENT ROW")],
        FrameBound::Preceding(e) => {
            let mut out = lower_expr(e, opts);
            out.push(sp());
            out.push(kw("PRECEDING"));
            out
        }
        FrameBound::Following(e) => {
            let mut out = lower_expr(e, opts);
            out.push(sp());
            out.push(kw("FOLLOWING"));
            out
        }
    }
}

fn lower_case(case: &CaseExpression, opts: &FormatOptions) -> Vec<PrintToken> {
    let mut out = vec![kw("CASE")];
    if let Some(operand) = &case.operand {
        out.push(sp());
        out.extend(lower_expr(operand, opts));
    }
    let mut inner = Vec::new();
    for (when, then) in &case.when_clauses {
        inner.push(sp());
        inner.push(kw("WHEN"));
        inner.push(sp());
        inner.extend(lower_expr(when, opts));
        inner.push(sp());
        inner.push(kw("THEN"));
        inner.push(sp());
        inner.extend(lower_expr(then, opts));
    }
    if let Some(else_) = &case.else_clause {
        inner.push(sp());
        inner.push(kw("ELSE"));
        inner.push(sp());
        inner.extend(lower_expr(else_, opts));
    }
    inner.push(sp());
    inner.push(kw("END"));
    out.push(PrintToken::container(ContainerType::CaseExpression, inner));
    out
}

fn column_def(col: &ColumnDef, opts: &FormatOptions) -> Vec<PrintToken> {
    let mut out = vec![ident(&col.name, opts), sp(), PrintToken::identifier(col.data_type.clone())];
    for c in &col.constraints {
        out.push(sp());
        out.extend(column_constraint(c, opts));
    }
    out
}

fn column_constraint(c: &ColumnConstraint, opts: &FormatOptions) -> Vec<PrintToken> {
    match c {
        ColumnConstraint::NotNull => vec![kw("NOT NULL")],
        ColumnConstraint::Null => vec![kw("NULL")],
        ColumnConstraint::PrimaryKey => vec![kw("PRIMARY KEY")],
        ColumnConstraint::Unique => vec![kw("UNIQUE")],
        ColumnConstraint::Default(e) => {
            let mut out = vec![kw("DEFAULT"), sp()];
            out.extend(lower_expr(e, opts));
            out
        }
        ColumnConstraint::Check(e) => {
            let mut out = vec![kw("CHECK"), PrintToken::leaf(TokenType::Parenthesis, "(")];
            out.extend(lower_expr(e, opts));
            out.push(PrintToken::leaf(TokenType::Parenthesis, ")"));
            out
        }
        ColumnConstraint::References { table, column } => {
            let mut out = vec![kw("REFERENCES"), sp()];
            out.extend(qualified_name(table, opts));
            if let Some(col) = column {
                out.push(PrintToken::leaf(TokenType::Parenthesis, "("));
                out.push(ident(col, opts));
                out.push(PrintToken::leaf(TokenType::Parenthesis, ")"));
            }
            out
        }
    }
}

fn table_constraint(c: &TableConstraint, opts: &FormatOptions) -> Vec<PrintToken> {
    let mut out = Vec::new();
    if let Some(name) = c.name() {
        out.push(kw("CONSTRAINT"));
        out.push(sp());
        out.push(ident(name, opts));
        out.push(sp());
    }
    match c {
        TableConstraint::PrimaryKey { columns, .. } => {
            out.push(kw("PRIMARY KEY"));
            out.push(PrintToken::leaf(TokenType::Parenthesis, "("));
            let cols = columns.iter().map(|c| vec![ident(c, opts)]).collect();
            out.extend(join_with_commas(cols, ContainerType::None));
            out.push(PrintToken::leaf(TokenType::Parenthesis, ")"));
        }
        TableConstraint::Unique { columns, .. } => {
            out.push(kw("UNIQUE"));
            out.push(PrintToken::leaf(TokenType::Parenthesis, "("));
            let cols = columns.iter().map(|c| vec![ident(c, opts)]).collect();
            out.extend(join_with_commas(cols, ContainerType::None));
            out.push(PrintToken::leaf(TokenType::Parenthesis, ")"));
        }
        TableConstraint::Check { predicate, .. } => {
            out.push(kw("CHECK"));
            out.push(PrintToken::leaf(TokenType::Parenthesis, "("));
            out.extend(lower_expr(predicate, opts));
            out.push(PrintToken::leaf(TokenType::Parenthesis, ")"));
        }
        TableConstraint::ForeignKey {
            columns,
            references_table,
            references_columns,
            ..
        } => {
            out.push(kw("FOREIGN KEY"));
            out.push(PrintToken::leaf(TokenType::Parenthesis, "("));
            let cols = columns.iter().map(|c| vec![ident(c, opts)]).collect();
            out.extend(join_with_commas(cols, ContainerType::None));
            out.push(PrintToken::leaf(TokenType::Parenthesis, ")"));
            out.push(sp());
            out.push(kw("REFERENCES"));
            out.push(sp());
            out.extend(qualified_name(references_table, opts));
            out.push(PrintToken::leaf(TokenType::Parenthesis, "("));
            let rcols = references_columns.iter().map(|c| vec![ident(c, opts)]).collect();
            out.extend(join_with_commas(rcols, ContainerType::None));
            out.push(PrintToken::leaf(TokenType::Parenthesis, ")"));
        }
    }
    out
}

fn lower_create_table(create: &CreateTable, opts: &FormatOptions) -> Vec<PrintToken> {
    let mut out = vec![kw("CREATE"), sp(), kw("TABLE"), sp()];
    if create.if_not_exists {
        out.push(kw("IF NOT EXISTS"));
        out.push(sp());
    }
    out.extend(qualified_name(&create.name, opts));
    out.push(sp());
    let mut items: Vec<Vec<PrintToken>> = create.columns.iter().map(|c| column_def(c, opts)).collect();
    items.extend(create.constraints.iter().map(|c| table_constraint(c, opts)));
    out.push(PrintToken::paren(
        ContainerType::InsertClause,
        "(",
        ")",
        join_with_commas(items, ContainerType::InsertClause),
    ));
    out
}

fn index_column(col: &IndexColumn, opts: &FormatOptions) -> Vec<PrintToken> {
    let mut out = vec![ident(&col.column, opts)];
    if let Some(dir) = col.direction {
        out.push(sp());
        out.push(kw(match dir {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }));
    }
    if let Some(nulls) = col.nulls {
        out.push(sp());
        out.push(kw("NULLS"));
        out.push(sp());
        out.push(kw(match nulls {
            NullsOrder::First => "FIRST",
            NullsOrder::Last => "LAST",
        }));
    }
    out
}

fn lower_create_index(create: &CreateIndex, opts: &FormatOptions) -> Vec<PrintToken> {
    let mut out = vec![kw("CREATE"), sp()];
    if create.index.unique {
        out.push(kw("UNIQUE"));
        out.push(sp());
    }
    out.push(kw("INDEX"));
    out.push(sp());
    if let Some(name) = &create.index.name {
        out.push(ident(name, opts));
        out.push(sp());
    }
    out.push(kw("ON"));
    out.push(sp());
    out.extend(qualified_name(&create.table, opts));
    if let Some(using) = &create.index.using {
        out.push(sp());
        out.push(kw("USING"));
        out.push(sp());
        out.push(PrintToken::identifier(using.clone()));
    }
    out.push(sp());
    let cols = create.index.columns.iter().map(|c| index_column(c, opts)).collect();
    out.push(PrintToken::paren(
        ContainerType::None,
        "(",
        ")",
        join_with_commas(cols, ContainerType::None),
    ));
    if !create.index.include.is_empty() {
        out.push(sp());
        out.push(kw("INCLUDE"));
        out.push(sp());
        let inc = create.index.include.iter().map(|c| vec![ident(c, opts)]).collect();
        out.push(PrintToken::paren(
            ContainerType::None,
            "(",
            ")",
            join_with_commas(inc, ContainerType::None),
        ));
    }
    if let Some(pred) = &create.index.predicate {
        out.push(sp());
        out.push(kw("WHERE"));
        out.push(sp());
        out.extend(lower_expr(pred, opts));
    }
    out
}

fn lower_alter_table(alter: &AlterTable, opts: &FormatOptions) -> Vec<PrintToken> {
    let mut out = vec![kw("ALTER"), sp(), kw("TABLE"), sp()];
    out.extend(qualified_name(&alter.table, opts));
    let actions = alter
        .actions
        .iter()
        .map(|a| lower_alter_action(a, opts))
        .collect();
    out.push(sp());
    out.extend(join_with_commas(actions, ContainerType::None));
    out
}

fn lower_alter_action(action: &AlterAction, opts: &FormatOptions) -> Vec<PrintToken> {
    match action {
        AlterAction::AddColumn(col) => {
            let mut out = vec![kw("ADD"), sp(), kw("COLUMN"), sp()];
            out.extend(column_def(col, opts));
            out
        }
        AlterAction::DropColumn(name) => {
            vec![kw("DROP"), sp(), kw("COLUMN"), sp(), ident(name, opts)]
        }
        AlterAction::AddConstraint(c) => {
            let mut out = vec![kw("ADD"), sp()];
            out.extend(table_constraint(c, opts));
            out
        }
        AlterAction::DropConstraint(name) => {
            vec![kw("DROP"), sp(), kw("CONSTRAINT"), sp(), ident(name, opts)]
        }
    }
}

fn lower_drop_table(drop: &DropTable, opts: &FormatOptions) -> Vec<PrintToken> {
    let mut out = vec![kw("DROP"), sp(), kw("TABLE"), sp()];
    if drop.if_exists {
        out.push(kw("IF EXISTS"));
        out.push(sp());
    }
    out.extend(qualified_name(&drop.name, opts));
    out
}

fn lower_drop_index(drop: &DropIndex, opts: &FormatOptions) -> Vec<PrintToken> {
    let mut out = vec![kw("DROP"), sp(), kw("INDEX"), sp()];
    if drop.if_exists {
        out.push(kw("IF EXISTS"));
        out.push(sp());
    }
    out.extend(qualified_name(&drop.name, opts));
    out
}

fn lower_explain(explain: &Explain, opts: &FormatOptions) -> Vec<PrintToken> {
    let mut out = vec![kw("EXPLAIN")];
    if explain.analyze {
        out.push(sp());
        out.push(kw("ANALYZE"));
    }
    out.push(sp());
    out.extend(lower_query_tokens(&explain.statement, opts));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ContainerType as CT;

    #[test]
    fn lowering_simple_select_contains_select_clause_container() {
        let mut q = SimpleSelect::empty();
        q.select.items.push(SelectItem::Wildcard { qualifier: None });
        let opts = FormatOptions::default();
        let token = lower_query(&Query::SimpleSelect(q), &opts);
        let has_select = token
            .inner_tokens
            .iter()
            .any(|t| t.container_type == Some(CT::SelectClause));
        assert!(has_select);
    }
}
