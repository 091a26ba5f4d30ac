//! Translate sqlparser AST to DataFrame operations.

use polars::prelude::{col, Expr, IdxSize, SortMultipleOptions, UniqueKeepStrategy};
use sqlparser::ast::{
    Distinct, Expr as SqlExpr, GroupByExpr, ObjectName, OrderByExpr, Query, Select, SelectItem,
    SetExpr, Statement, TableFactor, Value,
};

use super::expr::{contains_aggregate, ExprTranslator, Grouping, Translated};
use crate::dataframe::{resolve_name, DataFrame};
use crate::error::EngineError;
use crate::session::SparkSession;

/// Translate a parsed statement into a DataFrame using the session catalog.
/// `CACHE TABLE` and `UNCACHE TABLE` run immediately and return an empty DataFrame.
pub fn translate(session: &SparkSession, stmt: &Statement) -> Result<DataFrame, EngineError> {
    match stmt {
        Statement::Query(q) => translate_query(session, q),
        Statement::Cache {
            table_name, query, ..
        } => {
            let name = object_name(table_name)?;
            if let Some(q) = query {
                let df = translate_query(session, q)?;
                session.create_or_replace_temp_view(&name, df);
            }
            session.catalog().cache_table(&name)?;
            Ok(DataFrame::empty())
        }
        Statement::UNCache {
            table_name,
            if_exists,
        } => {
            let name = object_name(table_name)?;
            if *if_exists && !session.catalog().table_exists(&name) {
                return Ok(DataFrame::empty());
            }
            session.catalog().uncache_table(&name)?;
            Ok(DataFrame::empty())
        }
        other => Err(EngineError::Sql(format!(
            "SQL: only SELECT, CACHE TABLE and UNCACHE TABLE are supported, got: {other}"
        ))),
    }
}

fn object_name(name: &ObjectName) -> Result<String, EngineError> {
    name.0
        .last()
        .map(|i| i.value.clone())
        .ok_or_else(|| EngineError::Sql("SQL: empty table name.".into()))
}

/// One output column of the projection.
struct Output {
    expr: Expr,
    name: String,
    /// The SQL it came from, for GROUP BY ordinals and aliases.
    source: Option<SqlExpr>,
}

/// Where an ORDER BY term reads its value from.
enum SortKey {
    Output(String),
    Hidden(Expr),
}

fn translate_query(session: &SparkSession, query: &Query) -> Result<DataFrame, EngineError> {
    let select = match query.body.as_ref() {
        SetExpr::Select(select) => select.as_ref(),
        _ => {
            return Err(EngineError::Sql(
                "SQL: only SELECT (no UNION/EXCEPT/INTERSECT/VALUES) is supported.".into(),
            ));
        }
    };
    if query.with.is_some() {
        return Err(EngineError::Sql("SQL: WITH clauses are not supported.".into()));
    }
    let cs = session.is_case_sensitive();
    let mut df = translate_from(session, select)?;
    let columns = df.columns()?;

    if let Some(selection) = &select.selection {
        let predicate = ExprTranslator::rows(&columns, cs)
            .translate(selection)
            .map_err(|e| e.with_context("WHERE"))?;
        df = df.filter(predicate.expr)?;
    }

    let group_exprs: &[SqlExpr] = match &select.group_by {
        GroupByExpr::Expressions(exprs) => exprs.as_slice(),
        GroupByExpr::All => {
            return Err(EngineError::Sql(
                "SQL: GROUP BY ALL is not supported. Use explicit GROUP BY columns.".into(),
            ));
        }
    };
    let projection_has_agg = select.projection.iter().any(|item| match item {
        SelectItem::UnnamedExpr(e) | SelectItem::ExprWithAlias { expr: e, .. } => {
            contains_aggregate(e)
        }
        _ => false,
    });
    let grouped = !group_exprs.is_empty() || projection_has_agg || select.having.is_some();

    let distinct = match &select.distinct {
        None => false,
        Some(Distinct::Distinct) => true,
        Some(Distinct::On(_)) => {
            return Err(EngineError::Sql("SQL: DISTINCT ON is not supported.".into()))
        }
    };

    let mut lf = df.lazy_frame();
    let (outputs, sort_keys, hidden) = if grouped {
        let mut grouping = Grouping::default();
        let keys = group_keys(&columns, cs, &select.projection, group_exprs, &mut grouping)?;
        let outputs;
        let having;
        let order;
        {
            let mut t = ExprTranslator::grouped(&columns, cs, &mut grouping);
            outputs = projection(&mut t, &select.projection, &columns)?;
            having = match &select.having {
                Some(h) => {
                    let h = replace_aliases(h, &select.projection, &columns, cs);
                    Some(t.translate(&h).map_err(|e| e.with_context("HAVING"))?)
                }
                None => None,
            };
            order = order_keys(&mut t, &query.order_by, &outputs, cs)?;
        }
        let aggs = grouping.agg_exprs();
        lf = if keys.is_empty() {
            lf.select(aggs)
        } else {
            lf.group_by_stable(keys).agg(aggs)
        };
        if let Some(h) = having {
            lf = lf.filter(h.expr);
        }
        (outputs, order.0, order.1)
    } else {
        let mut t = ExprTranslator::rows(&columns, cs);
        let outputs = projection(&mut t, &select.projection, &columns)?;
        let (sort_keys, hidden) = order_keys(&mut t, &query.order_by, &outputs, cs)?;
        (outputs, sort_keys, hidden)
    };

    check_unique_names(&outputs)?;
    let output_names: Vec<String> = outputs.iter().map(|o| o.name.clone()).collect();
    let mut exprs: Vec<Expr> = outputs
        .into_iter()
        .map(|o| o.expr.alias(o.name.as_str()))
        .collect();
    if distinct && !hidden.is_empty() {
        return Err(EngineError::Sql(
            "SQL: with SELECT DISTINCT, ORDER BY expressions must appear in the select list."
                .into(),
        ));
    }
    let has_hidden = !hidden.is_empty();
    exprs.extend(hidden);
    lf = lf.select(exprs);
    if distinct {
        lf = lf.unique_stable(None, UniqueKeepStrategy::First);
    }

    if !sort_keys.is_empty() {
        let mut by = Vec::with_capacity(sort_keys.len());
        let mut descending = Vec::with_capacity(sort_keys.len());
        let mut nulls_last = Vec::with_capacity(sort_keys.len());
        for (key, desc, nl) in sort_keys {
            by.push(match key {
                SortKey::Output(name) => col(name.as_str()),
                SortKey::Hidden(e) => e,
            });
            descending.push(desc);
            nulls_last.push(nl);
        }
        lf = lf.sort_by_exprs(
            by,
            SortMultipleOptions::new()
                .with_order_descending_multi(descending)
                .with_nulls_last_multi(nulls_last)
                .with_maintain_order(true),
        );
    }
    if let Some(limit) = &query.limit {
        let n = sql_limit_to_usize(limit)?;
        lf = lf.limit(IdxSize::try_from(n).unwrap_or(IdxSize::MAX));
    }
    if has_hidden {
        lf = lf.select(output_names.iter().map(|n| col(n.as_str())).collect::<Vec<_>>());
    }
    log::debug!("translated SQL to plan with columns [{}]", output_names.join(", "));
    Ok(df.with_plan(lf))
}

fn translate_from(session: &SparkSession, select: &Select) -> Result<DataFrame, EngineError> {
    let table = match select.from.as_slice() {
        [table] if table.joins.is_empty() => table,
        [] => {
            return Err(EngineError::Sql(
                "SQL: FROM clause is required. Register a view with create_or_replace_temp_view."
                    .into(),
            ))
        }
        _ => {
            return Err(EngineError::Sql(
                "SQL: only a single view is supported in FROM (no joins).".into(),
            ))
        }
    };
    match &table.relation {
        TableFactor::Table { name, .. } => session.table(&object_name(name)?),
        _ => Err(EngineError::Sql(
            "SQL: only plain view names are supported in FROM (no subqueries or table functions)."
                .into(),
        )),
    }
}

fn ordinal(e: &SqlExpr) -> Option<usize> {
    match e {
        SqlExpr::Value(Value::Number(s, _)) => s.parse::<usize>().ok(),
        _ => None,
    }
}

fn item_expr(item: &SelectItem) -> Option<&SqlExpr> {
    match item {
        SelectItem::UnnamedExpr(e) | SelectItem::ExprWithAlias { expr: e, .. } => Some(e),
        _ => None,
    }
}

/// Translate GROUP BY terms in row scope and register them as grouping keys.
/// A term may be an expression over the input, a projection alias or a 1-based
/// projection ordinal.
fn group_keys(
    columns: &[String],
    cs: bool,
    projection: &[SelectItem],
    group_exprs: &[SqlExpr],
    grouping: &mut Grouping,
) -> Result<Vec<Expr>, EngineError> {
    let mut keys = Vec::with_capacity(group_exprs.len());
    for g in group_exprs {
        let source = if let Some(n) = ordinal(g) {
            projection
                .get(n.wrapping_sub(1))
                .and_then(item_expr)
                .ok_or_else(|| {
                    EngineError::Sql(format!("SQL: GROUP BY position {n} is not in the select list."))
                })?
        } else if let SqlExpr::Identifier(ident) = g {
            let is_column = resolve_name(columns, &ident.value, cs).is_some();
            let alias = projection.iter().find_map(|item| match item {
                SelectItem::ExprWithAlias { expr, alias }
                    if !is_column && alias.value.eq_ignore_ascii_case(&ident.value) =>
                {
                    Some(expr)
                }
                _ => None,
            });
            alias.unwrap_or(g)
        } else {
            g
        };
        if contains_aggregate(source) {
            return Err(EngineError::Sql(
                "SQL: aggregate functions are not allowed in GROUP BY.".into(),
            ));
        }
        let t = ExprTranslator::rows(columns, cs)
            .translate(source)
            .map_err(|e| e.with_context("GROUP BY"))?;
        let hidden = grouping.add_key(&t.name);
        keys.push(t.expr.alias(hidden.as_str()));
    }
    Ok(keys)
}

/// Replace references to projection aliases (that are not also input columns) with
/// the aliased expression, so HAVING can filter on `average_price`.
fn replace_aliases(e: &SqlExpr, projection: &[SelectItem], columns: &[String], cs: bool) -> SqlExpr {
    let recurse = |inner: &SqlExpr| Box::new(replace_aliases(inner, projection, columns, cs));
    match e {
        SqlExpr::Identifier(ident) if resolve_name(columns, &ident.value, cs).is_none() => projection
            .iter()
            .find_map(|item| match item {
                SelectItem::ExprWithAlias { expr, alias }
                    if alias.value.eq_ignore_ascii_case(&ident.value) =>
                {
                    Some(expr.clone())
                }
                _ => None,
            })
            .unwrap_or_else(|| e.clone()),
        SqlExpr::BinaryOp { left, op, right } => SqlExpr::BinaryOp {
            left: recurse(left),
            op: op.clone(),
            right: recurse(right),
        },
        SqlExpr::UnaryOp { op, expr } => SqlExpr::UnaryOp {
            op: op.clone(),
            expr: recurse(expr),
        },
        SqlExpr::Nested(inner) => SqlExpr::Nested(recurse(inner)),
        SqlExpr::IsNull(inner) => SqlExpr::IsNull(recurse(inner)),
        SqlExpr::IsNotNull(inner) => SqlExpr::IsNotNull(recurse(inner)),
        SqlExpr::Between {
            expr,
            negated,
            low,
            high,
        } => SqlExpr::Between {
            expr: recurse(expr),
            negated: *negated,
            low: recurse(low),
            high: recurse(high),
        },
        other => other.clone(),
    }
}

fn projection(
    t: &mut ExprTranslator<'_>,
    items: &[SelectItem],
    columns: &[String],
) -> Result<Vec<Output>, EngineError> {
    let mut outputs = Vec::with_capacity(items.len());
    for item in items {
        match item {
            SelectItem::UnnamedExpr(e) => {
                let Translated { expr, name } = t.translate(e)?;
                outputs.push(Output {
                    expr,
                    name,
                    source: Some(e.clone()),
                });
            }
            SelectItem::ExprWithAlias { expr: e, alias } => {
                let Translated { expr, .. } = t.translate(e)?;
                outputs.push(Output {
                    expr,
                    name: alias.value.clone(),
                    source: Some(e.clone()),
                });
            }
            SelectItem::Wildcard(_) | SelectItem::QualifiedWildcard(..) => {
                for c in columns {
                    let Translated { expr, name } = t.translate(&SqlExpr::Identifier(c.as_str().into()))?;
                    outputs.push(Output {
                        expr,
                        name,
                        source: None,
                    });
                }
            }
        }
    }
    if outputs.is_empty() {
        return Err(EngineError::Sql(
            "SQL: SELECT must list at least one column or *.".into(),
        ));
    }
    Ok(outputs)
}

fn check_unique_names(outputs: &[Output]) -> Result<(), EngineError> {
    for (i, o) in outputs.iter().enumerate() {
        if outputs[..i].iter().any(|p| p.name == o.name) {
            return Err(EngineError::Sql(format!(
                "SQL: duplicate output column '{}'. Add an alias with AS.",
                o.name
            )));
        }
    }
    Ok(())
}

/// Resolve ORDER BY terms: ordinals and output names sort by the output column,
/// anything else is computed into a hidden `__order_n` column.
fn order_keys(
    t: &mut ExprTranslator<'_>,
    order_by: &[OrderByExpr],
    outputs: &[Output],
    cs: bool,
) -> Result<(Vec<(SortKey, bool, bool)>, Vec<Expr>), EngineError> {
    let names: Vec<String> = outputs.iter().map(|o| o.name.clone()).collect();
    let mut keys = Vec::with_capacity(order_by.len());
    let mut hidden = Vec::new();
    for o in order_by {
        let descending = o.asc == Some(false);
        let nulls_last = o.nulls_first.map(|f| !f).unwrap_or(descending);
        let key = if let Some(n) = ordinal(&o.expr) {
            let name = names.get(n.wrapping_sub(1)).ok_or_else(|| {
                EngineError::Sql(format!("SQL: ORDER BY position {n} is not in the select list."))
            })?;
            SortKey::Output(name.clone())
        } else if let Some(name) = match &o.expr {
            SqlExpr::Identifier(ident) => resolve_name(&names, &ident.value, cs),
            _ => None,
        } {
            SortKey::Output(name)
        } else {
            let translated = t.translate(&o.expr).map_err(|e| e.with_context("ORDER BY"))?;
            match outputs
                .iter()
                .find(|out| out.source.as_ref() == Some(&o.expr) || out.name == translated.name)
            {
                Some(out) => SortKey::Output(out.name.clone()),
                None => {
                    let name = format!("__order_{}", hidden.len());
                    hidden.push(translated.expr.alias(name.as_str()));
                    SortKey::Hidden(col(name.as_str()))
                }
            }
        };
        keys.push((key, descending, nulls_last));
    }
    Ok((keys, hidden))
}

fn sql_limit_to_usize(expr: &SqlExpr) -> Result<usize, EngineError> {
    match expr {
        SqlExpr::Value(Value::Number(s, _)) => s.parse::<usize>().map_err(|_| {
            EngineError::Sql(format!(
                "SQL: LIMIT must be a non-negative integer, got '{s}'"
            ))
        }),
        _ => Err(EngineError::Sql(
            "SQL: LIMIT must be a literal integer.".into(),
        )),
    }
}
