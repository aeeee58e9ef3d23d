//! Filter compiler.
//!
//! Folds a [`Filter`] tree into the WHERE clause of a [`TableQuery`]. The predicate
//! handle is threaded explicitly through every recursive call and returned from it;
//! sub-expressions of `$and`/`$or`/`$not` are compiled into a fresh handle and then
//! attached as one group.

use crate::error::ConnectorResult;
use crate::filter::Filter;
use crate::ident::Ident;
use crate::qb::{CompareOp, Expr, ExprGroup, TableQuery};
use crate::value::Value;
use futures_util::future::{BoxFuture, FutureExt};

/// AND `filter` into the query's WHERE clause.
pub async fn apply_filter(query: TableQuery, filter: &Filter) -> ConnectorResult<TableQuery> {
    let (query, group) = query.split_where();
    let group = fold(group, filter).await?;
    Ok(query.with_where(group))
}

/// Compile `filter` on its own, yielding `None` when it restricts nothing.
pub async fn compile_filter(filter: &Filter) -> ConnectorResult<Option<Expr>> {
    sub_expr(filter).await
}

fn fold<'a>(group: ExprGroup, filter: &'a Filter) -> BoxFuture<'a, ConnectorResult<ExprGroup>> {
    fold_node(group, filter).boxed()
}

/// Compile a sub-expression into a fresh handle.
async fn sub_expr(filter: &Filter) -> ConnectorResult<Option<Expr>> {
    Ok(fold(ExprGroup::new(), filter).await?.into_expr())
}

async fn fold_node(group: ExprGroup, filter: &Filter) -> ConnectorResult<ExprGroup> {
    let group = match filter {
        Filter::Properties(map) => {
            let mut group = group;
            for (column, value) in map {
                group = group.and_expr(Expr::eq(Ident::parse(column)?, value.clone()));
            }
            group
        }
        Filter::And(children) => {
            let mut group = group;
            for child in children {
                if let Some(expr) = sub_expr(child).await? {
                    group = group.and_expr(expr);
                }
            }
            group
        }
        Filter::Or(children) => {
            let mut branches = Vec::with_capacity(children.len());
            for child in children {
                match sub_expr(child).await? {
                    Some(expr) => branches.push(expr),
                    // an unrestricted branch makes the whole disjunction true
                    None => return Ok(group),
                }
            }
            if branches.is_empty() {
                group
            } else {
                group.and_expr(Expr::or(branches))
            }
        }
        Filter::Not(inner) => match sub_expr(inner).await? {
            Some(expr) => group.and_expr(Expr::not(expr)),
            None => group.and_expr(Expr::False),
        },
        Filter::In { column, values } => {
            group.and_expr(Expr::in_list(Ident::parse(column)?, values.clone()))
        }
        Filter::NotIn { column, values } => {
            group.and_expr(Expr::not_in(Ident::parse(column)?, values.clone()))
        }
        Filter::Null(column) => group.and_expr(Expr::is_null(Ident::parse(column)?)),
        Filter::NotNull(column) => group.and_expr(Expr::is_not_null(Ident::parse(column)?)),
        Filter::Between { column, from, to } => group.and_expr(Expr::between(
            Ident::parse(column)?,
            from.clone(),
            to.clone(),
        )),
        Filter::NotBetween { column, from, to } => group.and_expr(Expr::not_between(
            Ident::parse(column)?,
            from.clone(),
            to.clone(),
        )),
        Filter::Gt { column, value } => group.and_expr(compare(column, CompareOp::Gt, value)?),
        Filter::Gte { column, value } => {
            group.and_expr(compare(column, CompareOp::Gte, value)?)
        }
        Filter::Lt { column, value } => group.and_expr(compare(column, CompareOp::Lt, value)?),
        Filter::Lte { column, value } => {
            group.and_expr(compare(column, CompareOp::Lte, value)?)
        }
        Filter::Raw { query, bindings } => {
            group.and_expr(Expr::raw(query.clone(), bindings.clone()))
        }
        Filter::Async(deferred) => {
            let resolved = deferred.resolve().await?;
            fold(group, &resolved).await?
        }
    };
    Ok(group)
}

fn compare(column: &str, op: CompareOp, value: &Value) -> ConnectorResult<Expr> {
    Ok(Expr::compare(Ident::parse(column)?, op, value.clone()))
}
