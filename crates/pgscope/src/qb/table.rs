//! The collection handle: one table, its WHERE clause and its pagination.

use crate::error::ConnectorResult;
use crate::ident::Ident;
use crate::qb::delete::DeleteQb;
use crate::qb::expr::{Expr, ExprGroup};
use crate::qb::param::ParamList;
use crate::qb::select::SelectQb;
use crate::qb::update::UpdateQb;
use crate::value::Record;

/// A filtered, paginated row-set of one table.
///
/// Every step consumes the handle and returns it, so a handle under construction is
/// never shared. Terminal conversions ([`select`](Self::select),
/// [`update`](Self::update), [`delete`](Self::delete)) turn it into a statement
/// builder.
#[derive(Clone, Debug)]
pub struct TableQuery {
    table: Ident,
    where_group: ExprGroup,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl TableQuery {
    /// Create a handle targeting `table`.
    pub fn new(table: &str) -> ConnectorResult<Self> {
        Ok(Self {
            table: Ident::parse(table)?,
            where_group: ExprGroup::new(),
            limit: None,
            offset: None,
        })
    }

    /// The target table.
    pub fn table(&self) -> &Ident {
        &self.table
    }

    /// The WHERE clause accumulated so far.
    pub fn where_group(&self) -> &ExprGroup {
        &self.where_group
    }

    /// Detach the WHERE clause so it can be folded over separately.
    pub fn split_where(mut self) -> (Self, ExprGroup) {
        let group = std::mem::take(&mut self.where_group);
        (self, group)
    }

    /// Replace the WHERE clause.
    pub fn with_where(mut self, group: ExprGroup) -> Self {
        self.where_group = group;
        self
    }

    /// AND an expression into the WHERE clause.
    pub fn and_where(mut self, expr: Expr) -> Self {
        self.where_group = self.where_group.and_expr(expr);
        self
    }

    /// Set LIMIT.
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Set OFFSET.
    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Whether LIMIT or OFFSET is set.
    pub fn is_paginated(&self) -> bool {
        self.limit.is_some() || self.offset.is_some()
    }

    // ==================== Terminal conversions ====================

    /// SELECT every column.
    pub fn select_all(self) -> SelectQb {
        SelectQb::new(self)
    }

    /// SELECT the given columns (empty selects every column).
    pub fn select(self, columns: &[&str]) -> ConnectorResult<SelectQb> {
        SelectQb::new(self).columns(columns)
    }

    /// UPDATE the row-set with the given attributes.
    pub fn update(self, attrs: &Record) -> ConnectorResult<UpdateQb> {
        UpdateQb::new(self).set_record(attrs)
    }

    /// DELETE the row-set.
    pub fn delete(self) -> DeleteQb {
        DeleteQb::new(self)
    }

    // ==================== Render helpers ====================

    /// Append ` WHERE ...` when the clause is not empty.
    pub(crate) fn write_where(&self, sql: &mut String, params: &mut ParamList) {
        let where_sql = self.where_group.build(params);
        if !where_sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }
    }

    /// Append ` LIMIT n` / ` OFFSET m`.
    pub(crate) fn write_pagination(&self, sql: &mut String) {
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
    }

    /// Append the row restriction for UPDATE/DELETE.
    ///
    /// PostgreSQL has no `UPDATE ... LIMIT`, so a paginated mutation targets the
    /// physical row ids picked by a paginated sub-select.
    pub(crate) fn write_mutation_target(&self, sql: &mut String, params: &mut ParamList) {
        if self.is_paginated() {
            let table = self.table.to_sql();
            sql.push_str(" WHERE ctid IN (SELECT ctid FROM ");
            sql.push_str(&table);
            self.write_where(sql, params);
            self.write_pagination(sql);
            sql.push(')');
        } else {
            self.write_where(sql, params);
        }
    }
}
