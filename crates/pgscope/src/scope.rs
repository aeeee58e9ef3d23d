//! Scopes: the declarative description of a row-set.

use crate::compile::apply_filter;
use crate::error::{ConnectorError, ConnectorResult};
use crate::filter::Filter;
use crate::qb::{SelectQb, SortDirection, TableQuery};
use serde::Deserialize;

/// One ORDER BY entry.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Order {
    pub key: String,
    #[serde(default, alias = "direction")]
    pub dir: SortDirection,
}

impl Order {
    pub fn asc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            dir: SortDirection::Asc,
        }
    }

    pub fn desc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            dir: SortDirection::Desc,
        }
    }
}

/// Table, filter, ordering and pagination of a query.
///
/// ```ignore
/// let scope: Scope = serde_json::from_value(json!({
///     "tableName": "users",
///     "filter": { "$gte": { "age": 18 } },
///     "order": [{ "key": "age", "dir": "asc" }],
///     "limit": 10
/// }))?;
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub table_name: String,
    #[serde(default)]
    pub filter: Option<Filter>,
    #[serde(default)]
    pub order: Vec<Order>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub skip: Option<u64>,
}

impl Scope {
    /// Scope over every row of `table_name`.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Self::default()
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Append a sort key; earlier keys take precedence.
    pub fn order_by(mut self, key: impl Into<String>, dir: SortDirection) -> Self {
        self.order.push(Order {
            key: key.into(),
            dir,
        });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Check the scope before any SQL is built.
    pub fn validate(&self) -> ConnectorResult<()> {
        if self.table_name.trim().is_empty() {
            return Err(ConnectorError::invalid_scope("table name must not be empty"));
        }
        if let Some(i) = self.order.iter().position(|o| o.key.trim().is_empty()) {
            return Err(ConnectorError::invalid_scope(format!(
                "order entry {i} has an empty key"
            )));
        }
        Ok(())
    }

    /// Resolve the table, compile the filter and apply limit then skip.
    ///
    /// Ordering is left to the read operations.
    pub async fn collection(&self) -> ConnectorResult<TableQuery> {
        self.validate()?;
        let mut query = TableQuery::new(&self.table_name)?;
        if let Some(filter) = &self.filter {
            query = apply_filter(query, filter).await?;
        }
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }
        if let Some(skip) = self.skip {
            query = query.offset(skip);
        }
        Ok(query)
    }

    /// Apply the scope's ordering to a select, in sequence.
    pub(crate) fn apply_order(&self, mut select: SelectQb) -> ConnectorResult<SelectQb> {
        for order in &self.order {
            select = select.order_by(&order.key, order.dir)?;
        }
        Ok(select)
    }
}
