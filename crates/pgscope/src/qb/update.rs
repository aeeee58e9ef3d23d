//! UPDATE over a [`TableQuery`].

use crate::error::{ConnectorError, ConnectorResult};
use crate::ident::Ident;
use crate::qb::param::ParamList;
use crate::qb::table::TableQuery;
use crate::qb::traits::{SqlQb, Statement};
use crate::value::{Record, Value};

/// UPDATE query builder; the WHERE clause and pagination come from the handle.
#[derive(Clone, Debug)]
pub struct UpdateQb {
    base: TableQuery,
    set_fields: Vec<(Ident, Value)>,
    returning: bool,
}

impl UpdateQb {
    /// Create a new UPDATE query builder.
    pub fn new(base: TableQuery) -> Self {
        Self {
            base,
            set_fields: Vec::new(),
            returning: false,
        }
    }

    /// Set a column value.
    pub fn set(mut self, column: &str, value: impl Into<Value>) -> ConnectorResult<Self> {
        self.set_fields.push((Ident::parse(column)?, value.into()));
        Ok(self)
    }

    /// Set every attribute of a record.
    pub fn set_record(self, attrs: &Record) -> ConnectorResult<Self> {
        attrs
            .iter()
            .try_fold(self, |qb, (column, value)| qb.set(column, value.clone()))
    }

    /// Return the updated rows (`RETURNING "table".*`).
    pub fn returning_all(mut self) -> Self {
        self.returning = true;
        self
    }
}

impl SqlQb for UpdateQb {
    fn build_statement(&self) -> Statement {
        let mut params = ParamList::new();
        let table = self.base.table().to_sql();

        let set_parts: Vec<String> = self
            .set_fields
            .iter()
            .map(|(col, value)| format!("{} = {}", col.to_sql(), params.push(value.clone())))
            .collect();

        let mut sql = format!("UPDATE {} SET {}", table, set_parts.join(", "));
        self.base.write_mutation_target(&mut sql, &mut params);

        if self.returning {
            sql.push_str(&format!(" RETURNING {table}.*"));
        }
        Statement::new(sql, params)
    }

    fn validate(&self) -> ConnectorResult<()> {
        if self.set_fields.is_empty() {
            return Err(ConnectorError::validation(
                "UpdateQb: SET clause cannot be empty",
            ));
        }
        Ok(())
    }
}
