//! Multi-row INSERT.

use crate::error::{ConnectorError, ConnectorResult};
use crate::ident::Ident;
use crate::qb::param::ParamList;
use crate::qb::traits::{SqlQb, Statement};
use crate::value::{Record, Value};
use std::collections::BTreeSet;

/// INSERT query builder for a batch of records.
///
/// The column list is the sorted union of every record's keys; a record that lacks
/// one of those columns gets `DEFAULT` in that position.
#[derive(Clone, Debug)]
pub struct InsertQb {
    table: Ident,
    columns: Vec<Ident>,
    rows: Vec<Vec<Option<Value>>>,
    returning: bool,
}

impl InsertQb {
    /// Create a new INSERT query builder.
    pub fn new(table: &str) -> ConnectorResult<Self> {
        Ok(Self {
            table: Ident::parse(table)?,
            columns: Vec::new(),
            rows: Vec::new(),
            returning: false,
        })
    }

    /// Set the records to insert, replacing any previous ones.
    pub fn records(mut self, records: &[Record]) -> ConnectorResult<Self> {
        let names: BTreeSet<&str> = records
            .iter()
            .flat_map(|r| r.keys().map(String::as_str))
            .collect();

        self.columns = names
            .iter()
            .map(|name| Ident::parse(name))
            .collect::<ConnectorResult<_>>()?;
        self.rows = records
            .iter()
            .map(|record| names.iter().map(|name| record.get(*name).cloned()).collect())
            .collect();
        Ok(self)
    }

    /// Return the inserted rows (`RETURNING "table".*`).
    pub fn returning_all(mut self) -> Self {
        self.returning = true;
        self
    }

    /// Number of rows this statement inserts.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

impl SqlQb for InsertQb {
    fn build_statement(&self) -> Statement {
        let mut params = ParamList::new();
        let table = self.table.to_sql();

        let mut sql = format!("INSERT INTO {table}");
        if self.columns.is_empty() {
            sql.push_str(" DEFAULT VALUES");
        } else {
            let columns: Vec<String> = self.columns.iter().map(Ident::to_sql).collect();
            let tuples: Vec<String> = self
                .rows
                .iter()
                .map(|row| {
                    let slots: Vec<&str> = row
                        .iter()
                        .map(|cell| match cell {
                            Some(value) => params.push(value.clone()),
                            None => "DEFAULT",
                        })
                        .collect();
                    format!("({})", slots.join(", "))
                })
                .collect();
            sql.push_str(&format!(
                " ({}) VALUES {}",
                columns.join(", "),
                tuples.join(", ")
            ));
        }

        if self.returning {
            sql.push_str(&format!(" RETURNING {table}.*"));
        }
        Statement::new(sql, params)
    }

    fn validate(&self) -> ConnectorResult<()> {
        if self.rows.is_empty() {
            return Err(ConnectorError::validation("InsertQb: no records to insert"));
        }
        if self.columns.is_empty() && self.rows.len() > 1 {
            return Err(ConnectorError::validation(
                "InsertQb: records without columns can only be inserted one at a time",
            ));
        }
        Ok(())
    }
}
