//! DELETE over a [`TableQuery`].

use crate::qb::param::ParamList;
use crate::qb::table::TableQuery;
use crate::qb::traits::{SqlQb, Statement};

/// DELETE query builder; the WHERE clause and pagination come from the handle.
///
/// A handle without conditions deletes every row of the table.
#[derive(Clone, Debug)]
pub struct DeleteQb {
    base: TableQuery,
    returning: bool,
}

impl DeleteQb {
    /// Create a new DELETE query builder.
    pub fn new(base: TableQuery) -> Self {
        Self {
            base,
            returning: false,
        }
    }

    /// Return the deleted rows (`RETURNING "table".*`).
    pub fn returning_all(mut self) -> Self {
        self.returning = true;
        self
    }
}

impl SqlQb for DeleteQb {
    fn build_statement(&self) -> Statement {
        let mut params = ParamList::new();
        let table = self.base.table().to_sql();
        let mut sql = format!("DELETE FROM {table}");
        self.base.write_mutation_target(&mut sql, &mut params);
        if self.returning {
            sql.push_str(&format!(" RETURNING {table}.*"));
        }
        Statement::new(sql, params)
    }
}
