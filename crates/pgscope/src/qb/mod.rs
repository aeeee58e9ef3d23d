//! Query builder used by the scope compiler.
//!
//! Every builder renders a [`Statement`]: SQL text with `?` positional markers and
//! the bound values in marker order. Identifiers are validated when they enter a
//! builder and always rendered quoted.
//!
//! ```ignore
//! use pgscope::qb::{self, SortDirection, SqlQb};
//!
//! let stmt = qb::table("users")?
//!     .and_where(Expr::compare(Ident::parse("age")?, CompareOp::Gte, 18))
//!     .limit(10)
//!     .select_all()
//!     .order_by("age", SortDirection::Asc)?
//!     .to_statement()?;
//! // SELECT * FROM "users" WHERE "age" >= ? ORDER BY "age" ASC LIMIT 10
//! ```

mod delete;
mod expr;
mod insert;
mod param;
mod select;
mod table;
mod traits;
mod update;

pub use delete::DeleteQb;
pub use expr::{CompareOp, Expr, ExprGroup};
pub use insert::InsertQb;
pub use param::ParamList;
pub use select::{SelectQb, SortDirection};
pub use table::TableQuery;
pub use traits::{SqlQb, Statement};
pub use update::UpdateQb;

use crate::error::ConnectorResult;

/// Create a collection handle for the given table.
pub fn table(table: &str) -> ConnectorResult<TableQuery> {
    TableQuery::new(table)
}

/// Create an INSERT query builder for the given table.
pub fn insert(table: &str) -> ConnectorResult<InsertQb> {
    InsertQb::new(table)
}
