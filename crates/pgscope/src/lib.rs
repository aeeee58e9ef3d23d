//! # pgscope
//!
//! Compile declarative query scopes into parameterized PostgreSQL.
//!
//! A [`Scope`] names a table, a filter tree, a sort order and pagination. The
//! [`Connector`] compiles it through the query builders in [`qb`], binds every value
//! as a named `:paramN` parameter and hands the statement to an [`SqlExecutor`].
//!
//! ## Features
//!
//! - **Filter trees**: equality maps plus `$and`, `$or`, `$not`, `$in`, `$notIn`,
//!   `$null`, `$notNull`, `$between`, `$notBetween`, `$gt`, `$gte`, `$lt`, `$lte`,
//!   `$raw` and deferred `$async` sub-filters
//! - **Injection-safe**: values are always bound, identifiers validated and quoted,
//!   and a statement whose markers disagree with its bindings is never sent
//! - **Pluggable execution**: anything implementing [`SqlExecutor`]; `tokio-postgres`
//!   clients and `deadpool` pools are supported out of the box
//! - **Query logging**: per-statement timing through `tracing`
//!
//! ```ignore
//! use pgscope::{Connector, Scope, PoolExecutor, create_pool};
//!
//! let connector = Connector::new(PoolExecutor::new(create_pool(&url)?));
//! let scope: Scope = serde_json::from_value(json!({
//!     "tableName": "users",
//!     "filter": { "$gte": { "age": 18 } },
//!     "order": [{ "key": "age", "dir": "asc" }],
//!     "limit": 10
//! }))?;
//! // SELECT * FROM "users" WHERE "age" >= $1 ORDER BY "age" ASC LIMIT 10
//! let rows = connector.query(&scope).await?;
//! ```

pub mod bind;
pub mod compile;
pub mod config;
pub mod connector;
pub mod error;
pub mod executor;
pub mod filter;
pub mod ident;
pub mod pg;
pub mod qb;
pub mod scope;
pub mod value;

pub use bind::{BindingMismatch, BoundStatement, ParameterSet, bind};
pub use compile::{apply_filter, compile_filter};
pub use config::ConnectorConfig;
pub use connector::{Connector, KeyType};
pub use error::{ConnectorError, ConnectorResult};
pub use executor::SqlExecutor;
pub use filter::{DeferredFilter, Filter};
pub use ident::Ident;
pub use pg::PgExecutor;
pub use qb::SortDirection;
pub use scope::{Order, Scope};
pub use value::{Record, Value};

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use pool::{PoolExecutor, create_pool, create_pool_with_config};
