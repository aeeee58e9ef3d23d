//! Query operations over an [`SqlExecutor`].

use crate::bind::bind;
use crate::config::ConnectorConfig;
use crate::error::{ConnectorError, ConnectorResult};
use crate::executor::SqlExecutor;
use crate::qb::{self, SqlQb, Statement};
use crate::scope::Scope;
use crate::value::Record;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::Level;

/// Type of a primary key column, as reported by the caller on insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Number,
    Uuid,
}

/// Compiles scopes into SQL and runs them on an executor.
///
/// The connector holds only its executor and immutable configuration, so a shared
/// reference can serve concurrent operations.
///
/// ```ignore
/// let connector = Connector::new(PoolExecutor::new(pool));
/// let scope = Scope::new("users").filter(Filter::gte("age", 18)).limit(10);
/// let adults = connector.query(&scope).await?;
/// let total = connector.count(&Scope::new("users")).await?;
/// ```
#[derive(Clone)]
pub struct Connector<E> {
    executor: E,
    config: ConnectorConfig,
}

impl<E: SqlExecutor> Connector<E> {
    /// Create a connector with the default configuration.
    pub fn new(executor: E) -> Self {
        Self::with_config(executor, ConnectorConfig::default())
    }

    pub fn with_config(executor: E, config: ConnectorConfig) -> Self {
        Self { executor, config }
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Fetch every column of the scope's rows, ordered by the scope's order entries.
    pub async fn query(&self, scope: &Scope) -> ConnectorResult<Vec<Record>> {
        let select = scope.apply_order(scope.collection().await?.select_all())?;
        self.dispatch(select.to_statement()?).await
    }

    /// Count the scope's rows.
    ///
    /// Limit and skip bound the counted set; ordering is ignored.
    pub async fn count(&self, scope: &Scope) -> ConnectorResult<u64> {
        let select = scope.collection().await?.select_all();
        let rows = self.dispatch(select.count_statement()).await?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| ConnectorError::internal("count query returned no rows"))?;
        let value = row
            .get("count")
            .or_else(|| row.values().next())
            .ok_or_else(|| ConnectorError::internal("count query returned an empty row"))?;
        value
            .as_i64()
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| {
                ConnectorError::internal(format!("count query returned non-count value {value}"))
            })
    }

    /// Fetch the given columns of the scope's rows (empty selects every column).
    pub async fn select(&self, scope: &Scope, columns: &[&str]) -> ConnectorResult<Vec<Record>> {
        let select = scope.collection().await?.select(columns)?;
        let select = scope.apply_order(select)?;
        self.dispatch(select.to_statement()?).await
    }

    /// Set `attrs` on every row of the scope, returning the updated rows.
    pub async fn update_all(&self, scope: &Scope, attrs: &Record) -> ConnectorResult<Vec<Record>> {
        if attrs.is_empty() {
            return Err(ConnectorError::validation(
                "update_all requires at least one attribute",
            ));
        }
        let update = scope.collection().await?.update(attrs)?.returning_all();
        self.dispatch(update.to_statement()?).await
    }

    /// Delete every row of the scope, returning the deleted rows.
    pub async fn delete_all(&self, scope: &Scope) -> ConnectorResult<Vec<Record>> {
        let delete = scope.collection().await?.delete().returning_all();
        self.dispatch(delete.to_statement()?).await
    }

    /// Insert `records` into `table` in one statement, returning the inserted rows.
    ///
    /// `keys` names the table's primary key columns and their types; it is only
    /// logged.
    pub async fn batch_insert(
        &self,
        table: &str,
        records: &[Record],
        keys: &BTreeMap<String, KeyType>,
    ) -> ConnectorResult<Vec<Record>> {
        let insert = qb::insert(table)?;
        if records.is_empty() {
            return Ok(Vec::new());
        }
        tracing::trace!(
            target: "pgscope.sql",
            table,
            rows = records.len(),
            keys = ?keys,
            "batch insert"
        );
        let insert = insert.records(records)?.returning_all();
        self.dispatch(insert.to_statement()?).await
    }

    /// Raw SQL execution is not offered; build a [`Scope`] or call the executor.
    pub async fn execute(&self, _sql: &str) -> ConnectorResult<Vec<Record>> {
        Err(ConnectorError::Unsupported("raw execute"))
    }

    /// Bind and run a statement.
    ///
    /// A statement whose markers disagree with its bindings is never sent: the
    /// mismatch is logged and the operation sees no rows.
    async fn dispatch(&self, statement: Statement) -> ConnectorResult<Vec<Record>> {
        let bound = match bind(&statement) {
            Ok(bound) => bound,
            Err(mismatch) => {
                tracing::warn!(
                    target: "pgscope.sql",
                    sql = %self.config.display_sql(&statement.sql),
                    markers = mismatch.markers,
                    bindings = mismatch.bindings,
                    "placeholder/binding count mismatch, possible SQL injection; statement not executed"
                );
                return Ok(Vec::new());
            }
        };

        let start = Instant::now();
        let result = self.executor.execute(&bound.sql, &bound.params).await;
        if self.config.debug {
            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
            let params = serde_json::to_string(&bound.params)
                .unwrap_or_else(|e| format!("<unserializable: {e}>"));
            self.emit_timing(&bound.sql, &params, elapsed_ms, result.is_ok());
        }
        result
    }

    fn emit_timing(&self, sql: &str, params: &str, elapsed_ms: f64, ok: bool) {
        /// Dispatch a tracing event at a runtime-determined level.
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let sql = self.config.display_sql(sql);
        let elapsed_ms = format!("{elapsed_ms:.3}");
        emit_at_level!(
            self.config.level,
            target: "pgscope.sql",
            sql = %sql,
            params = %params,
            elapsed_ms = %elapsed_ms,
            ok,
            "statement executed"
        );
    }
}
