//! The SQL executor seam.

use crate::bind::ParameterSet;
use crate::error::ConnectorResult;
use crate::value::Record;

/// Runs SQL with named `:paramN` placeholders and returns the rows.
///
/// Implementations own everything below the statement: connections, pooling,
/// transactions, retries and the wire protocol. [`PgExecutor`](crate::PgExecutor)
/// and [`PoolExecutor`](crate::PoolExecutor) adapt `tokio-postgres`; tests plug in
/// an in-memory recorder.
pub trait SqlExecutor: Send + Sync {
    /// Execute `sql` and return all result rows.
    fn execute(
        &self,
        sql: &str,
        params: &ParameterSet,
    ) -> impl std::future::Future<Output = ConnectorResult<Vec<Record>>> + Send;
}

impl<E: SqlExecutor> SqlExecutor for &E {
    async fn execute(&self, sql: &str, params: &ParameterSet) -> ConnectorResult<Vec<Record>> {
        (**self).execute(sql, params).await
    }
}

impl<E: SqlExecutor> SqlExecutor for std::sync::Arc<E> {
    async fn execute(&self, sql: &str, params: &ParameterSet) -> ConnectorResult<Vec<Record>> {
        (**self).execute(sql, params).await
    }
}
