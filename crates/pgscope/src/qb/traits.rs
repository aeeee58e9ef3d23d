//! Trait definitions for query builders.

use crate::error::ConnectorResult;
use crate::qb::param::ParamList;

/// The result of rendering a builder: SQL text with `?` markers plus the values
/// for those markers in text order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub bindings: ParamList,
}

impl Statement {
    /// Create a new statement.
    pub fn new(sql: String, bindings: ParamList) -> Self {
        Self { sql, bindings }
    }
}

/// Base trait for all query builders.
pub trait SqlQb {
    /// Render SQL and bindings without validating builder state.
    fn build_statement(&self) -> Statement;

    /// Validate builder state before rendering for execution.
    fn validate(&self) -> ConnectorResult<()> {
        Ok(())
    }

    /// Validate, then render.
    fn to_statement(&self) -> ConnectorResult<Statement> {
        self.validate()?;
        Ok(self.build_statement())
    }

    /// Debug helper to get the SQL string.
    fn to_sql(&self) -> String {
        self.build_statement().sql
    }
}
