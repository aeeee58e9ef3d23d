//! Parameter binder: `?` markers to named `:paramN` placeholders.

use crate::qb::Statement;
use crate::value::Value;
use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;

/// Name prefix of generated placeholders.
pub const PARAM_PREFIX: &str = "param";

/// Named parameters of one statement, in placeholder order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParameterSet {
    entries: Vec<(String, Value)>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add the next value and return its name (`param0`, `param1`, ...).
    pub fn push(&mut self, value: Value) -> &str {
        let name = format!("{PARAM_PREFIX}{}", self.entries.len());
        self.entries.push((name, value));
        &self.entries[self.entries.len() - 1].0
    }

    /// Look a value up by name (without the leading `:`).
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Position of a name, which is also its index among the values.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Values in placeholder order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl Serialize for ParameterSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// A statement ready for an executor.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundStatement {
    pub sql: String,
    pub params: ParameterSet,
}

/// The statement's marker count disagrees with its bindings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("statement has {markers} placeholders but {bindings} bindings")]
pub struct BindingMismatch {
    pub markers: usize,
    pub bindings: usize,
}

/// Replace each `?` left to right with `:paramI` and name the bindings to match.
///
/// Every `?` counts as a marker, including one inside a raw fragment's string
/// literal, so such a fragment must bind it explicitly.
pub fn bind(statement: &Statement) -> Result<BoundStatement, BindingMismatch> {
    let markers = statement.sql.matches('?').count();
    let bindings = statement.bindings.len();
    if markers != bindings {
        return Err(BindingMismatch { markers, bindings });
    }

    let mut params = ParameterSet::new();
    let mut values = statement.bindings.as_slice().iter().cloned();
    let mut sql = String::with_capacity(statement.sql.len() + markers * 8);
    for c in statement.sql.chars() {
        if c == '?' {
            // counts matched above, so a value is always left here
            let value = values.next().unwrap_or_default();
            sql.push(':');
            sql.push_str(params.push(value));
        } else {
            sql.push(c);
        }
    }
    Ok(BoundStatement { sql, params })
}
