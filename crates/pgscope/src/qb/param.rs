//! Positional bindings collected while rendering a statement.

use crate::value::Value;

/// Ordered bound values, one per `?` marker in the rendered SQL.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParamList {
    params: Vec<Value>,
}

impl ParamList {
    /// Create a new empty parameter list.
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Add a value and return the placeholder marker for it.
    pub fn push(&mut self, value: Value) -> &'static str {
        self.params.push(value);
        "?"
    }

    /// Get the current parameter count.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Extend this list with another list's parameters.
    pub fn extend(&mut self, other: ParamList) {
        self.params.extend(other.params);
    }

    /// Extend this list with values from an iterator.
    pub fn extend_values(&mut self, values: impl IntoIterator<Item = Value>) {
        self.params.extend(values);
    }

    /// Borrow the values in binding order.
    pub fn as_slice(&self) -> &[Value] {
        &self.params
    }

    /// Take the values in binding order.
    pub fn into_vec(self) -> Vec<Value> {
        self.params
    }
}
