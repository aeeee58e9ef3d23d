//! Filter expressions.
//!
//! A [`Filter`] is either a plain equality map or exactly one operator. In JSON an
//! operator is tagged by a single `$`-prefixed key:
//!
//! ```json
//! { "$and": [ { "$or": [ { "a": 1 }, { "a": 2 } ] }, { "b": 3 } ] }
//! ```
//!
//! Parsing is strict: an object that mixes operator and plain keys, carries two
//! operators, or gives an operator the wrong payload shape is rejected.

use crate::error::{ConnectorError, ConnectorResult};
use crate::value::{Record, Value};
use futures_util::future::{BoxFuture, FutureExt};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Prefix that marks an operator key in JSON filters.
pub const OPERATOR_SIGIL: char = '$';

/// Future produced by a [`DeferredFilter`].
pub type FilterFuture = BoxFuture<'static, ConnectorResult<Filter>>;

/// A sub-expression that is only known once a future resolves.
///
/// The resolver is invoked when the compiler reaches the node, so a scope holding a
/// deferred filter can be compiled more than once.
#[derive(Clone)]
pub struct DeferredFilter(Arc<dyn Fn() -> FilterFuture + Send + Sync>);

impl DeferredFilter {
    /// Wrap a resolver.
    pub fn new<F, Fut>(resolver: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ConnectorResult<Filter>> + Send + 'static,
    {
        Self(Arc::new(move || resolver().boxed()))
    }

    /// Start resolving the sub-expression.
    pub fn resolve(&self) -> FilterFuture {
        (self.0)()
    }
}

impl fmt::Debug for DeferredFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DeferredFilter").field(&"<resolver>").finish()
    }
}

/// A filter expression.
#[derive(Clone, Debug)]
pub enum Filter {
    /// Conjunction of `column = value` (an empty map matches everything).
    Properties(Record),
    /// `$and`: all sub-filters hold.
    And(Vec<Filter>),
    /// `$or`: at least one sub-filter holds.
    Or(Vec<Filter>),
    /// `$not`: the sub-filter does not hold.
    Not(Box<Filter>),
    /// `$in`: column IN (values)
    In { column: String, values: Vec<Value> },
    /// `$notIn`: column NOT IN (values)
    NotIn { column: String, values: Vec<Value> },
    /// `$null`: column IS NULL
    Null(String),
    /// `$notNull`: column IS NOT NULL
    NotNull(String),
    /// `$between`: from <= column <= to
    Between {
        column: String,
        from: Value,
        to: Value,
    },
    /// `$notBetween`: column NOT BETWEEN from AND to
    NotBetween {
        column: String,
        from: Value,
        to: Value,
    },
    /// `$gt`: column > value
    Gt { column: String, value: Value },
    /// `$gte`: column >= value
    Gte { column: String, value: Value },
    /// `$lt`: column < value
    Lt { column: String, value: Value },
    /// `$lte`: column <= value
    Lte { column: String, value: Value },
    /// `$raw`: a literal SQL fragment with `?` markers and its bindings.
    ///
    /// Nothing inside `query` is validated or escaped.
    Raw { query: String, bindings: Vec<Value> },
    /// `$async`: resolved when compiled.
    Async(DeferredFilter),
}

impl Filter {
    /// Equality conjunction over `(column, value)` pairs.
    pub fn props<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Filter::Properties(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Single equality: column = value
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::props([(column.into(), value.into())])
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And(filters)
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or(filters)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: Filter) -> Self {
        Filter::Not(Box::new(filter))
    }

    pub fn in_list<V: Into<Value>>(column: impl Into<String>, values: Vec<V>) -> Self {
        Filter::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn not_in<V: Into<Value>>(column: impl Into<String>, values: Vec<V>) -> Self {
        Filter::NotIn {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn null(column: impl Into<String>) -> Self {
        Filter::Null(column.into())
    }

    pub fn not_null(column: impl Into<String>) -> Self {
        Filter::NotNull(column.into())
    }

    pub fn between(column: impl Into<String>, from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Filter::Between {
            column: column.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn not_between(
        column: impl Into<String>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        Filter::NotBetween {
            column: column.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Gt {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn gte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Gte {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Lt {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn lte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Lte {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Raw SQL escape hatch. The caller is responsible for the fragment's safety.
    pub fn raw(query: impl Into<String>, bindings: Vec<Value>) -> Self {
        Filter::Raw {
            query: query.into(),
            bindings,
        }
    }

    /// A sub-filter produced by `resolver` at compile time.
    pub fn deferred<F, Fut>(resolver: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ConnectorResult<Filter>> + Send + 'static,
    {
        Filter::Async(DeferredFilter::new(resolver))
    }

    /// Parse a JSON filter.
    pub fn from_json(json: &serde_json::Value) -> ConnectorResult<Self> {
        let obj = json.as_object().ok_or_else(|| {
            ConnectorError::invalid_filter(format!("filter must be an object, got {json}"))
        })?;

        if !obj.keys().any(|k| k.starts_with(OPERATOR_SIGIL)) {
            return obj
                .iter()
                .map(|(column, v)| {
                    scalar("equality", column, v).map(|value| (column.clone(), value))
                })
                .collect::<ConnectorResult<Record>>()
                .map(Filter::Properties);
        }

        let mut entries = obj.iter();
        let (op, payload) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            _ => {
                let keys: Vec<&str> = obj.keys().map(String::as_str).collect();
                return Err(ConnectorError::invalid_filter(format!(
                    "operator filter must have exactly one key, got [{}]",
                    keys.join(", ")
                )));
            }
        };

        match op.as_str() {
            "$and" => Ok(Filter::And(sub_filters(op, payload)?)),
            "$or" => Ok(Filter::Or(sub_filters(op, payload)?)),
            "$not" => Ok(Filter::not(Filter::from_json(payload)?)),
            "$in" => {
                let (column, values) = single_entry(op, payload)?;
                Ok(Filter::In {
                    values: scalar_list(op, &column, values)?,
                    column,
                })
            }
            "$notIn" => {
                let (column, values) = single_entry(op, payload)?;
                Ok(Filter::NotIn {
                    values: scalar_list(op, &column, values)?,
                    column,
                })
            }
            "$null" => Ok(Filter::Null(column_name(op, payload)?)),
            "$notNull" => Ok(Filter::NotNull(column_name(op, payload)?)),
            "$between" => {
                let (column, (from, to)) = range(op, payload)?;
                Ok(Filter::Between { column, from, to })
            }
            "$notBetween" => {
                let (column, (from, to)) = range(op, payload)?;
                Ok(Filter::NotBetween { column, from, to })
            }
            "$gt" => {
                let (column, value) = comparison(op, payload)?;
                Ok(Filter::Gt { column, value })
            }
            "$gte" => {
                let (column, value) = comparison(op, payload)?;
                Ok(Filter::Gte { column, value })
            }
            "$lt" => {
                let (column, value) = comparison(op, payload)?;
                Ok(Filter::Lt { column, value })
            }
            "$lte" => {
                let (column, value) = comparison(op, payload)?;
                Ok(Filter::Lte { column, value })
            }
            "$raw" => raw(payload),
            "$async" => Err(ConnectorError::invalid_filter(
                "$async filters cannot be expressed in JSON; use Filter::deferred",
            )),
            other => Err(ConnectorError::UnknownOperator(other.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for Filter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Filter::from_json(&json).map_err(de::Error::custom)
    }
}

// ==================== JSON payload helpers ====================

fn scalar(op: &str, column: &str, json: &serde_json::Value) -> ConnectorResult<Value> {
    Value::from_json(json).ok_or_else(|| {
        ConnectorError::invalid_filter(format!(
            "{op}: value for '{column}' must be a scalar, got {json}"
        ))
    })
}

fn sub_filters(op: &str, payload: &serde_json::Value) -> ConnectorResult<Vec<Filter>> {
    payload
        .as_array()
        .ok_or_else(|| {
            ConnectorError::invalid_filter(format!("{op} expects an array of filters"))
        })?
        .iter()
        .map(Filter::from_json)
        .collect()
}

/// `{column: payload}` with exactly one key.
fn single_entry<'a>(
    op: &str,
    payload: &'a serde_json::Value,
) -> ConnectorResult<(String, &'a serde_json::Value)> {
    let obj = payload.as_object().ok_or_else(|| {
        ConnectorError::invalid_filter(format!("{op} expects an object {{column: ...}}"))
    })?;
    let mut entries = obj.iter();
    match (entries.next(), entries.next()) {
        (Some((column, value)), None) => Ok((column.clone(), value)),
        _ => Err(ConnectorError::invalid_filter(format!(
            "{op} expects exactly one column, got {}",
            obj.len()
        ))),
    }
}

fn scalar_list(op: &str, column: &str, json: &serde_json::Value) -> ConnectorResult<Vec<Value>> {
    json.as_array()
        .ok_or_else(|| {
            ConnectorError::invalid_filter(format!("{op}: '{column}' expects an array of values"))
        })?
        .iter()
        .map(|v| scalar(op, column, v))
        .collect()
}

fn column_name(op: &str, payload: &serde_json::Value) -> ConnectorResult<String> {
    payload
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ConnectorError::invalid_filter(format!("{op} expects a column name")))
}

fn comparison(op: &str, payload: &serde_json::Value) -> ConnectorResult<(String, Value)> {
    let (column, value) = single_entry(op, payload)?;
    let value = scalar(op, &column, value)?;
    Ok((column, value))
}

fn range(op: &str, payload: &serde_json::Value) -> ConnectorResult<(String, (Value, Value))> {
    let (column, bounds) = single_entry(op, payload)?;
    let bounds = bounds.as_object().ok_or_else(|| {
        ConnectorError::invalid_filter(format!("{op}: '{column}' expects {{from, to}}"))
    })?;
    if let Some(extra) = bounds.keys().find(|k| *k != "from" && *k != "to") {
        return Err(ConnectorError::invalid_filter(format!(
            "{op}: unexpected key '{extra}' in bounds of '{column}'"
        )));
    }
    let bound = |name: &str| -> ConnectorResult<Value> {
        let json = bounds.get(name).ok_or_else(|| {
            ConnectorError::invalid_filter(format!("{op}: '{column}' is missing '{name}'"))
        })?;
        scalar(op, &column, json)
    };
    let from = bound("from")?;
    let to = bound("to")?;
    Ok((column, (from, to)))
}

fn raw(payload: &serde_json::Value) -> ConnectorResult<Filter> {
    let obj = payload.as_object().ok_or_else(|| {
        ConnectorError::invalid_filter("$raw expects an object {$query, $bindings}")
    })?;
    if let Some(extra) = obj
        .keys()
        .find(|k| !matches!(k.as_str(), "$query" | "query" | "$bindings" | "bindings"))
    {
        return Err(ConnectorError::invalid_filter(format!(
            "$raw: unexpected key '{extra}'"
        )));
    }

    let query = obj
        .get("$query")
        .or_else(|| obj.get("query"))
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| ConnectorError::invalid_filter("$raw requires a string $query"))?;

    let bindings = match obj.get("$bindings").or_else(|| obj.get("bindings")) {
        None | Some(serde_json::Value::Null) => Vec::new(),
        Some(list) => scalar_list("$raw", "$bindings", list)?,
    };

    Ok(Filter::raw(query, bindings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(json: serde_json::Value) -> ConnectorResult<Filter> {
        Filter::from_json(&json)
    }

    #[test]
    fn plain_map_is_properties() {
        let filter = parse(json!({"a": 1, "b": "x"})).unwrap();
        match filter {
            Filter::Properties(map) => {
                assert_eq!(map["a"], Value::Int(1));
                assert_eq!(map["b"], Value::Text("x".into()));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn nested_operators_parse() {
        let filter = parse(json!({"$and": [{"$or": [{"a": 1}, {"a": 2}]}, {"b": 3}]})).unwrap();
        let Filter::And(children) = filter else {
            panic!("expected $and");
        };
        assert_eq!(children.len(), 2);
        assert!(matches!(&children[0], Filter::Or(v) if v.len() == 2));
    }

    #[test]
    fn two_operator_keys_rejected() {
        let err = parse(json!({"$gt": {"a": 1}, "$lt": {"a": 5}})).unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidFilter(_)));
    }

    #[test]
    fn mixed_plain_and_operator_keys_rejected() {
        let err = parse(json!({"a": 1, "$gt": {"b": 2}})).unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidFilter(_)));
    }

    #[test]
    fn unknown_operator_rejected() {
        let err = parse(json!({"$like": {"name": "a%"}})).unwrap_err();
        assert!(matches!(err, ConnectorError::UnknownOperator(op) if op == "$like"));
    }

    #[test]
    fn comparison_requires_single_column() {
        assert!(parse(json!({"$gte": {"a": 1, "b": 2}})).is_err());
        assert!(parse(json!({"$gte": {}})).is_err());
        assert!(parse(json!({"$gte": {"a": [1]}})).is_err());
        assert!(matches!(
            parse(json!({"$gte": {"age": 18}})).unwrap(),
            Filter::Gte { column, value: Value::Int(18) } if column == "age"
        ));
    }

    #[test]
    fn in_requires_single_column_and_list() {
        assert!(matches!(
            parse(json!({"$in": {"id": [1, 2]}})).unwrap(),
            Filter::In { values, .. } if values.len() == 2
        ));
        assert!(parse(json!({"$in": {"id": [1], "x": [2]}})).is_err());
        assert!(parse(json!({"$notIn": {"id": 1}})).is_err());
    }

    #[test]
    fn between_requires_both_bounds() {
        assert!(matches!(
            parse(json!({"$between": {"x": {"from": 1, "to": 10}}})).unwrap(),
            Filter::Between { from: Value::Int(1), to: Value::Int(10), .. }
        ));
        assert!(parse(json!({"$between": {"x": {"from": 1}}})).is_err());
        assert!(parse(json!({"$notBetween": {"x": {"from": 1, "to": 2, "step": 1}}})).is_err());
        assert!(parse(json!({"$between": {"x": {"from": 1, "to": 2}, "y": {"from": 1, "to": 2}}})).is_err());
    }

    #[test]
    fn null_checks_take_column_name() {
        assert!(matches!(parse(json!({"$null": "deleted_at"})).unwrap(), Filter::Null(c) if c == "deleted_at"));
        assert!(parse(json!({"$notNull": {"a": 1}})).is_err());
    }

    #[test]
    fn raw_accepts_both_spellings() {
        let filter = parse(json!({"$raw": {"$query": "a = ?", "$bindings": [1]}})).unwrap();
        assert!(matches!(filter, Filter::Raw { bindings, .. } if bindings == vec![Value::Int(1)]));
        let filter = parse(json!({"$raw": {"query": "true"}})).unwrap();
        assert!(matches!(filter, Filter::Raw { bindings, .. } if bindings.is_empty()));
        assert!(parse(json!({"$raw": {"$bindings": [1]}})).is_err());
    }

    #[test]
    fn async_not_expressible_in_json() {
        assert!(parse(json!({"$async": {"a": 1}})).is_err());
    }

    #[test]
    fn non_object_rejected() {
        assert!(parse(json!([{"a": 1}])).is_err());
        assert!(parse(json!({"$and": {"a": 1}})).is_err());
        assert!(parse(json!({"a": {"b": 1}})).is_err());
    }

    #[test]
    fn deserialize_goes_through_parser() {
        let filter: Filter = serde_json::from_value(json!({"$notNull": "email"})).unwrap();
        assert!(matches!(filter, Filter::NotNull(_)));
        assert!(serde_json::from_value::<Filter>(json!({"$nope": 1})).is_err());
    }
}
