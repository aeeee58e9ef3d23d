//! Expression layer for WHERE clauses.
//!
//! [`Expr`] is the predicate tree the filter compiler emits: AND/OR/NOT grouping,
//! comparisons, membership, null checks, ranges and raw fragments. Rendering emits
//! `?` markers and pushes the matching values, in text order, into a [`ParamList`].

use crate::ident::Ident;
use crate::qb::param::ParamList;
use crate::value::Value;

/// Comparison operator for [`Expr::Compare`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }
}

/// Expression node for building WHERE clauses.
#[derive(Clone, Debug)]
pub enum Expr {
    /// AND group: all conditions must be true.
    And(Vec<Expr>),

    /// OR group: at least one condition must be true.
    Or(Vec<Expr>),

    /// NOT: negate the inner expression.
    Not(Box<Expr>),

    /// Simple comparison: column op ?
    Compare {
        column: Ident,
        op: CompareOp,
        value: Value,
    },

    /// NULL check: column IS NULL or column IS NOT NULL
    NullCheck { column: Ident, is_null: bool },

    /// IN list: column IN (?, ?, ...) or column NOT IN (...)
    InList {
        column: Ident,
        values: Vec<Value>,
        negated: bool,
    },

    /// BETWEEN: column BETWEEN ? AND ?
    Between {
        column: Ident,
        from: Value,
        to: Value,
        negated: bool,
    },

    /// Caller-supplied SQL fragment, inserted verbatim with its own bindings.
    ///
    /// The fragment is not inspected: its `?` markers must line up with `bindings`
    /// or the statement is refused at bind time.
    Raw { sql: String, bindings: Vec<Value> },

    /// Always true (used for empty NOT IN lists).
    True,

    /// Always false (used for empty IN lists).
    False,
}

impl Expr {
    /// Create an AND expression from a list of expressions.
    pub fn and(exprs: Vec<Expr>) -> Self {
        Expr::And(exprs)
    }

    /// Create an OR expression from a list of expressions.
    pub fn or(exprs: Vec<Expr>) -> Self {
        Expr::Or(exprs)
    }

    /// Create a NOT expression.
    pub fn not(expr: Expr) -> Self {
        Expr::Not(Box::new(expr))
    }

    /// Create a comparison: column op value
    pub fn compare(column: Ident, op: CompareOp, value: impl Into<Value>) -> Self {
        Expr::Compare {
            column,
            op,
            value: value.into(),
        }
    }

    /// Create an equality condition. A NULL value becomes `IS NULL`.
    pub fn eq(column: Ident, value: impl Into<Value>) -> Self {
        match value.into() {
            Value::Null => Expr::is_null(column),
            value => Expr::Compare {
                column,
                op: CompareOp::Eq,
                value,
            },
        }
    }

    /// Create an IS NULL condition: column IS NULL
    pub fn is_null(column: Ident) -> Self {
        Expr::NullCheck {
            column,
            is_null: true,
        }
    }

    /// Create an IS NOT NULL condition: column IS NOT NULL
    pub fn is_not_null(column: Ident) -> Self {
        Expr::NullCheck {
            column,
            is_null: false,
        }
    }

    /// Create an IN condition: column IN (values...)
    pub fn in_list(column: Ident, values: Vec<Value>) -> Self {
        if values.is_empty() {
            return Expr::False;
        }
        Expr::InList {
            column,
            values,
            negated: false,
        }
    }

    /// Create a NOT IN condition: column NOT IN (values...)
    pub fn not_in(column: Ident, values: Vec<Value>) -> Self {
        if values.is_empty() {
            return Expr::True;
        }
        Expr::InList {
            column,
            values,
            negated: true,
        }
    }

    /// Create a BETWEEN condition: column BETWEEN from AND to
    pub fn between(column: Ident, from: Value, to: Value) -> Self {
        Expr::Between {
            column,
            from,
            to,
            negated: false,
        }
    }

    /// Create a NOT BETWEEN condition: column NOT BETWEEN from AND to
    pub fn not_between(column: Ident, from: Value, to: Value) -> Self {
        Expr::Between {
            column,
            from,
            to,
            negated: true,
        }
    }

    /// Create a raw SQL fragment with bindings.
    pub fn raw(sql: impl Into<String>, bindings: Vec<Value>) -> Self {
        Expr::Raw {
            sql: sql.into(),
            bindings,
        }
    }

    /// Check if this expression is empty (contains no conditions).
    pub fn is_empty(&self) -> bool {
        match self {
            Expr::And(exprs) | Expr::Or(exprs) => exprs.iter().all(Expr::is_empty),
            Expr::Not(inner) => inner.is_empty(),
            _ => false,
        }
    }

    /// Render the SQL fragment with `?` markers, collecting values into `params`.
    pub fn build(&self, params: &mut ParamList) -> String {
        match self {
            Expr::And(exprs) => Self::build_joined(exprs, " AND ", params),
            Expr::Or(exprs) => Self::build_joined(exprs, " OR ", params),
            Expr::Not(inner) => {
                let sql = inner.build(params);
                if sql.is_empty() {
                    String::new()
                } else {
                    format!("NOT ({sql})")
                }
            }
            Expr::Compare { column, op, value } => {
                let marker = params.push(value.clone());
                format!("{} {} {marker}", column.to_sql(), op.as_sql())
            }
            Expr::NullCheck { column, is_null } => {
                if *is_null {
                    format!("{} IS NULL", column.to_sql())
                } else {
                    format!("{} IS NOT NULL", column.to_sql())
                }
            }
            Expr::InList {
                column,
                values,
                negated,
            } => {
                if values.is_empty() {
                    return if *negated { "1=1" } else { "1=0" }.to_string();
                }
                let markers: Vec<&str> = values.iter().map(|v| params.push(v.clone())).collect();
                let op = if *negated { "NOT IN" } else { "IN" };
                format!("{} {op} ({})", column.to_sql(), markers.join(", "))
            }
            Expr::Between {
                column,
                from,
                to,
                negated,
            } => {
                let from_marker = params.push(from.clone());
                let to_marker = params.push(to.clone());
                let op = if *negated { "NOT BETWEEN" } else { "BETWEEN" };
                format!("{} {op} {from_marker} AND {to_marker}", column.to_sql())
            }
            Expr::Raw { sql, bindings } => {
                params.extend_values(bindings.iter().cloned());
                sql.clone()
            }
            Expr::True => "1=1".to_string(),
            Expr::False => "1=0".to_string(),
        }
    }

    /// Join non-empty children, parenthesizing any child that is itself a group or a
    /// raw fragment so operator precedence never leaks across levels.
    fn build_joined(exprs: &[Expr], sep: &str, params: &mut ParamList) -> String {
        let live: Vec<&Expr> = exprs.iter().filter(|e| !e.is_empty()).collect();
        let single = live.len() == 1;
        let parts: Vec<String> = live
            .into_iter()
            .map(|e| {
                let sql = e.build(params);
                let needs_parens = !single
                    && match e {
                        Expr::And(children) | Expr::Or(children) => {
                            children.iter().filter(|c| !c.is_empty()).count() > 1
                        }
                        Expr::Raw { .. } => true,
                        _ => false,
                    };
                if needs_parens { format!("({sql})") } else { sql }
            })
            .filter(|s| !s.is_empty())
            .collect();
        parts.join(sep)
    }
}

/// An AND-accumulating WHERE clause: the predicate handle threaded through the
/// filter compiler.
#[derive(Clone, Debug, Default)]
pub struct ExprGroup {
    exprs: Vec<Expr>,
}

impl ExprGroup {
    /// Create a new empty expression group.
    pub fn new() -> Self {
        Self { exprs: Vec::new() }
    }

    /// Check if the group has no conditions.
    pub fn is_empty(&self) -> bool {
        self.exprs.iter().all(Expr::is_empty)
    }

    /// Add an expression to be ANDed, returning the handle.
    pub fn and_expr(mut self, expr: Expr) -> Self {
        if !expr.is_empty() {
            self.exprs.push(expr);
        }
        self
    }

    /// Get all expressions.
    pub fn exprs(&self) -> &[Expr] {
        &self.exprs
    }

    /// Collapse the group into one expression, or `None` when it holds nothing.
    pub fn into_expr(mut self) -> Option<Expr> {
        match self.exprs.len() {
            0 => None,
            1 => self.exprs.pop(),
            _ => Some(Expr::And(self.exprs)),
        }
    }

    /// Render the WHERE clause content (without the "WHERE" keyword).
    pub fn build(&self, params: &mut ParamList) -> String {
        if self.exprs.is_empty() {
            return String::new();
        }
        Expr::build_joined(&self.exprs, " AND ", params)
    }
}
