//! SELECT and COUNT over a [`TableQuery`].

use crate::error::ConnectorResult;
use crate::ident::Ident;
use crate::qb::param::ParamList;
use crate::qb::table::TableQuery;
use crate::qb::traits::{SqlQb, Statement};
use serde::de::{self, Deserializer};
use serde::Deserialize;

/// Sort direction of an ORDER BY entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Accepts `"asc"` / `"desc"` in any case, or `1` / `-1`.
impl<'de> Deserialize<'de> for SortDirection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) if s.eq_ignore_ascii_case("asc") => Ok(Self::Asc),
            serde_json::Value::String(s) if s.eq_ignore_ascii_case("desc") => Ok(Self::Desc),
            serde_json::Value::Number(n) if n.as_i64() == Some(1) => Ok(Self::Asc),
            serde_json::Value::Number(n) if n.as_i64() == Some(-1) => Ok(Self::Desc),
            other => Err(de::Error::custom(format!(
                "invalid sort direction {other}, expected \"asc\", \"desc\", 1 or -1"
            ))),
        }
    }
}

/// SELECT query builder over a filtered, paginated row-set.
#[derive(Clone, Debug)]
pub struct SelectQb {
    base: TableQuery,
    /// Projected columns; empty means `*`.
    columns: Vec<Ident>,
    order: Vec<(Ident, SortDirection)>,
}

impl SelectQb {
    /// Create a `SELECT *` builder.
    pub fn new(base: TableQuery) -> Self {
        Self {
            base,
            columns: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Project the given columns (empty keeps `*`).
    pub fn columns(mut self, columns: &[&str]) -> ConnectorResult<Self> {
        self.columns = columns
            .iter()
            .map(|c| Ident::parse(c))
            .collect::<ConnectorResult<_>>()?;
        Ok(self)
    }

    /// Append an ORDER BY entry; earlier entries take precedence.
    pub fn order_by(mut self, column: &str, direction: SortDirection) -> ConnectorResult<Self> {
        self.order.push((Ident::parse(column)?, direction));
        Ok(self)
    }

    /// Render `SELECT COUNT(*)` over the same row-set, ignoring ORDER BY.
    ///
    /// With pagination the count is taken over a paginated sub-select, so LIMIT and
    /// OFFSET bound the counted rows rather than the single result row.
    pub fn count_statement(&self) -> Statement {
        let mut params = ParamList::new();
        let table = self.base.table().to_sql();
        let mut sql = String::from(r#"SELECT COUNT(*) AS "count" FROM "#);
        if self.base.is_paginated() {
            sql.push_str("(SELECT * FROM ");
            sql.push_str(&table);
            self.base.write_where(&mut sql, &mut params);
            self.base.write_pagination(&mut sql);
            sql.push_str(r#") AS "t""#);
        } else {
            sql.push_str(&table);
            self.base.write_where(&mut sql, &mut params);
        }
        Statement::new(sql, params)
    }

    /// Get the COUNT SQL string (for debugging).
    pub fn to_count_sql(&self) -> String {
        self.count_statement().sql
    }
}

impl SqlQb for SelectQb {
    fn build_statement(&self) -> Statement {
        let mut params = ParamList::new();

        let select_part = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns
                .iter()
                .map(Ident::to_sql)
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut sql = format!("SELECT {} FROM {}", select_part, self.base.table().to_sql());
        self.base.write_where(&mut sql, &mut params);

        if !self.order.is_empty() {
            let clauses: Vec<String> = self
                .order
                .iter()
                .map(|(col, dir)| format!("{} {}", col.to_sql(), dir.as_sql()))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&clauses.join(", "));
        }

        self.base.write_pagination(&mut sql);
        Statement::new(sql, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qb::expr::{CompareOp, Expr};

    fn users() -> TableQuery {
        TableQuery::new("users").unwrap()
    }

    #[test]
    fn test_simple_select() {
        assert_eq!(users().select_all().to_sql(), r#"SELECT * FROM "users""#);
    }

    #[test]
    fn test_select_with_columns() {
        let qb = users().select(&["id", "name"]).unwrap();
        assert_eq!(qb.to_sql(), r#"SELECT "id", "name" FROM "users""#);
    }

    #[test]
    fn test_select_rejects_bad_column() {
        assert!(users().select(&["id, password"]).is_err());
    }

    #[test]
    fn test_order_limit_offset() {
        let qb = users()
            .and_where(Expr::compare(Ident::parse("age").unwrap(), CompareOp::Gt, 18))
            .limit(10)
            .offset(20)
            .select_all()
            .order_by("age", SortDirection::Desc)
            .unwrap()
            .order_by("id", SortDirection::Asc)
            .unwrap();
        assert_eq!(
            qb.to_sql(),
            r#"SELECT * FROM "users" WHERE "age" > ? ORDER BY "age" DESC, "id" ASC LIMIT 10 OFFSET 20"#
        );
    }

    #[test]
    fn test_count_sql() {
        let qb = users()
            .and_where(Expr::eq(Ident::parse("status").unwrap(), "active"))
            .select_all();
        assert_eq!(
            qb.to_count_sql(),
            r#"SELECT COUNT(*) AS "count" FROM "users" WHERE "status" = ?"#
        );
    }

    #[test]
    fn test_count_paginated_uses_subquery() {
        let qb = users().limit(5).offset(10).select_all();
        assert_eq!(
            qb.to_count_sql(),
            r#"SELECT COUNT(*) AS "count" FROM (SELECT * FROM "users" LIMIT 5 OFFSET 10) AS "t""#
        );
    }

    #[test]
    fn test_sort_direction_from_json() {
        let dirs: Vec<SortDirection> =
            serde_json::from_str(r#"["asc", "DESC", 1, -1]"#).unwrap();
        assert_eq!(
            dirs,
            vec![
                SortDirection::Asc,
                SortDirection::Desc,
                SortDirection::Asc,
                SortDirection::Desc
            ]
        );
        assert!(serde_json::from_str::<SortDirection>(r#""up""#).is_err());
    }
}
