//! PostgreSQL executor over `tokio-postgres`.

use crate::bind::ParameterSet;
use crate::error::{ConnectorError, ConnectorResult};
use crate::executor::SqlExecutor;
use crate::value::{Record, Value};
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use std::error::Error;
use std::str::FromStr;
use tokio_postgres::types::{FromSql, IsNull, Kind, ToSql, Type};
use tokio_postgres::{Client, Column, Row};

/// [`SqlExecutor`] over a single `tokio_postgres::Client`.
///
/// The client's connection task must be driven by the caller, as usual for
/// `tokio_postgres::connect`.
pub struct PgExecutor {
    client: Client,
}

impl PgExecutor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn into_inner(self) -> Client {
        self.client
    }
}

impl From<Client> for PgExecutor {
    fn from(client: Client) -> Self {
        Self::new(client)
    }
}

impl SqlExecutor for PgExecutor {
    async fn execute(&self, sql: &str, params: &ParameterSet) -> ConnectorResult<Vec<Record>> {
        query_records(&self.client, sql, params).await
    }
}

/// Run a named-parameter statement on `client` and decode every row.
pub(crate) async fn query_records(
    client: &Client,
    sql: &str,
    params: &ParameterSet,
) -> ConnectorResult<Vec<Record>> {
    let sql = to_positional(sql, params);
    let values: Vec<&(dyn ToSql + Sync)> = params
        .values()
        .map(|v| v as &(dyn ToSql + Sync))
        .collect();
    let rows = client.query(sql.as_str(), &values).await?;
    rows.iter().map(decode_row).collect()
}

// ==================== Placeholders ====================

/// Rewrite `:name` placeholders to `$k`, where k is the name's position in `params`
/// plus one.
///
/// `::` casts, quoted literals and identifiers, and names missing from `params` are
/// copied unchanged.
pub fn to_positional(sql: &str, params: &ParameterSet) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '\'' | '"' => {
                out.push(c);
                for (_, inner) in chars.by_ref() {
                    out.push(inner);
                    if inner == c {
                        break;
                    }
                }
            }
            ':' if matches!(chars.peek(), Some((_, ':'))) => {
                out.push_str("::");
                chars.next();
            }
            ':' => {
                let start = i + 1;
                let mut end = start;
                while let Some(&(j, n)) = chars.peek() {
                    if n.is_ascii_alphanumeric() || n == '_' {
                        end = j + n.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let name = &sql[start..end];
                match params.position(name) {
                    Some(pos) if !name.is_empty() => out.push_str(&format!("${}", pos + 1)),
                    _ => {
                        out.push(':');
                        out.push_str(name);
                    }
                }
            }
            _ => out.push(c),
        }
    }
    out
}

// ==================== Encoding ====================

type BoxError = Box<dyn Error + Sync + Send>;

fn mismatch(value: &Value, ty: &Type) -> BoxError {
    format!("cannot encode {value:?} as {ty}").into()
}

impl Value {
    fn to_integer(&self, ty: &Type) -> Result<i64, BoxError> {
        match self {
            Value::Bool(b) => Ok(i64::from(*b)),
            other => other.as_i64().ok_or_else(|| mismatch(other, ty)),
        }
    }

    fn to_f64(&self, ty: &Type) -> Result<f64, BoxError> {
        match self {
            Value::Int(n) => Ok(*n as f64),
            Value::Float(f) => Ok(*f),
            Value::Text(s) => s.trim().parse().map_err(|_| mismatch(self, ty)),
            other => Err(mismatch(other, ty)),
        }
    }

    fn to_decimal(&self, ty: &Type) -> Result<Decimal, BoxError> {
        match self {
            Value::Int(n) => Ok(Decimal::from(*n)),
            Value::Float(f) => Decimal::try_from(*f).map_err(|_| mismatch(self, ty)),
            Value::Text(s) => {
                let s = s.trim();
                Decimal::from_str(s)
                    .or_else(|_| Decimal::from_scientific(s))
                    .map_err(|_| mismatch(self, ty))
            }
            other => Err(mismatch(other, ty)),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Text(s) => serde_json::from_str(s).unwrap_or_else(|_| s.clone().into()),
            other => serde_json::to_value(other).unwrap_or(serde_json::Value::Null),
        }
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.naive_utc())
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok())
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Encodes by the parameter type the server inferred for the placeholder.
impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        if self.is_null() {
            return Ok(IsNull::Yes);
        }

        match *ty {
            Type::BOOL => match self {
                Value::Bool(b) => b.to_sql(ty, out),
                Value::Int(n @ (0 | 1)) => (*n == 1).to_sql(ty, out),
                Value::Text(s) => match s.to_ascii_lowercase().as_str() {
                    "true" | "t" => true.to_sql(ty, out),
                    "false" | "f" => false.to_sql(ty, out),
                    _ => Err(mismatch(self, ty)),
                },
                _ => Err(mismatch(self, ty)),
            },
            Type::INT2 => i16::try_from(self.to_integer(ty)?)
                .map_err(|_| mismatch(self, ty))?
                .to_sql(ty, out),
            Type::INT4 => i32::try_from(self.to_integer(ty)?)
                .map_err(|_| mismatch(self, ty))?
                .to_sql(ty, out),
            Type::INT8 => self.to_integer(ty)?.to_sql(ty, out),
            Type::FLOAT4 => (self.to_f64(ty)? as f32).to_sql(ty, out),
            Type::FLOAT8 => self.to_f64(ty)?.to_sql(ty, out),
            Type::NUMERIC => self.to_decimal(ty)?.to_sql(ty, out),
            Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
                match self {
                    Value::Text(s) => s.as_str().to_sql(ty, out),
                    Value::Bytes(_) => Err(mismatch(self, ty)),
                    other => other.to_string().as_str().to_sql(ty, out),
                }
            }
            Type::BYTEA => match self {
                Value::Bytes(b) => b.as_slice().to_sql(ty, out),
                Value::Text(s) => s.as_bytes().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Type::JSON | Type::JSONB => self.to_json().to_sql(ty, out),
            Type::UUID => {
                let id = match self {
                    Value::Text(s) => uuid::Uuid::parse_str(s.trim())?,
                    Value::Bytes(b) => uuid::Uuid::from_slice(b)?,
                    _ => return Err(mismatch(self, ty)),
                };
                id.to_sql(ty, out)
            }
            Type::TIMESTAMP => match self {
                Value::Text(s) => parse_timestamp(s.trim())
                    .ok_or_else(|| mismatch(self, ty))?
                    .to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Type::TIMESTAMPTZ => match self {
                Value::Text(s) => parse_timestamp(s.trim())
                    .ok_or_else(|| mismatch(self, ty))?
                    .and_utc()
                    .to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Type::DATE => match self {
                Value::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                    .map_err(|_| mismatch(self, ty))?
                    .to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            _ => match (ty.kind(), self) {
                // enum values travel as their label
                (Kind::Enum(labels), Value::Text(label)) => {
                    if !labels.iter().any(|l| l == label) {
                        return Err(format!("'{label}' is not a label of enum {ty}").into());
                    }
                    out.extend_from_slice(label.as_bytes());
                    Ok(IsNull::No)
                }
                (Kind::Enum(_), _) => Err(mismatch(self, ty)),
                _ => Err(format!("unsupported parameter type {ty}").into()),
            },
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

// ==================== Decoding ====================

/// Wire bytes of a column whose type has no dedicated mapping.
struct RawBytes(Vec<u8>);

impl<'a> FromSql<'a> for RawBytes {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        Ok(RawBytes(raw.to_vec()))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

fn decode_row(row: &Row) -> ConnectorResult<Record> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| Ok((column.name().to_string(), decode_column(row, idx, column)?)))
        .collect()
}

fn decode_column(row: &Row, idx: usize, column: &Column) -> ConnectorResult<Value> {
    macro_rules! get {
        ($t:ty) => {
            row.try_get::<_, Option<$t>>(idx)
                .map_err(|e| ConnectorError::decode(column.name(), e.to_string()))?
        };
    }

    let value = match *column.type_() {
        Type::BOOL => get!(bool).map(Value::Bool),
        Type::INT2 => get!(i16).map(Value::from),
        Type::INT4 => get!(i32).map(Value::from),
        Type::INT8 => get!(i64).map(Value::Int),
        Type::OID => get!(u32).map(Value::from),
        Type::FLOAT4 => get!(f32).map(Value::from),
        Type::FLOAT8 => get!(f64).map(Value::Float),
        Type::NUMERIC => get!(Decimal).map(|d| Value::Text(d.to_string())),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            get!(String).map(Value::Text)
        }
        Type::BYTEA => get!(Vec<u8>).map(Value::Bytes),
        Type::JSON | Type::JSONB => get!(serde_json::Value).map(|j| Value::Text(j.to_string())),
        Type::UUID => get!(uuid::Uuid).map(|id| Value::Text(id.to_string())),
        Type::TIMESTAMP => {
            get!(NaiveDateTime).map(|ts| Value::Text(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
        }
        Type::TIMESTAMPTZ => get!(DateTime<Utc>)
            .map(|ts| Value::Text(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))),
        Type::DATE => get!(NaiveDate).map(|d| Value::Text(d.to_string())),
        _ => match column.type_().kind() {
            Kind::Enum(_) => get!(RawBytes)
                .map(|raw| String::from_utf8(raw.0))
                .transpose()
                .map_err(|e| ConnectorError::decode(column.name(), e.to_string()))?
                .map(Value::Text),
            _ => get!(RawBytes).map(|raw| Value::Bytes(raw.0)),
        },
    };
    Ok(value.unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(n: usize) -> ParameterSet {
        let mut set = ParameterSet::new();
        for i in 0..n {
            set.push(Value::Int(i as i64));
        }
        set
    }

    #[test]
    fn named_to_positional() {
        assert_eq!(
            to_positional(r#"SELECT * FROM "t" WHERE "a" = :param0 AND "b" IN (:param1, :param2)"#, &params(3)),
            r#"SELECT * FROM "t" WHERE "a" = $1 AND "b" IN ($2, $3)"#
        );
    }

    #[test]
    fn casts_and_literals_untouched() {
        assert_eq!(
            to_positional("SELECT :param0::int, ':param0', \"x:param0\"", &params(1)),
            "SELECT $1::int, ':param0', \"x:param0\""
        );
    }

    #[test]
    fn unknown_names_untouched() {
        assert_eq!(to_positional("a = :other AND b = :", &params(1)), "a = :other AND b = :");
        assert_eq!(to_positional("a = :param10", &params(2)), "a = :param10");
    }

    #[test]
    fn encode_by_inferred_type() {
        let mut buf = BytesMut::new();
        assert!(matches!(Value::Int(7).to_sql(&Type::INT4, &mut buf), Ok(IsNull::No)));
        assert_eq!(&buf[..], &7i32.to_be_bytes());

        let mut buf = BytesMut::new();
        assert!(Value::Int(i64::from(i16::MAX) + 1).to_sql(&Type::INT2, &mut buf).is_err());
        assert!(Value::Text("abc".into()).to_sql(&Type::INT8, &mut buf).is_err());
        assert!(matches!(Value::Null.to_sql(&Type::INT8, &mut buf), Ok(IsNull::Yes)));
    }

    #[test]
    fn encode_text_like_types() {
        let mut buf = BytesMut::new();
        Value::Int(42).to_sql(&Type::TEXT, &mut buf).unwrap();
        assert_eq!(&buf[..], b"42");

        let mut buf = BytesMut::new();
        Value::Text("2024-01-02".into()).to_sql(&Type::DATE, &mut buf).unwrap();
        assert_eq!(buf.len(), 4);

        let mut buf = BytesMut::new();
        Value::Text("2024-01-02T03:04:05Z".into())
            .to_sql(&Type::TIMESTAMPTZ, &mut buf)
            .unwrap();
        assert_eq!(buf.len(), 8);

        let mut buf = BytesMut::new();
        Value::Text("67e55044-10b1-426f-9247-bb680e5fe0c8".into())
            .to_sql(&Type::UUID, &mut buf)
            .unwrap();
        assert_eq!(buf.len(), 16);
    }

    fn numeric_roundtrip(value: Value) -> Decimal {
        let mut buf = BytesMut::new();
        assert!(matches!(value.to_sql(&Type::NUMERIC, &mut buf), Ok(IsNull::No)));
        Decimal::from_sql(&Type::NUMERIC, &buf).unwrap()
    }

    #[test]
    fn encode_numeric() {
        assert_eq!(numeric_roundtrip(Value::Int(10)), Decimal::from(10));
        assert_eq!(numeric_roundtrip(Value::Float(1.5)), Decimal::new(15, 1));
        assert_eq!(numeric_roundtrip(Value::Text(" 12.340 ".into())), Decimal::new(12340, 3));
        assert_eq!(numeric_roundtrip(Value::Text("1e3".into())), Decimal::from(1000));

        let mut buf = BytesMut::new();
        assert!(Value::Text("abc".into()).to_sql(&Type::NUMERIC, &mut buf).is_err());
        assert!(Value::Bool(true).to_sql(&Type::NUMERIC, &mut buf).is_err());
        assert!(Value::Float(f64::NAN).to_sql(&Type::NUMERIC, &mut buf).is_err());
    }

    #[test]
    fn encode_enum_label() {
        let mood = Type::new(
            "mood".to_string(),
            90_001,
            Kind::Enum(vec!["happy".to_string(), "sad".to_string()]),
            "public".to_string(),
        );

        let mut buf = BytesMut::new();
        assert!(matches!(Value::Text("sad".into()).to_sql(&mood, &mut buf), Ok(IsNull::No)));
        assert_eq!(&buf[..], b"sad");

        let mut buf = BytesMut::new();
        assert!(Value::Text("angry".into()).to_sql(&mood, &mut buf).is_err());
        assert!(Value::Int(1).to_sql(&mood, &mut buf).is_err());
        assert!(matches!(Value::Null.to_sql(&mood, &mut buf), Ok(IsNull::Yes)));
    }

    #[test]
    fn json_text_is_parsed() {
        assert_eq!(Value::Text(r#"{"a":1}"#.into()).to_json(), serde_json::json!({"a": 1}));
        assert_eq!(Value::Text("plain".into()).to_json(), serde_json::json!("plain"));
        assert_eq!(Value::Int(3).to_json(), serde_json::json!(3));
    }
}
