//! Scalar values and rows of an a-priori unknown schema.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use derive_more::Display;
use exn::ResultExt;
use serde::ser::{Serialize, SerializeMap, Serializer};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

use crate::error::{ErrorKind, Result};

/// Key under which the row identity is emitted when a row is serialized,
/// unless the row has a real column of that name.
pub const ROW_ID_KEY: &str = "_rowid_";

/// One SQLite value, by storage class.
///
/// Serializes to the matching JSON scalar; BLOBs are emitted as standard
/// base64 strings.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

/// Storage class requested when converting user input into a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ValueKind {
    #[display("null")]
    Null,
    #[display("integer")]
    Integer,
    #[display("real")]
    Real,
    #[display("text")]
    Text,
    /// Base64-encoded input.
    #[display("blob")]
    Blob,
}

impl Value {
    /// Convert textual input (e.g. from a command line or an edit box).
    pub fn parse(kind: ValueKind, input: &str) -> Result<Self> {
        let invalid = || ErrorKind::InvalidValue(format!("{input:?} is not a valid {kind}"));
        Ok(match kind {
            ValueKind::Null => Self::Null,
            ValueKind::Integer => Self::Integer(input.trim().parse::<i64>().or_raise(invalid)?),
            ValueKind::Real => Self::Real(input.trim().parse::<f64>().or_raise(invalid)?),
            ValueKind::Text => Self::Text(input.to_string()),
            ValueKind::Blob => Self::Blob(BASE64.decode(input.trim()).or_raise(invalid)?),
        })
    }

    /// Decode column `index` of `row` according to the value's runtime
    /// storage class (SQLite columns are not bound to a single type).
    pub(crate) fn decode(row: &SqliteRow, index: usize) -> sqlx::Result<Self> {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(Self::Null);
        }
        let class = raw.type_info().name().to_string();
        Ok(match class.as_str() {
            "INTEGER" | "BOOLEAN" => Self::Integer(row.try_get_unchecked(index)?),
            "REAL" => Self::Real(row.try_get_unchecked(index)?),
            "BLOB" => Self::Blob(row.try_get_unchecked(index)?),
            _ => Self::Text(row.try_get_unchecked(index)?),
        })
    }

    /// Bind this value as the next positional parameter of `query`.
    pub(crate) fn bind_to<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        match self {
            Self::Null => query.bind(None::<i64>),
            Self::Integer(v) => query.bind(*v),
            Self::Real(v) => query.bind(*v),
            Self::Text(v) => query.bind(v.as_str()),
            Self::Blob(v) => query.bind(v.as_slice()),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
            Self::Blob(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Integer(v) => serializer.serialize_i64(*v),
            Self::Real(v) => serializer.serialize_f64(*v),
            Self::Text(v) => serializer.serialize_str(v),
            Self::Blob(v) => serializer.serialize_str(&BASE64.encode(v)),
        }
    }
}

/// A row of an arbitrary table or view, columns in schema order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    /// Opaque locator for [`Inspector::update_cell`](crate::Inspector::update_cell).
    /// Only present for rows read from tables that have a rowid.
    pub row_id: Option<i64>,
    pub values: Vec<(String, Value)>,
}
impl Row {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.iter().find(|(name, _)| name == column).map(|(_, value)| value)
    }

    /// Build a row from a result set. With `row_id` set, the first column holds
    /// the row identity rather than data.
    pub(crate) fn from_sqlite(row: &SqliteRow, row_id: bool) -> sqlx::Result<Self> {
        let start = usize::from(row_id);
        let row_id = match row_id {
            true => Some(row.try_get::<i64, _>(0)?),
            false => None,
        };
        let values = row
            .columns()
            .iter()
            .skip(start)
            .map(|column| Ok((column.name().to_string(), Value::decode(row, column.ordinal())?)))
            .collect::<sqlx::Result<Vec<_>>>()?;
        Ok(Self { row_id, values })
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        // A real column named `_rowid_` takes the key.
        let row_id = self.row_id.filter(|_| self.get(ROW_ID_KEY).is_none());
        let len = self.values.len() + usize::from(row_id.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        if let Some(row_id) = row_id {
            map.serialize_entry(ROW_ID_KEY, &row_id)?;
        }
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use sqlx::sqlite::SqlitePoolOptions;

    #[rstest]
    #[case(ValueKind::Integer, " 42 ", Value::Integer(42))]
    #[case(ValueKind::Real, "1.5", Value::Real(1.5))]
    #[case(ValueKind::Text, " keep spaces ", Value::Text(" keep spaces ".to_string()))]
    #[case(ValueKind::Blob, "aHVubnk=", Value::Blob(b"hunny".to_vec()))]
    #[case(ValueKind::Null, "ignored", Value::Null)]
    fn test_parse(#[case] kind: ValueKind, #[case] input: &str, #[case] expected: Value) {
        assert_eq!(Value::parse(kind, input).unwrap(), expected);
    }

    #[rstest]
    #[case(ValueKind::Integer, "forty-two")]
    #[case(ValueKind::Real, "")]
    #[case(ValueKind::Blob, "not base64!")]
    fn test_parse_invalid(#[case] kind: ValueKind, #[case] input: &str) {
        let err = Value::parse(kind, input).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidValue(_)));
    }

    #[test]
    fn test_serialize_row() {
        let row = Row {
            row_id: Some(3),
            values: vec![
                ("name".to_string(), Value::Text("Pooh".to_string())),
                ("weight".to_string(), Value::Real(9.5)),
                ("honey".to_string(), Value::Null),
                ("data".to_string(), Value::Blob(vec![0, 1, 2])),
                ("id".to_string(), Value::Integer(1)),
            ],
        };
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"_rowid_":3,"name":"Pooh","weight":9.5,"honey":null,"data":"AAEC","id":1}"#);
    }

    #[tokio::test]
    async fn test_serialize_row_with_rowid_column() {
        let pool = SqlitePoolOptions::new().max_connections(1).connect("sqlite::memory:").await.unwrap();
        sqlx::raw_sql(r#"CREATE TABLE t ("_rowid_" TEXT, v INTEGER); INSERT INTO t VALUES ('mine', 7);"#)
            .execute(&pool)
            .await
            .unwrap();
        let row = sqlx::query(r#"SELECT rowid, "_rowid_", v FROM t"#).fetch_one(&pool).await.unwrap();
        let row = Row::from_sqlite(&row, true).unwrap();
        assert_eq!(row.row_id, Some(1));

        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"_rowid_":"mine","v":7}"#);
        assert_eq!(json.matches(ROW_ID_KEY).count(), 1);
    }

    #[tokio::test]
    async fn test_decode_mixed_storage_classes() {
        let pool = SqlitePoolOptions::new().max_connections(1).connect("sqlite::memory:").await.unwrap();
        // Untyped column: every row may hold a different storage class.
        sqlx::raw_sql("CREATE TABLE t (v); INSERT INTO t VALUES (1), (2.5), ('three'), (x'04'), (NULL);")
            .execute(&pool)
            .await
            .unwrap();
        let rows = sqlx::query("SELECT rowid, v FROM t ORDER BY rowid").fetch_all(&pool).await.unwrap();
        let values = rows
            .iter()
            .map(|row| Row::from_sqlite(row, true).unwrap())
            .map(|row| row.get("v").cloned().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(
            values,
            vec![
                Value::Integer(1),
                Value::Real(2.5),
                Value::Text("three".to_string()),
                Value::Blob(vec![4]),
                Value::Null
            ]
        );
    }
}
