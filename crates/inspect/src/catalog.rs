//! Schema discovery.
//!
//! Everything the inspector interpolates into SQL (table and column names)
//! comes from here. Names supplied by callers are only ever used to *look up*
//! a descriptor; the descriptor's own name is what ends up in a statement.

use derive_more::Display;
use exn::ResultExt;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::{ErrorKind, Result};

/// Names SQLite accepts for the implicit row identifier. A table can shadow
/// any of them with a real column, so the first unshadowed one is used.
const ROW_ID_ALIASES: [&str; 3] = ["rowid", "_rowid_", "oid"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    #[display("table")]
    Table,
    #[display("view")]
    View,
}
impl std::str::FromStr for TableKind {
    type Err = crate::error::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "table" => Ok(Self::Table),
            "view" => Ok(Self::View),
            other => exn::bail!(ErrorKind::Validation(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Declared type, as written in the schema (may be empty).
    pub declared_type: String,
    pub not_null: bool,
    /// 1-based position within the primary key, `0` if not part of it.
    pub primary_key: u32,
}

/// A user-defined table or view, as discovered from `sqlite_master`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDescriptor {
    pub name: String,
    pub kind: TableKind,
    pub columns: Vec<ColumnInfo>,
    /// How to address the implicit row identifier, if the object has one.
    #[serde(skip)]
    pub(crate) row_id: Option<&'static str>,
}
impl TableDescriptor {
    /// Whether rows of this object carry a row identity (and can therefore be
    /// edited cell by cell).
    pub fn has_row_id(&self) -> bool {
        self.row_id.is_some()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// First column of the declared primary key, if any.
    pub fn primary_key(&self) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.primary_key == 1)
    }
}

/// The set of objects discovered in one database file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Catalog {
    pub tables: Vec<TableDescriptor>,
}
impl Catalog {
    /// Enumerate user tables and views (internal `sqlite_*` objects excluded).
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let objects: Vec<(String, String)> = sqlx::query_as(
            r#"
                SELECT name, type
                FROM sqlite_master
                WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%'
                ORDER BY name
            "#,
        )
        .fetch_all(pool)
        .await
        .or_raise(|| ErrorKind::Storage)?;
        let mut tables = Vec::with_capacity(objects.len());
        for (name, kind) in objects {
            let kind = kind.parse::<TableKind>()?;
            let columns = load_columns(pool, &name).await?;
            let row_id = match kind {
                TableKind::View => None,
                TableKind::Table if is_without_rowid(pool, &name).await? => None,
                TableKind::Table => ROW_ID_ALIASES.into_iter().find(|alias| {
                    !columns.iter().any(|column| column.name.eq_ignore_ascii_case(alias))
                }),
            };
            tables.push(TableDescriptor { name, kind, columns, row_id });
        }
        Ok(Self { tables })
    }

    pub fn get(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Look up a previously discovered object, rejecting anything else.
    pub fn resolve(&self, name: &str) -> Result<&TableDescriptor> {
        match self.get(name) {
            Some(table) => Ok(table),
            None => exn::bail!(ErrorKind::Validation(name.to_string())),
        }
    }
}

/// Columns of a table or view. The name is bound as a parameter of the
/// `pragma_table_info` table-valued function, never interpolated.
pub(crate) async fn load_columns(pool: &SqlitePool, table: &str) -> Result<Vec<ColumnInfo>> {
    let rows: Vec<(String, Option<String>, i64, i64)> =
        sqlx::query_as(r#"SELECT name, type, "notnull", pk FROM pragma_table_info(?) ORDER BY cid"#)
            .bind(table)
            .fetch_all(pool)
            .await
            .or_raise(|| ErrorKind::Storage)?;
    Ok(rows
        .into_iter()
        .map(|(name, declared_type, not_null, pk)| ColumnInfo {
            name,
            declared_type: declared_type.unwrap_or_default(),
            not_null: not_null != 0,
            primary_key: u32::try_from(pk).unwrap_or(0),
        })
        .collect())
}

/// As reported by `pragma_table_list.wr`; the `CREATE` text may mention the
/// phrase in a default or a comment.
async fn is_without_rowid(pool: &SqlitePool, table: &str) -> Result<bool> {
    let wr: Option<i64> = sqlx::query_scalar("SELECT wr FROM pragma_table_list(?) WHERE schema = 'main'")
        .bind(table)
        .fetch_optional(pool)
        .await
        .or_raise(|| ErrorKind::Storage)?;
    Ok(wr.is_some_and(|wr| wr != 0))
}

/// Quote an identifier for interpolation into a statement.
pub(crate) fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}
