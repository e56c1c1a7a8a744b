//! Paged reads and single-cell writes over a discovered schema.

use exn::{OptionExt, ResultExt};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

use crate::catalog::{Catalog, TableDescriptor, TableKind, load_columns, quote};
use crate::error::{ErrorKind, Result};
use crate::value::{Row, Value};

const MAX_CONNECTIONS: u32 = 4;
/// Alias of the row identity column prepended to table pages.
const ROW_ID_COLUMN: &str = "__stash_row_id__";

/// An open handle on an arbitrary SQLite file.
///
/// Cloning is cheap; clones share the pool, the discovered catalog and the
/// write lock.
#[derive(Debug, Clone)]
pub struct Inspector {
    pool: SqlitePool,
    path: PathBuf,
    catalog: Arc<RwLock<Catalog>>,
    writer: Arc<Mutex<()>>,
}

impl Inspector {
    /// Open an existing database file and discover its tables and views.
    ///
    /// Never creates a file: a missing, unreadable or corrupt file fails with
    /// [`StorageUnavailable`](ErrorKind::StorageUnavailable).
    #[instrument("opening database for inspection", skip(path), fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let unavailable = || ErrorKind::StorageUnavailable(path.clone());
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(false)
            .busy_timeout(std::time::Duration::from_millis(1500));
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .or_raise(unavailable)?;
        // Opening is lazy in SQLite; reading the catalog is what actually
        // touches the file header.
        let catalog = Catalog::load(&pool).await.or_raise(unavailable)?;
        tracing::debug!(tables = catalog.tables.len(), "Discovered schema");
        Ok(Self {
            pool,
            path,
            catalog: Arc::new(RwLock::new(catalog)),
            writer: Arc::new(Mutex::new(())),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Tables and views discovered when the file was opened (or last
    /// refreshed), ordered by name.
    pub async fn tables(&self) -> Vec<TableDescriptor> {
        self.catalog.read().await.tables.clone()
    }

    /// Re-read the schema, e.g. after tables were created by another handle.
    pub async fn refresh(&self) -> Result<Vec<TableDescriptor>> {
        let catalog = Catalog::load(&self.pool).await?;
        let tables = catalog.tables.clone();
        *self.catalog.write().await = catalog;
        Ok(tables)
    }

    async fn resolve(&self, table: &str) -> Result<TableDescriptor> {
        Ok(self.catalog.read().await.resolve(table)?.clone())
    }

    /// Read up to `limit` rows starting at `offset`.
    ///
    /// There is no `ORDER BY`: rows come back in SQLite's natural order, which
    /// is usually (not necessarily) stable for an unchanged file. Rows of
    /// tables carry a [`row_id`](Row::row_id); rows of views do not.
    #[instrument(skip(self))]
    pub async fn page(&self, table: &str, kind: TableKind, offset: u64, limit: u64) -> Result<Vec<Row>> {
        let descriptor = self.resolve(table).await?;
        if descriptor.kind != kind {
            exn::bail!(ErrorKind::Validation(format!("{table} is a {}, not a {kind}", descriptor.kind)));
        }
        let offset = i64::try_from(offset).or_raise(|| ErrorKind::InvalidValue(format!("offset {offset}")))?;
        let limit = i64::try_from(limit).or_raise(|| ErrorKind::InvalidValue(format!("limit {limit}")))?;
        let source = quote(&descriptor.name);
        let sql = match descriptor.row_id {
            Some(row_id) => format!("SELECT {row_id} AS {ROW_ID_COLUMN}, * FROM {source} LIMIT ? OFFSET ?"),
            None => format!("SELECT * FROM {source} LIMIT ? OFFSET ?"),
        };
        let rows = sqlx::query(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Storage)?;
        rows.iter()
            .map(|row| Row::from_sqlite(row, descriptor.has_row_id()).or_raise(|| ErrorKind::Storage))
            .collect()
    }

    /// Number of rows in a discovered table or view.
    pub async fn count(&self, table: &str) -> Result<u64> {
        let descriptor = self.resolve(table).await?;
        let sql = format!("SELECT COUNT(*) FROM {}", quote(&descriptor.name));
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await.or_raise(|| ErrorKind::Storage)?;
        u64::try_from(count).or_raise(|| ErrorKind::Storage)
    }

    /// Set one column of one row, located by its row identity.
    ///
    /// Returns `true` if a row was changed, `false` if no row has that
    /// identity (any more). The statement runs in its own transaction; on
    /// failure nothing is written and the handle stays usable.
    #[instrument(skip(self, value))]
    pub async fn update_cell(&self, table: &str, row_id: i64, column: &str, value: &Value) -> Result<bool> {
        let descriptor = self.resolve(table).await?;
        let Some(locator) = descriptor.row_id else {
            exn::bail!(ErrorKind::ReadOnlyTarget(descriptor.name));
        };
        let column = descriptor
            .column(column)
            .map(|c| c.name.clone())
            .ok_or_raise(|| ErrorKind::Validation(format!("{table}.{column}")))?;
        let sql = format!("UPDATE {} SET {} = ? WHERE {locator} = ?", quote(&descriptor.name), quote(&column));
        let _guard = self.writer.lock().await;
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Storage)?;
        let result = value
            .bind_to(sqlx::query(&sql))
            .bind(row_id)
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Storage)?;
        tx.commit().await.or_raise(|| ErrorKind::Storage)?;
        Ok(result.rows_affected() > 0)
    }

    /// Find a single row by primary key.
    ///
    /// The table's columns are introspected on every call (the name is bound
    /// as a parameter, so an unknown or malicious name simply yields no
    /// columns and is rejected). The first primary-key column is used, or the
    /// implicit rowid when none is declared. `id` is always bound as text and
    /// converted by the key column's affinity, so `"007"` matches a TEXT key
    /// `'007'` and the INTEGER key `7` alike.
    #[instrument(skip(self))]
    pub async fn lookup(&self, table: &str, id: &str) -> Result<Option<Row>> {
        let columns = load_columns(&self.pool, table).await?;
        if columns.is_empty() {
            exn::bail!(ErrorKind::Validation(format!("no such table: {table}")));
        }
        let key = columns
            .iter()
            .find(|c| c.primary_key == 1)
            .map(|c| quote(&c.name))
            .unwrap_or_else(|| "rowid".to_string());
        let sql = format!("SELECT * FROM {} WHERE {key} = ?", quote(table));
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| ErrorKind::Query(err.to_string()))?;
        row.map(|row| Row::from_sqlite(&row, false).or_raise(|| ErrorKind::Storage)).transpose()
    }

    /// Close the connection pool. Clones of this handle become unusable.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
