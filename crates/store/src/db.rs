//! Database connection and pool management.

use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

/// Fixed schema, applied on every connect. Create-if-absent only: existing
/// tables (and their rows) are never touched.
const SCHEMA: &str = include_str!("../schema/files.sql");
// Readers (list, preview) can overlap; writes are serialized by `writer`.
const MAX_CONNECTIONS: u32 = 5;

/// Database connection pool for the blob store.
///
/// This is the main entry point for interacting with a store file. It manages
/// the SQLite connection pool and hands out [`Repository`](crate::Repository)
/// instances that share a single write lock.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    path: PathBuf,
    writer: Arc<Mutex<()>>,
}

impl Database {
    async fn new(options: SqliteConnectOptions, path: PathBuf, max: Option<u32>) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            // Apply the query-based PRAGMAs to EVERY connection in the pool,
            // not only the first one.
            .after_connect(|conn, meta| Box::pin(async move { Self::apply_pragmas(conn, meta).await }))
            .max_connections(max.unwrap_or(MAX_CONNECTIONS))
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::StorageUnavailable(path.clone()))?;
        let db = Self { pool, path, writer: Arc::new(Mutex::new(())) };
        db.bootstrap().await?;
        Ok(db)
    }

    /// Open an existing store file.
    ///
    /// Ensures the `files` table exists. Fails with
    /// [`StorageUnavailable`](ErrorKind::StorageUnavailable) if the file is
    /// missing, locked, unreadable or not a SQLite database.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let options = Self::base_options().filename(path).create_if_missing(false);
        Self::new(options, path.to_path_buf(), None).await
    }

    /// Create a store file, or open it if it already exists.
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let options = Self::base_options().filename(path).create_if_missing(true);
        Self::new(options, path.to_path_buf(), None).await
    }

    /// A throwaway store that lives as long as its single connection.
    ///
    /// Deliberately not behind `#[cfg(test)]`: downstream crates use it in
    /// their own tests.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = Self::base_options().filename(":memory:");
        // Parallel in-memory connections would each see their own database.
        Self::new(options, PathBuf::from(":memory:"), Some(1)).await
    }

    /// Base connection options shared between file and in-memory databases.
    fn base_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            // Readers (the query server) keep going while the single writer commits.
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // A large BLOB insert holds the write lock for a while; readers
            // and the next writer should wait rather than fail immediately.
            .busy_timeout(std::time::Duration::from_millis(1500))
    }

    /// Per-connection PRAGMAs with no `SqliteConnectOptions` setter.
    async fn apply_pragmas(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        sqlx::query(
            r#"
                PRAGMA locking_mode = NORMAL;
                PRAGMA temp_store = MEMORY;
            "#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Ensure the fixed schema exists.
    ///
    /// This is called automatically by every constructor and is safe to run
    /// any number of times.
    #[instrument("ensuring store schema", skip(self), fields(path = %self.path.display()))]
    async fn bootstrap(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::StorageUnavailable(self.path.clone()))?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Path of the database file (`:memory:` for in-memory stores).
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn writer(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.writer)
    }

    /// Refresh planner statistics, then wait for every pooled connection to
    /// come back and close it. Clones of this handle become unusable.
    pub async fn close(&self) {
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}
