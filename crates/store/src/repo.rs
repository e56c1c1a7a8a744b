//! Repository for the fixed `files` table.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::hash::{Digests, hash};
use crate::models::{FileRecord, FileRow, FileSummary, StoredFile, StoredFileRow, SummaryRow};
use exn::{OptionExt, ResultExt};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::instrument;

/// Repository for managing file records in a store database.
///
/// Content, digests, size and upload date are written once by
/// [`insert`](Self::insert) and never modified through this API; only the
/// display name can change afterwards.
///
/// Every mutation runs in its own transaction while holding the write lock
/// shared by all repositories created from the same [`Database`], so two
/// mutations on one handle never interleave. A transaction that is dropped
/// before commit is rolled back by sqlx, which is how every early `?` return
/// below avoids leaving partial writes behind.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
    writer: Arc<Mutex<()>>,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone(), writer: db.writer() }
    }
}
impl Repository {
    // =========================================================================
    // Insert
    // =========================================================================

    /// Store a new file and return its id.
    ///
    /// Digests and size are always derived from `content`.
    pub async fn insert(
        &self,
        content: impl AsRef<[u8]>,
        file_name: impl AsRef<str>,
        mime_type: Option<&str>,
    ) -> Result<i64> {
        let content = content.as_ref();
        self.insert_hashed(content, &hash(content), file_name.as_ref(), mime_type).await
    }

    /// [`insert`](Self::insert) for callers that already hashed `content`.
    #[instrument(skip(self, content, digests), fields(size = content.len()))]
    pub(crate) async fn insert_hashed(
        &self,
        content: &[u8],
        digests: &Digests,
        file_name: &str,
        mime_type: Option<&str>,
    ) -> Result<i64> {
        let failed = || ErrorKind::InsertFailed(file_name.to_string());
        let size = i64::try_from(content.len()).or_raise(|| ErrorKind::InvalidData("file size"))?;
        let _guard = self.writer.lock().await;
        let mut tx = self.pool.begin().await.or_raise(failed)?;
        let result = sqlx::query(include_str!("../queries/insert_file.sql"))
            .bind(&digests.short)
            .bind(&digests.strong)
            .bind(file_name)
            .bind(mime_type)
            .bind(content)
            .bind(size)
            .execute(&mut *tx)
            .await
            .or_raise(failed)?;
        tx.commit().await.or_raise(failed)?;
        let id = result.last_insert_rowid();
        tracing::info!(id, sha256 = %digests.strong, "Stored file");
        Ok(id)
    }

    // =========================================================================
    // Get/Fetch
    // =========================================================================

    /// Get the content, name and MIME type of a file.
    pub async fn fetch(&self, id: i64) -> Result<StoredFile> {
        let row: Option<StoredFileRow> = sqlx::query_as(include_str!("../queries/fetch_file.sql"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(row.ok_or_raise(|| ErrorKind::NotFound(id))?.into())
    }

    /// Get the complete record of a file, including its stored digests.
    pub async fn record(&self, id: i64) -> Result<FileRecord> {
        let row: Option<FileRow> = sqlx::query_as(include_str!("../queries/get_record.sql"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(row.ok_or_raise(|| ErrorKind::NotFound(id))?.into())
    }

    /// Re-hash the stored content of a file and compare it (and its length)
    /// against what was recorded at insert time.
    pub async fn verify(&self, id: i64) -> Result<bool> {
        let record = self.record(id).await?;
        let intact = record.is_intact();
        if !intact {
            tracing::warn!(id, "Stored content no longer matches its recorded digests");
        }
        Ok(intact)
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// List all files, most recently inserted first.
    pub async fn list(&self) -> Result<Vec<FileSummary>> {
        let rows: Vec<SummaryRow> = sqlx::query_as(include_str!("../queries/list_files.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(rows.into_iter().map(FileSummary::from).collect())
    }

    /// Find files whose content has the given SHA-256 digest.
    ///
    /// Identical content dropped in twice is stored twice; this is how a
    /// caller detects that before (or after) inserting.
    pub async fn find_by_strong_hash(&self, sha256: impl AsRef<str>) -> Result<Vec<FileSummary>> {
        let rows: Vec<SummaryRow> = sqlx::query_as(include_str!("../queries/find_by_sha256.sql"))
            .bind(sha256.as_ref().to_ascii_lowercase())
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(rows.into_iter().map(FileSummary::from).collect())
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Change the display name of a file.
    ///
    /// Renaming a file to its current name succeeds without changes.
    #[instrument(skip(self, new_name), fields(new_name = new_name.as_ref()))]
    pub async fn rename(&self, id: i64, new_name: impl AsRef<str>) -> Result<()> {
        let _guard = self.writer.lock().await;
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        let result = sqlx::query(include_str!("../queries/rename_file.sql"))
            .bind(new_name.as_ref())
            .bind(id)
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if result.rows_affected() == 0 {
            exn::bail!(ErrorKind::NotFound(id));
        }
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Delete a file.
    ///
    /// Deleting an id that does not exist is not an error. Returns `true` if
    /// a record was deleted, `false` if there was nothing to delete.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let _guard = self.writer.lock().await;
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        let result = sqlx::query(include_str!("../queries/delete_file.sql"))
            .bind(id)
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> (Database, Repository) {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        (db, repo)
    }

    #[tokio::test]
    async fn test_insert_and_list() {
        let (_db, repo) = setup().await;
        let id = repo.insert(b"0123456789", "a.txt", Some("text/plain")).await.unwrap();
        let files = repo.list().await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].id, id);
        assert_eq!(files[0].file_name, "a.txt");
        assert_eq!(files[0].mime_type.as_deref(), Some("text/plain"));
        assert_eq!(files[0].size, Some(10));
        let file = repo.fetch(id).await.unwrap();
        assert_eq!(file.content, b"0123456789");
    }

    #[tokio::test]
    async fn test_insert_and_fetch_round_trip() {
        let (_db, repo) = setup().await;
        let content: Vec<u8> = (0..=255).collect();
        let id = repo.insert(&content, "bytes.bin", None).await.unwrap();
        let file = repo.fetch(id).await.unwrap();
        assert_eq!(file, StoredFile { content, file_name: "bytes.bin".to_string(), mime_type: None });
    }

    #[tokio::test]
    async fn test_insert_empty_content() {
        let (_db, repo) = setup().await;
        let id = repo.insert(b"", "empty", None).await.unwrap();
        let record = repo.record(id).await.unwrap();
        assert_eq!(record.size, Some(0));
        assert_eq!(record.digests, hash(b""));
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let (_db, repo) = setup().await;
        let first = repo.insert(b"one", "one", None).await.unwrap();
        let second = repo.insert(b"two", "two", None).await.unwrap();
        let third = repo.insert(b"three", "three", None).await.unwrap();
        let ids = repo.list().await.unwrap().into_iter().map(|f| f.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![third, second, first]);
    }

    #[tokio::test]
    async fn test_size_matches_content_for_every_row() {
        let (db, repo) = setup().await;
        for len in [0usize, 1, 10, 4096] {
            repo.insert(vec![7u8; len], format!("{len}.bin"), None).await.unwrap();
        }
        let mismatched: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files WHERE file_size != length(file_data)")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(mismatched, 0);
    }

    #[tokio::test]
    async fn test_record_hashes_are_reproducible() {
        let (_db, repo) = setup().await;
        let id = repo.insert(b"Winnie the Pooh", "pooh.txt", None).await.unwrap();
        let record = repo.record(id).await.unwrap();
        assert_eq!(record.digests, hash(&record.content));
        assert!(repo.verify(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_detects_tampering() {
        let (db, repo) = setup().await;
        let id = repo.insert(b"original", "file", None).await.unwrap();
        sqlx::query("UPDATE files SET file_data = x'00' WHERE id = ?").bind(id).execute(db.pool()).await.unwrap();
        assert!(!repo.verify(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_fetch_missing() {
        let (_db, repo) = setup().await;
        let err = repo.fetch(9999).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(9999)));
    }

    #[tokio::test]
    async fn test_delete_then_fetch() {
        let (_db, repo) = setup().await;
        let id = repo.insert(b"gone soon", "tmp", None).await.unwrap();
        assert!(repo.delete(id).await.unwrap());
        let err = repo.fetch(id).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_missing_is_silent() {
        let (_db, repo) = setup().await;
        assert!(!repo.delete(42).await.unwrap());
    }

    #[tokio::test]
    async fn test_ids_are_never_reused() {
        let (_db, repo) = setup().await;
        let first = repo.insert(b"a", "a", None).await.unwrap();
        repo.delete(first).await.unwrap();
        let second = repo.insert(b"b", "b", None).await.unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_rename_only_changes_name() {
        let (_db, repo) = setup().await;
        let id = repo.insert(b"content", "before.txt", Some("text/plain")).await.unwrap();
        let before = repo.record(id).await.unwrap();
        repo.rename(id, "after.txt").await.unwrap();
        let after = repo.record(id).await.unwrap();
        assert_eq!(after.file_name, "after.txt");
        assert_eq!(after, FileRecord { file_name: "after.txt".to_string(), ..before });
    }

    #[tokio::test]
    async fn test_rename_to_same_name() {
        let (_db, repo) = setup().await;
        let id = repo.insert(b"content", "same.txt", None).await.unwrap();
        repo.rename(id, "same.txt").await.unwrap();
        assert_eq!(repo.fetch(id).await.unwrap().file_name, "same.txt");
    }

    #[tokio::test]
    async fn test_rename_missing() {
        let (_db, repo) = setup().await;
        let err = repo.rename(404, "nope").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(404)));
        // The failed transaction must not leave the handle unusable.
        repo.insert(b"still works", "ok", None).await.unwrap();
    }

    #[tokio::test]
    async fn test_find_by_strong_hash() {
        let (_db, repo) = setup().await;
        let first = repo.insert(b"duplicate", "one.txt", None).await.unwrap();
        let second = repo.insert(b"duplicate", "two.txt", None).await.unwrap();
        repo.insert(b"unique", "three.txt", None).await.unwrap();
        let strong = hash(b"duplicate").strong.to_uppercase();
        let ids = repo.find_by_strong_hash(strong).await.unwrap().into_iter().map(|f| f.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![second, first]);
    }

    #[tokio::test]
    async fn test_failed_insert_is_rolled_back() {
        let (db, repo) = setup().await;
        sqlx::raw_sql(
            "CREATE TRIGGER reject_forbidden BEFORE INSERT ON files WHEN NEW.file_name = 'forbidden' \
             BEGIN SELECT RAISE(ABORT, 'forbidden name'); END;",
        )
        .execute(db.pool())
        .await
        .unwrap();
        let err = repo.insert(b"data", "forbidden", None).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InsertFailed(_)));
        assert!(repo.list().await.unwrap().is_empty());
        repo.insert(b"data", "allowed", None).await.unwrap();
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_survives_hand_edited_rows() {
        let (db, repo) = setup().await;
        let first = repo.insert(b"first", "first.txt", None).await.unwrap();
        let second = repo.insert(b"second", "second.txt", None).await.unwrap();
        let third = repo.insert(b"third", "third.txt", None).await.unwrap();
        sqlx::query("UPDATE files SET upload_date = '2024-06-01T12:00:00Z' WHERE rowid = ?")
            .bind(first)
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("UPDATE files SET upload_date = 'soon', file_size = -1 WHERE rowid = ?")
            .bind(second)
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("UPDATE files SET upload_date = NULL, file_name = 42 WHERE rowid = ?")
            .bind(third)
            .execute(db.pool())
            .await
            .unwrap();

        let files = repo.list().await.unwrap();
        assert_eq!(files.len(), 3);
        assert_eq!((files[0].file_name.as_str(), files[0].created_at), ("42", None));
        assert_eq!((files[1].size, files[1].created_at), (None, None));
        assert_eq!(files[2].created_at.map(|date| date.year()), Some(2024));
        assert!(!repo.verify(second).await.unwrap());
        assert!(repo.verify(third).await.unwrap());
    }
}
