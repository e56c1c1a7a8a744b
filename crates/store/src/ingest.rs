//! Reading files from disk into a store.

use crate::Repository;
use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use std::path::Path;
use tracing::instrument;

/// MIME type recorded when none is given and none can be guessed.
pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// Result of ingesting a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingested {
    pub id: i64,
    pub file_name: String,
    pub mime_type: String,
    /// Ids of files that already had identical content before this insert.
    pub duplicates: Vec<i64>,
}

/// Guess a MIME type from the file extension.
pub fn guess_mime_type(path: impl AsRef<Path>) -> String {
    mime_guess::from_path(path).first_raw().unwrap_or(FALLBACK_MIME_TYPE).to_string()
}

/// Read the file at `path` and store it under its base name.
///
/// If `mime_type` is `None` it is guessed from the extension. Content with
/// the same SHA-256 as existing files is still stored; the existing ids are
/// reported in [`Ingested::duplicates`].
#[instrument(skip(repo, path), fields(path = %path.as_ref().display()))]
pub async fn insert_path(repo: &Repository, path: impl AsRef<Path>, mime_type: Option<&str>) -> Result<Ingested> {
    let path = path.as_ref();
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_raise(|| ErrorKind::Io(path.to_path_buf()))?
        .to_string();
    let content = tokio::fs::read(path).await.or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
    let mime_type = mime_type.map(str::to_string).unwrap_or_else(|| guess_mime_type(path));
    let digests = crate::hash(&content);
    let duplicates = repo
        .find_by_strong_hash(&digests.strong)
        .await?
        .into_iter()
        .map(|file| file.id)
        .collect::<Vec<_>>();
    if !duplicates.is_empty() {
        tracing::info!(?duplicates, "File content is already stored");
    }
    let id = repo.insert_hashed(&content, &digests, &file_name, Some(&mime_type)).await?;
    Ok(Ingested { id, file_name, mime_type, duplicates })
}
