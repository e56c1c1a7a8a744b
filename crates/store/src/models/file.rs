use crate::hash::Digests;
use crate::models::{parse_size, parse_upload_date};
use time::OffsetDateTime;

/// A complete row of the `files` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub id: i64,
    pub digests: Digests,
    pub file_name: String,
    pub mime_type: Option<String>,
    pub content: Vec<u8>,
    /// `None` if the stored value is unreadable (see [`FileSummary`](crate::FileSummary)).
    pub size: Option<u64>,
    pub created_at: Option<OffsetDateTime>,
}

impl FileRecord {
    /// Whether the stored size and digests still describe the stored content.
    pub fn is_intact(&self) -> bool {
        u64::try_from(self.content.len()).is_ok_and(|len| self.size == Some(len)) && self.digests.matches(&self.content)
    }
}

/// The payload needed to preview or export a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub content: Vec<u8>,
    pub file_name: String,
    pub mime_type: Option<String>,
}

#[derive(sqlx::FromRow)]
pub(crate) struct FileRow {
    id: i64,
    md5_hash: String,
    sha256_hash: String,
    file_name: String,
    mime_type: Option<String>,
    file_data: Vec<u8>,
    upload_date: Option<String>,
    file_size: i64,
}
impl From<FileRow> for FileRecord {
    fn from(row: FileRow) -> Self {
        Self {
            size: parse_size(row.id, row.file_size),
            created_at: parse_upload_date(row.id, row.upload_date.as_deref()),
            id: row.id,
            digests: Digests { short: row.md5_hash, strong: row.sha256_hash },
            file_name: row.file_name,
            mime_type: row.mime_type,
            content: row.file_data,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct StoredFileRow {
    file_data: Vec<u8>,
    file_name: String,
    mime_type: Option<String>,
}
impl From<StoredFileRow> for StoredFile {
    fn from(row: StoredFileRow) -> Self {
        Self {
            content: row.file_data,
            file_name: row.file_name,
            mime_type: row.mime_type,
        }
    }
}
