use crate::models::{parse_size, parse_upload_date};
use serde::Serialize;
use time::OffsetDateTime;

/// Listing projection of a stored file; everything except the content and
/// its digests.
///
/// `size` and `created_at` are `None` when the stored values are unreadable
/// (e.g. after the row was edited by hand).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub id: i64,
    pub file_name: String,
    pub mime_type: Option<String>,
    pub size: Option<u64>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

#[derive(sqlx::FromRow)]
pub(crate) struct SummaryRow {
    id: i64,
    file_name: String,
    mime_type: Option<String>,
    file_size: i64,
    upload_date: Option<String>,
}
impl From<SummaryRow> for FileSummary {
    fn from(row: SummaryRow) -> Self {
        Self {
            size: parse_size(row.id, row.file_size),
            created_at: parse_upload_date(row.id, row.upload_date.as_deref()),
            id: row.id,
            file_name: row.file_name,
            mime_type: row.mime_type,
        }
    }
}
