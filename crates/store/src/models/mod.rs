mod file;
mod summary;

pub(crate) use self::file::{FileRow, StoredFileRow};
pub use self::file::{FileRecord, StoredFile};
pub(crate) use self::summary::SummaryRow;
pub use self::summary::FileSummary;

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

/// Parse an `upload_date` value.
///
/// The store writes `CURRENT_TIMESTAMP` text (UTC, `YYYY-MM-DD HH:MM:SS`),
/// but the column can be edited freely through the generic accessor, so RFC
/// 3339 is accepted too and anything else yields `None` instead of failing
/// the whole listing.
pub(crate) fn parse_upload_date(id: i64, value: Option<&str>) -> Option<OffsetDateTime> {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let parsed = value.and_then(|value| {
        PrimitiveDateTime::parse(value, &format)
            .map(PrimitiveDateTime::assume_utc)
            .or_else(|_| OffsetDateTime::parse(value, &Rfc3339))
            .ok()
    });
    if parsed.is_none() {
        tracing::warn!(id, ?value, "Unreadable upload date");
    }
    parsed
}

/// `None` (with a warning) for a negative size.
pub(crate) fn parse_size(id: i64, value: i64) -> Option<u64> {
    let size = u64::try_from(value).ok();
    if size.is_none() {
        tracing::warn!(id, value, "Negative file size");
    }
    size
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use time::macros::datetime;

    #[rstest]
    #[case(Some("2024-01-31 23:59:01"), Some(datetime!(2024-01-31 23:59:01 UTC)))]
    #[case(Some("2024-06-01T12:00:00Z"), Some(datetime!(2024-06-01 12:00:00 UTC)))]
    #[case(Some("2024-06-01T14:00:00+02:00"), Some(datetime!(2024-06-01 12:00:00 UTC)))]
    #[case(Some("yesterday"), None)]
    #[case(None, None)]
    fn test_parse_upload_date(#[case] value: Option<&str>, #[case] expected: Option<OffsetDateTime>) {
        assert_eq!(parse_upload_date(1, value), expected);
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size(1, 10), Some(10));
        assert_eq!(parse_size(1, 0), Some(0));
        assert_eq!(parse_size(1, -1), None);
    }
}
