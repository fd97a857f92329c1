//! Bulk import of tweet export files
//!
//! Scans a directory (non-recursively) for files, each holding one JSON
//! array of records in the external wire shape, and upserts every record.
//! A malformed file or record aborts the run; rows inserted earlier in the
//! run are kept.

use serde::Deserialize;
use std::path::Path;

use crate::db::{NewTweet, Repository};
use crate::errors::{AppError, Result};
use crate::metrics;

/// Timestamp format used by the export files, e.g.
/// `Wed Oct 10 20:19:24 +0000 2018`. The offset is a fixed literal.
pub const EXPORT_DATE_FORMAT: &str = "%a %b %d %H:%M:%S +0000 %Y";

/// One record of the external wire shape
#[derive(Debug, Clone, Deserialize)]
pub struct ExportRecord {
    pub source: String,
    pub id_str: String,
    pub text: String,
    pub created_at: String,
    pub retweet_count: i32,
    pub in_reply_to_user_id_str: Option<String>,
    pub favorite_count: i32,
    pub is_retweet: bool,
}

/// Parse an export timestamp. Failure is fatal for the run.
pub fn parse_created_at(raw: &str) -> Result<sea_orm::prelude::DateTimeWithTimeZone> {
    let naive = chrono::NaiveDateTime::parse_from_str(raw, EXPORT_DATE_FORMAT).map_err(|e| {
        AppError::InvalidFormat {
            message: format!("unparseable created_at {:?}: {}", raw, e),
        }
    })?;
    Ok(naive.and_utc().into())
}

impl TryFrom<ExportRecord> for NewTweet {
    type Error = AppError;

    fn try_from(record: ExportRecord) -> Result<Self> {
        Ok(NewTweet {
            source: record.source,
            external_id: record.id_str,
            text: record.text,
            created_at: parse_created_at(&record.created_at)?,
            retweet_count: record.retweet_count,
            favorite_count: record.favorite_count,
            in_reply_to_user_id: record.in_reply_to_user_id_str,
            is_retweet: record.is_retweet,
        })
    }
}

/// Outcome of an import run
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportStats {
    pub files: usize,
    pub records: usize,
    pub inserted: usize,
    pub skipped: usize,
}

/// Import every file in `dir`, in name order.
///
/// Subdirectories are skipped. The first malformed file or record aborts
/// the run with an error naming the file; there is no run-level transaction,
/// so earlier inserts stay.
pub async fn run(repo: &Repository, dir: &Path) -> Result<ImportStats> {
    let mut paths = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();

    let mut stats = ImportStats::default();
    for path in paths {
        let file = path.display().to_string();
        let raw = tokio::fs::read_to_string(&path).await?;
        let records: Vec<ExportRecord> =
            serde_json::from_str(&raw).map_err(|e| AppError::Import {
                file: file.clone(),
                message: e.to_string(),
            })?;

        for record in records {
            let tweet = NewTweet::try_from(record).map_err(|e| AppError::Import {
                file: file.clone(),
                message: e.to_string(),
            })?;
            let (_, inserted) = repo.upsert_tweet(tweet).await?;
            stats.records += 1;
            if inserted {
                stats.inserted += 1;
            } else {
                stats.skipped += 1;
            }
        }

        stats.files += 1;
        tracing::debug!(file = %file, "Imported file");
    }

    metrics::record_imported(stats.inserted as u64);
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "source": "Twitter for iPhone",
        "id_str": "1050118621198921728",
        "text": "To make room for more expression",
        "created_at": "Wed Oct 10 20:19:24 +0000 2018",
        "retweet_count": 12,
        "in_reply_to_user_id_str": null,
        "favorite_count": 42,
        "is_retweet": false
    }"#;

    #[test]
    fn parses_export_timestamp() {
        let parsed = parse_created_at("Wed Oct 10 20:19:24 +0000 2018").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2018-10-10T20:19:24+00:00");
    }

    #[test]
    fn rejects_other_offsets() {
        assert!(parse_created_at("Wed Oct 10 20:19:24 +0530 2018").is_err());
        assert!(parse_created_at("2018-10-10T20:19:24Z").is_err());
    }

    #[test]
    fn decodes_wire_record() {
        let record: ExportRecord = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(record.id_str, "1050118621198921728");
        assert_eq!(record.retweet_count, 12);
        assert!(record.in_reply_to_user_id_str.is_none());

        let tweet = NewTweet::try_from(record).unwrap();
        assert_eq!(tweet.external_id, "1050118621198921728");
        assert_eq!(tweet.created_at.to_rfc3339(), "2018-10-10T20:19:24+00:00");
    }

    #[test]
    fn missing_required_field_is_an_error() {
        // no id_str
        let raw = r#"{
            "source": "Twitter for iPhone",
            "text": "hello",
            "created_at": "Wed Oct 10 20:19:24 +0000 2018",
            "retweet_count": 0,
            "in_reply_to_user_id_str": null,
            "favorite_count": 0,
            "is_retweet": false
        }"#;
        assert!(serde_json::from_str::<ExportRecord>(raw).is_err());
    }

    #[test]
    fn bad_date_fails_record_conversion() {
        let mut record: ExportRecord = serde_json::from_str(SAMPLE).unwrap();
        record.created_at = "October 10, 2018".into();
        assert!(NewTweet::try_from(record).is_err());
    }
}
