//! Publish record store
//!
//! An append-only JSON array in `publish_records.json`. Every append rewrites
//! the whole file through a temp file and rename. There is one writer and no
//! locking.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scheduler::ScheduleTime;
use crate::{RedpostError, Result};

pub const RECORDS_FILE_NAME: &str = "publish_records.json";

pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// One executed publish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRecord {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub publish_time: DateTime<Utc>,
    pub scheduled: bool,
    pub scheduled_time: Option<String>,
    pub private: bool,
    #[serde(default)]
    pub publisher: String,
}

/// Everything a record needs except the id and timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct NewPublishRecord {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub scheduled_time: Option<ScheduleTime>,
    pub private: bool,
    pub publisher: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistorySummary {
    pub total: usize,
    pub scheduled: usize,
    pub immediate: usize,
    pub private: usize,
    pub by_publisher: BTreeMap<String, usize>,
}

pub struct PublishRecordStore {
    path: PathBuf,
}

impl PublishRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<dir>/publish_records.json`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(RECORDS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records in insertion order; an absent file is an empty store
    pub async fn load_all(&self) -> Result<Vec<PublishRecord>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&raw).map_err(|e| {
            RedpostError::StoreError(format!(
                "{} is not a valid record list: {}",
                self.path.display(),
                e
            ))
        })
    }

    pub async fn append(&self, new_record: NewPublishRecord) -> Result<PublishRecord> {
        let mut records = self.load_all().await?;

        let record = PublishRecord {
            id: Uuid::new_v4(),
            title: new_record.title,
            content: new_record.content,
            tags: new_record.tags,
            images: new_record.images,
            publish_time: Utc::now(),
            scheduled: new_record.scheduled_time.is_some(),
            scheduled_time: new_record.scheduled_time.map(|t| t.to_string()),
            private: new_record.private,
            publisher: new_record.publisher,
        };
        records.push(record.clone());

        self.write_all(&records).await?;
        tracing::info!(
            "[RECORD] Saved publish record {} ({} total)",
            record.id,
            records.len()
        );

        Ok(record)
    }

    /// Last `limit` records, most recent first
    pub async fn recent(&self, limit: usize) -> Result<Vec<PublishRecord>> {
        let records = self.load_all().await?;
        let skip = records.len().saturating_sub(limit);
        Ok(records.into_iter().skip(skip).rev().collect())
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<PublishRecord>> {
        Ok(self.load_all().await?.into_iter().find(|r| r.id == id))
    }

    pub async fn summary(&self) -> Result<HistorySummary> {
        let records = self.load_all().await?;
        let mut summary = HistorySummary {
            total: records.len(),
            ..Default::default()
        };

        for record in &records {
            if record.scheduled {
                summary.scheduled += 1;
            } else {
                summary.immediate += 1;
            }
            if record.private {
                summary.private += 1;
            }
            let publisher = if record.publisher.is_empty() {
                "unknown"
            } else {
                record.publisher.as_str()
            };
            *summary.by_publisher.entry(publisher.to_string()).or_default() += 1;
        }

        Ok(summary)
    }

    async fn write_all(&self, records: &[PublishRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
