//! Local fallback publisher
//!
//! Writes the note payload to `publish_<millis>.json` in the output directory
//! and reports success.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;

use super::{PublishReceipt, PublishRequest, Publisher};
use crate::Result;

const IMAGE_WIDTH: u32 = 1728;
const IMAGE_HEIGHT: u32 = 2304;

#[derive(Debug, Serialize)]
struct NotePayload<'a> {
    title: &'a str,
    desc: &'a str,
    #[serde(rename = "type")]
    note_type: &'static str,
    ats: Vec<String>,
    topics: Vec<String>,
    images: Vec<NoteImage<'a>>,
}

#[derive(Debug, Serialize)]
struct NoteImage<'a> {
    url: &'a str,
    width: u32,
    height: u32,
}

pub struct LocalFilePublisher {
    output_dir: PathBuf,
}

impl LocalFilePublisher {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

#[async_trait]
impl Publisher for LocalFilePublisher {
    fn name(&self) -> &str {
        "local"
    }

    async fn publish(&self, request: &PublishRequest) -> Result<PublishReceipt> {
        let payload = NotePayload {
            title: &request.title,
            desc: &request.content,
            note_type: "normal",
            ats: Vec::new(),
            topics: request.tags.iter().map(|t| t.replace('#', "")).collect(),
            images: request
                .images
                .iter()
                .map(|url| NoteImage {
                    url,
                    width: IMAGE_WIDTH,
                    height: IMAGE_HEIGHT,
                })
                .collect(),
        };

        tokio::fs::create_dir_all(&self.output_dir).await?;

        let millis = chrono::Utc::now().timestamp_millis();
        let path = self.output_dir.join(format!("publish_{millis}.json"));
        let json = serde_json::to_string_pretty(&payload)?;
        tokio::fs::write(&path, json).await?;

        tracing::info!("[PUBLISH] Payload written to {}", path.display());

        Ok(PublishReceipt {
            publisher: self.name().to_string(),
            reference: Some(path.display().to_string()),
            message: "payload saved locally".to_string(),
        })
    }
}
