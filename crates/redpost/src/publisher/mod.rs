//! Publish back-ends
//!
//! The pipeline only sees the [`Publisher`] trait. Which implementation runs
//! is decided once from configuration: a JSON-RPC tool server when an MCP URL
//! is set, otherwise a local JSON payload file.

mod local;
mod mcp;

pub use local::LocalFilePublisher;
pub use mcp::McpPublisher;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::RedpostConfig;
use crate::models::GeneratedPost;
use crate::Result;

/// What gets sent to the publish back-end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    #[serde(default)]
    pub private: bool,
}

impl PublishRequest {
    pub fn from_post(post: &GeneratedPost, private: bool) -> Self {
        Self {
            title: post.content.title.clone(),
            content: post.content.body.clone(),
            tags: post.content.tags.clone(),
            images: post.images.as_slice().to_vec(),
            private,
        }
    }
}

/// Acknowledgement from a successful publish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishReceipt {
    /// Name of the back-end that accepted the post
    pub publisher: String,
    /// Back-end specific reference (payload path, RPC result text...)
    pub reference: Option<String>,
    pub message: String,
}

#[async_trait]
pub trait Publisher: Send + Sync {
    fn name(&self) -> &str;

    /// Publish once; errors are never retried here
    async fn publish(&self, request: &PublishRequest) -> Result<PublishReceipt>;
}

/// Select the back-end described by configuration
pub fn publisher_for(config: &RedpostConfig) -> Result<Arc<dyn Publisher>> {
    match config.publish.mcp_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => {
            tracing::info!("[PUBLISH] Using MCP publisher at {}", url);
            let publisher = McpPublisher::new(
                url,
                config.publish.mcp_tool.clone(),
                Duration::from_secs(config.llm.timeout_secs),
            )?;
            Ok(Arc::new(publisher))
        }
        _ => {
            tracing::info!(
                "[PUBLISH] No MCP URL configured, writing payloads to {}",
                config.storage.output_dir.display()
            );
            Ok(Arc::new(LocalFilePublisher::new(
                config.storage.output_dir.clone(),
            )))
        }
    }
}
