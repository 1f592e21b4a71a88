//! Stage 4: Image Render
//!
//! Renders the cover prompt and then every content prompt, one call at a
//! time. Any failed call aborts the stage; there is no partial result.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::models::{ImageConfig, RenderedImages};
use crate::providers::{ImageGenerator, ImageRequest, ProviderError};
use crate::{RedpostError, Result};

use super::PipelineStage;

pub struct ImageRenderStage {
    image: Arc<dyn ImageGenerator>,
    model: String,
    size: String,
    watermark: bool,
    archive: Option<ImageArchive>,
}

impl ImageRenderStage {
    pub fn new(
        image: Arc<dyn ImageGenerator>,
        model: impl Into<String>,
        size: impl Into<String>,
        watermark: bool,
    ) -> Self {
        Self {
            image,
            model: model.into(),
            size: size.into(),
            watermark,
            archive: None,
        }
    }

    /// Also download every rendered image into a local directory
    pub fn with_archive(mut self, archive: ImageArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    pub async fn run(&self, config: &ImageConfig) -> Result<RenderedImages> {
        let total = 1 + config.content_images.len();
        tracing::info!("[IMAGE_RENDER] Rendering {} images", total);

        let cover = self.render_one(&config.cover_image, 1, total).await?;

        let mut content = Vec::with_capacity(config.content_images.len());
        for (i, prompt) in config.content_images.iter().enumerate() {
            content.push(self.render_one(prompt, i + 2, total).await?);
        }

        let images = RenderedImages::new(cover, content);

        if let Some(archive) = &self.archive {
            archive.save_all(&images).await;
        }

        Ok(images)
    }

    async fn render_one(&self, prompt: &str, position: usize, total: usize) -> Result<String> {
        tracing::debug!("[IMAGE_RENDER] Image {}/{}", position, total);

        let url = self
            .image
            .render(ImageRequest {
                model: self.model.clone(),
                prompt: prompt.to_string(),
                size: self.size.clone(),
                watermark: self.watermark,
            })
            .await
            .map_err(|source| RedpostError::Transport {
                stage: PipelineStage::ImageRender,
                source,
            })?;

        tracing::info!("[IMAGE_RENDER] Image {}/{} ready", position, total);
        Ok(url)
    }
}

/// Local copies of rendered images
///
/// Files are named `{cover|content}_{index}_{millis}.png`. Failures are logged
/// and never change the rendered references.
pub struct ImageArchive {
    client: Client,
    dir: PathBuf,
}

impl ImageArchive {
    pub fn new(
        dir: impl Into<PathBuf>,
        timeout: Duration,
    ) -> std::result::Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        Ok(Self {
            client,
            dir: dir.into(),
        })
    }

    /// Download every image; returns the paths that were written
    pub async fn save_all(&self, images: &RenderedImages) -> Vec<PathBuf> {
        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            tracing::warn!(
                "[IMAGE_RENDER] Cannot create archive dir {}: {}",
                self.dir.display(),
                e
            );
            return Vec::new();
        }

        let mut saved = Vec::new();
        for (index, url) in images.as_slice().iter().enumerate() {
            let kind = if index == 0 { "cover" } else { "content" };
            match self.save_one(url, kind, index).await {
                Ok(path) => {
                    tracing::debug!("[IMAGE_RENDER] Archived {}", path.display());
                    saved.push(path);
                }
                Err(e) => tracing::warn!("[IMAGE_RENDER] Failed to archive {}: {}", url, e),
            }
        }
        saved
    }

    async fn save_one(
        &self,
        url: &str,
        kind: &str,
        index: usize,
    ) -> std::result::Result<PathBuf, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }

        let bytes = response.bytes().await.map_err(|e| e.to_string())?;
        let millis = chrono::Utc::now().timestamp_millis();
        let path = self.dir.join(format!("{kind}_{index}_{millis}.png"));

        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| e.to_string())?;

        Ok(path)
    }
}
