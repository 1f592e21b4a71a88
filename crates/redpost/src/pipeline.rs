//! Pipeline orchestrator
//!
//! Runs the stages in their fixed order and stops at the first failure.
//! Nothing is persisted until the publish has succeeded.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::RedpostConfig;
use crate::history::{NewPublishRecord, PublishRecord, PublishRecordStore};
use crate::models::{GeneratedPost, GenerationInput};
use crate::preview::{PreviewData, PreviewDecision, PreviewGate, ReviewPrompt};
use crate::providers::{ImageGenerator, OpenAICompatProvider, TextGenerator};
use crate::publisher::{publisher_for, PublishReceipt, PublishRequest, Publisher};
use crate::scheduler::{ScheduleTime, SchedulingExecutor};
use crate::stages::{
    ContentStage, ImageArchive, ImagePromptStage, ImageRenderStage, PipelineStage, StructureStage,
};
use crate::{RedpostError, Result};

const STRUCTURE_MAX_TOKENS: u32 = 2000;
const CONTENT_MAX_TOKENS: u32 = 2000;
const IMAGE_PROMPT_MAX_TOKENS: u32 = 1000;

/// How a run ended
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    Published {
        post: GeneratedPost,
        record: PublishRecord,
        receipt: PublishReceipt,
        waited: Duration,
    },
    /// The reviewer declined; nothing was published or recorded
    Cancelled { post: GeneratedPost },
}

impl PipelineOutcome {
    pub fn post(&self) -> &GeneratedPost {
        match self {
            PipelineOutcome::Published { post, .. } | PipelineOutcome::Cancelled { post } => post,
        }
    }

    pub fn is_published(&self) -> bool {
        matches!(self, PipelineOutcome::Published { .. })
    }
}

pub struct Pipeline {
    structure: StructureStage,
    content: ContentStage,
    image_prompt: ImagePromptStage,
    image_render: ImageRenderStage,
    gate: PreviewGate,
    executor: SchedulingExecutor,
    store: PublishRecordStore,
    private: bool,
}

impl Pipeline {
    /// Build with the HTTP providers and publisher described by `config`
    pub fn from_config(config: &RedpostConfig) -> Result<Self> {
        config.validate()?;
        let timeout = Duration::from_secs(config.llm.timeout_secs);

        let text =
            OpenAICompatProvider::new(&config.llm.base_url, config.llm.api_key.clone(), timeout)
                .map_err(|source| RedpostError::Transport {
                    stage: PipelineStage::Structure,
                    source,
                })?;
        let image =
            OpenAICompatProvider::new(config.image_base_url(), config.image_api_key(), timeout)
                .map_err(|source| RedpostError::Transport {
                    stage: PipelineStage::ImageRender,
                    source,
                })?;

        Self::new(config, Arc::new(text), Arc::new(image), publisher_for(config)?)
    }

    /// Build with explicit capabilities
    pub fn new(
        config: &RedpostConfig,
        text: Arc<dyn TextGenerator>,
        image: Arc<dyn ImageGenerator>,
        publisher: Arc<dyn Publisher>,
    ) -> Result<Self> {
        let mut image_render = ImageRenderStage::new(
            image,
            config.image.model.clone(),
            config.image.size.clone(),
            config.image.watermark,
        );

        if config.storage.archive_images {
            let archive = ImageArchive::new(
                config.storage.output_dir.clone(),
                Duration::from_secs(config.llm.timeout_secs),
            )
            .map_err(|source| RedpostError::Transport {
                stage: PipelineStage::ImageRender,
                source,
            })?;
            image_render = image_render.with_archive(archive);
        }

        Ok(Self {
            structure: StructureStage::new(text.clone(), config.chat_config(STRUCTURE_MAX_TOKENS)),
            content: ContentStage::new(text.clone(), config.chat_config(CONTENT_MAX_TOKENS)),
            image_prompt: ImagePromptStage::new(text, config.chat_config(IMAGE_PROMPT_MAX_TOKENS)),
            image_render,
            gate: PreviewGate::new(
                config.storage.preview_dir.clone(),
                config.preview.open_browser,
            ),
            executor: SchedulingExecutor::new(publisher),
            store: PublishRecordStore::in_dir(&config.storage.output_dir),
            private: config.publish.private,
        })
    }

    pub fn store(&self) -> &PublishRecordStore {
        &self.store
    }

    /// Run the four generation stages
    pub async fn generate(&self, input: &GenerationInput) -> Result<GeneratedPost> {
        let resolved = input.resolve()?;
        let started = Instant::now();
        tracing::info!("[PIPELINE] Generating post for topic: {}", resolved.topic);

        let structure = self.structure.run(&resolved).await?;
        let content = self.content.run(&structure).await?;
        let image_config = self.image_prompt.run(&content).await?;
        let images = self.image_render.run(&image_config).await?;

        tracing::info!(
            "[PIPELINE] Post generated in {:.1}s: {} ({} images)",
            started.elapsed().as_secs_f64(),
            content.title,
            images.len()
        );

        Ok(GeneratedPost {
            structure,
            content,
            image_config,
            images,
        })
    }

    /// Generate, review, then publish now or at the confirmed time
    pub async fn run(
        &self,
        input: &GenerationInput,
        prompt: &mut dyn ReviewPrompt,
    ) -> Result<PipelineOutcome> {
        let post = self.generate(input).await?;

        match self.gate.review(&PreviewData::from_post(&post), prompt).await? {
            PreviewDecision::Cancelled => Ok(PipelineOutcome::Cancelled { post }),
            PreviewDecision::Confirmed { schedule } => {
                self.publish_and_record(post, schedule).await
            }
        }
    }

    /// Generate and publish immediately, skipping the gate
    pub async fn quick_publish(&self, input: &GenerationInput) -> Result<PipelineOutcome> {
        let post = self.generate(input).await?;
        self.publish_and_record(post, None).await
    }

    /// Publish a generated post once and append its record
    pub async fn publish_and_record(
        &self,
        post: GeneratedPost,
        schedule: Option<ScheduleTime>,
    ) -> Result<PipelineOutcome> {
        let request = PublishRequest::from_post(&post, self.private);
        tracing::info!(
            "[PIPELINE] Publishing \"{}\" via {}",
            request.title,
            self.executor.publisher_name()
        );
        let report = self.executor.execute(schedule.as_ref(), &request).await?;

        let record = self
            .store
            .append(NewPublishRecord {
                title: request.title,
                content: request.content,
                tags: request.tags,
                images: request.images,
                scheduled_time: schedule,
                private: request.private,
                publisher: report.receipt.publisher.clone(),
            })
            .await?;

        Ok(PipelineOutcome::Published {
            post,
            record,
            receipt: report.receipt,
            waited: report.waited,
        })
    }
}
