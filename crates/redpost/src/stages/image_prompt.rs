//! Stage 3: Image Prompt
//!
//! Turns the finished post into one cover prompt and a list of content
//! prompts.

use std::sync::Arc;

use serde::Deserialize;

use crate::models::{Content, ImageConfig};
use crate::parser::{self, ParseError};
use crate::providers::{ChatConfig, TextGenerator};
use crate::{RedpostError, Result};

use super::{call_model, PipelineStage};

#[derive(Debug, Deserialize)]
struct ImageConfigDraft {
    #[serde(default)]
    cover_image: String,
    #[serde(default)]
    content_images: Vec<String>,
    #[serde(default)]
    content_images_count: Option<usize>,
}

pub struct ImagePromptStage {
    text: Arc<dyn TextGenerator>,
    chat: ChatConfig,
}

impl ImagePromptStage {
    pub fn new(text: Arc<dyn TextGenerator>, chat: ChatConfig) -> Self {
        Self { text, chat }
    }

    pub async fn run(&self, content: &Content) -> Result<ImageConfig> {
        tracing::info!("[IMAGE_PROMPT] Planning images for: {}", content.title);

        let raw = call_model(
            self.text.as_ref(),
            PipelineStage::ImagePrompt,
            build_prompt(content),
            &self.chat,
        )
        .await?;

        let config = assemble(&raw).map_err(|source| RedpostError::Parse {
            stage: PipelineStage::ImagePrompt,
            source,
        })?;

        tracing::info!(
            "[IMAGE_PROMPT] 1 cover + {} content prompts",
            config.content_images_count
        );

        Ok(config)
    }
}

pub fn build_prompt(content: &Content) -> String {
    let suggestions = if content.image_suggestions.is_empty() {
        String::new()
    } else {
        format!("\n配图建议：\n{}\n", content.image_suggestions)
    };

    format!(
        r#"你是小红书配图专家，擅长把文章观点转化为对应画面。

标题：{title}

正文：
{body}
{suggestions}
请按以下步骤思考，但不要输出思考过程：
1. 从正文中提炼2-3个明确、可被画面表达的核心观点
2. 为每个观点生成一条内容图 Prompt，紧扣标题和正文
3. 生成1条封面图 Prompt，紧扣标题要表达的观点

生成规则：
1. 科技质感的浅色风格
2. 不要出现emoji、乱码或不可识别的文字
3. 不要出现平台logo、角标或水印
4. 描述必须是清晰具体、可视觉化的画面，用图标、构图和色彩代替文字

只输出严格 JSON，不要解释：
{{
  "cover_image": "",
  "content_images": [],
  "content_images_count": 0
}}"#,
        title = content.title,
        body = content.body,
        suggestions = suggestions,
    )
}

/// Parse the plan and make the declared count agree with the list
pub fn assemble(raw: &str) -> std::result::Result<ImageConfig, ParseError> {
    let draft: ImageConfigDraft = parser::extract_record(raw)?;

    let cover = draft.cover_image.trim();
    if cover.is_empty() {
        return Err(ParseError::new("cover_image prompt is empty", raw));
    }

    let content_images: Vec<String> = draft
        .content_images
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();

    if let Some(declared) = draft.content_images_count {
        if declared != content_images.len() {
            tracing::warn!(
                "[IMAGE_PROMPT] Declared {} content images but received {}, using list length",
                declared,
                content_images.len()
            );
        }
    }

    Ok(ImageConfig::new(cover, content_images))
}
