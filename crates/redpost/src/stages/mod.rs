//! Generation stages
//!
//! Four sequential stages turn a topic into a post with images:
//! 1. Structure - candidate titles, outline and tags
//! 2. Content - the finished title, body and tags
//! 3. Image Prompt - cover prompt plus content prompts
//! 4. Image Render - one image per prompt, cover first
//!
//! The remaining variants name the gate, publish and record steps so errors
//! can always say where they came from.

pub mod content;
pub mod image_prompt;
pub mod image_render;
pub mod structure;

use serde::{Deserialize, Serialize};

use crate::providers::{ChatConfig, ChatRequest, TextGenerator};
use crate::{RedpostError, Result};

pub use content::ContentStage;
pub use image_prompt::ImagePromptStage;
pub use image_render::{ImageArchive, ImageRenderStage};
pub use structure::StructureStage;

/// Pipeline step names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Structure,
    Content,
    ImagePrompt,
    ImageRender,
    Preview,
    Publish,
    Record,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Structure => "structure",
            PipelineStage::Content => "content",
            PipelineStage::ImagePrompt => "image_prompt",
            PipelineStage::ImageRender => "image_render",
            PipelineStage::Preview => "preview",
            PipelineStage::Publish => "publish",
            PipelineStage::Record => "record",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PipelineStage::Structure => "Structure",
            PipelineStage::Content => "Content",
            PipelineStage::ImagePrompt => "Image Prompt",
            PipelineStage::ImageRender => "Image Render",
            PipelineStage::Preview => "Preview",
            PipelineStage::Publish => "Publish",
            PipelineStage::Record => "Record",
        }
    }

    pub fn order(&self) -> u32 {
        match self {
            PipelineStage::Structure => 1,
            PipelineStage::Content => 2,
            PipelineStage::ImagePrompt => 3,
            PipelineStage::ImageRender => 4,
            PipelineStage::Preview => 5,
            PipelineStage::Publish => 6,
            PipelineStage::Record => 7,
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One text-generation call on behalf of a stage
pub(crate) async fn call_model(
    text: &dyn TextGenerator,
    stage: PipelineStage,
    prompt: String,
    config: &ChatConfig,
) -> Result<String> {
    tracing::debug!(
        "[{}] Calling model {} ({} prompt chars)",
        stage.as_str().to_uppercase(),
        config.model,
        prompt.chars().count()
    );

    text.chat(ChatRequest::prompt(prompt, config.clone()))
        .await
        .map_err(|source| RedpostError::Transport { stage, source })
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted generators shared by the stage tests

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::providers::{
        ChatConfig, ChatRequest, ImageGenerator, ImageRequest, ProviderError, TextGenerator,
    };

    pub fn chat_config() -> ChatConfig {
        ChatConfig {
            model: "test-model".to_string(),
            temperature: 0.7,
            max_tokens: 2000,
        }
    }

    /// Replies with queued responses and remembers every prompt
    #[derive(Default)]
    pub struct ScriptedText {
        replies: Mutex<VecDeque<Result<String, ProviderError>>>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedText {
        pub fn replying(replies: Vec<&str>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().map(|r| Ok(r.to_string())).collect()),
                prompts: Mutex::default(),
            }
        }

        pub fn failing() -> Self {
            Self {
                replies: Mutex::new(VecDeque::from([Err(ProviderError::RequestFailed(
                    "connection refused".to_string(),
                ))])),
                prompts: Mutex::default(),
            }
        }

        pub fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedText {
        async fn chat(&self, request: ChatRequest) -> Result<String, ProviderError> {
            self.prompts
                .lock()
                .unwrap()
                .push(request.messages[0].content.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::RequestFailed("no scripted reply".into())))
        }
    }

    /// Returns `img://<n>` and fails on prompts listed in `fail_on`
    #[derive(Default)]
    pub struct CountingImages {
        pub prompts: Mutex<Vec<String>>,
        pub fail_on: Vec<String>,
    }

    #[async_trait]
    impl ImageGenerator for CountingImages {
        async fn render(&self, request: ImageRequest) -> Result<String, ProviderError> {
            if self.fail_on.contains(&request.prompt) {
                return Err(ProviderError::ApiError {
                    status: 500,
                    message: "render failed".to_string(),
                });
            }
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(request.prompt.clone());
            Ok(format!("img://{}", prompts.len()))
        }
    }
}
