//! Data carried between pipeline stages
//!
//! Each stage owns its output until it is handed to the next one. Later stages
//! build new values and never patch earlier ones.

use serde::{Deserialize, Serialize};

use crate::{RedpostError, Result};

/// Account used when the request names none
pub const DEFAULT_ACCOUNT: &str = "你的效率闺蜜";

/// Target body length when the request names none
pub const DEFAULT_WORD_COUNT: u32 = 600;

/// Number of candidate titles a structure must carry
pub const STRUCTURE_TITLE_COUNT: usize = 5;

/// A topic request as supplied by the user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationInput {
    pub topic: String,
    #[serde(default)]
    pub accounts: Option<Vec<String>>,
    #[serde(default)]
    pub word_count: Option<u32>,
    #[serde(default)]
    pub context: Option<String>,
}

impl GenerationInput {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Default::default()
        }
    }

    pub fn with_accounts(mut self, accounts: Vec<String>) -> Self {
        self.accounts = Some(accounts);
        self
    }

    pub fn with_word_count(mut self, word_count: u32) -> Self {
        self.word_count = Some(word_count);
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Apply defaults and reject an empty topic
    pub fn resolve(&self) -> Result<ResolvedInput> {
        let topic = self.topic.trim();
        if topic.is_empty() {
            return Err(RedpostError::InvalidInput("topic must not be empty".into()));
        }

        let accounts: Vec<String> = self
            .accounts
            .iter()
            .flatten()
            .map(|a| a.trim())
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect();
        let accounts = if accounts.is_empty() {
            vec![DEFAULT_ACCOUNT.to_string()]
        } else {
            accounts
        };

        let word_count = match self.word_count {
            Some(0) => {
                return Err(RedpostError::InvalidInput(
                    "word count must be greater than zero".into(),
                ))
            }
            Some(n) => n,
            None => DEFAULT_WORD_COUNT,
        };

        Ok(ResolvedInput {
            topic: topic.to_string(),
            accounts,
            word_count,
            context: self.context.as_deref().unwrap_or("").trim().to_string(),
        })
    }
}

/// A request with every default applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedInput {
    pub topic: String,
    pub accounts: Vec<String>,
    pub word_count: u32,
    pub context: String,
}

/// Stimulus direction of a candidate headline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitlePolarity {
    Positive,
    Negative,
}

/// One candidate headline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Title {
    #[serde(alias = "text")]
    pub original: String,
    #[serde(rename = "type")]
    pub polarity: TitlePolarity,
}

/// Planning artifact produced by the structure stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentStructure {
    pub titles: Vec<Title>,
    pub final_title: String,
    pub content_outline: Vec<String>,
    pub tags: Vec<String>,
    pub subject: String,
    pub context: String,
    pub word_count: u32,
    pub accounts: Vec<String>,
}

/// The finished post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub title: String,
    #[serde(rename = "content")]
    pub body: String,
    pub tags: Vec<String>,
    /// Free-text styling advice for the illustrations
    #[serde(default)]
    pub image_suggestions: String,
}

/// Image generation plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageConfig {
    pub cover_image: String,
    pub content_images: Vec<String>,
    pub content_images_count: usize,
}

impl ImageConfig {
    /// Build a plan whose declared count always matches the list
    pub fn new(cover_image: impl Into<String>, content_images: Vec<String>) -> Self {
        let content_images_count = content_images.len();
        Self {
            cover_image: cover_image.into(),
            content_images,
            content_images_count,
        }
    }

    /// Prompts in render order, cover first
    pub fn prompts(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.cover_image.as_str())
            .chain(self.content_images.iter().map(String::as_str))
    }
}

/// Rendered image references, cover first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenderedImages(Vec<String>);

impl RenderedImages {
    pub fn new(cover: String, content: Vec<String>) -> Self {
        let mut images = Vec::with_capacity(content.len() + 1);
        images.push(cover);
        images.extend(content);
        Self(images)
    }

    pub fn cover(&self) -> &str {
        &self.0[0]
    }

    pub fn content(&self) -> &[String] {
        &self.0[1..]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// Everything the generation half of the pipeline produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedPost {
    pub structure: ContentStructure,
    pub content: Content,
    pub image_config: ImageConfig,
    pub images: RenderedImages,
}
