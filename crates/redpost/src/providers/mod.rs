//! Generation capabilities used by the pipeline stages

mod openai;

pub use openai::OpenAICompatProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Error type for provider operations
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Response parse error: {0}")]
    ParseError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("JSON-RPC error ({code}): {message}")]
    RpcError { code: i64, message: String },
}

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Model settings for one chat call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub config: ChatConfig,
}

impl ChatRequest {
    /// Single user-turn request
    pub fn prompt(prompt: impl Into<String>, config: ChatConfig) -> Self {
        Self {
            messages: vec![ChatMessage::user(prompt)],
            config,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRequest {
    pub model: String,
    pub prompt: String,
    pub size: String,
    pub watermark: bool,
}

/// Text completion backend
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Return the raw text of the first completion choice
    async fn chat(&self, request: ChatRequest) -> Result<String, ProviderError>;
}

/// Image rendering backend
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Render one prompt and return a reference (URL) to the image
    async fn render(&self, request: ImageRequest) -> Result<String, ProviderError>;
}
