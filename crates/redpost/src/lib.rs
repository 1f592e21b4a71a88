//! # Redpost - topic-to-post generation pipeline
//!
//! Turns a short topic description into a finished social note (title, body,
//! tags, images), holds it behind a human preview gate, and publishes it now
//! or at a scheduled instant.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │  Structure   │───▶│   Content    │───▶│ Image Prompt │───▶│ Image Render │
//! │   (plan)     │    │   (body)     │    │   (plan)     │    │ (sequential) │
//! └──────────────┘    └──────────────┘    └──────────────┘    └──────┬───────┘
//!                                                                    │
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐           │
//! │ Record Store │◀───│  Scheduling  │◀───│ Preview Gate │◀──────────┘
//! │  (history)   │    │  Executor    │    │  (human)     │
//! └──────────────┘    └──────────────┘    └──────────────┘
//! ```
//!
//! Every arrow is a strict sequential dependency. External calls go through
//! the capability traits in [`providers`], [`publisher`] and [`preview`].

pub mod config;
pub mod history;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod preview;
pub mod providers;
pub mod publisher;
pub mod scheduler;
pub mod stages;

pub use config::RedpostConfig;
pub use history::{HistorySummary, NewPublishRecord, PublishRecord, PublishRecordStore};
pub use models::{
    Content, ContentStructure, GeneratedPost, GenerationInput, ImageConfig, RenderedImages,
    ResolvedInput, Title, TitlePolarity,
};
pub use parser::ParseError;
pub use pipeline::{Pipeline, PipelineOutcome};
pub use preview::{PreviewDecision, PreviewGate, ReviewPrompt, ScheduleAnswer};
pub use providers::{ImageGenerator, ProviderError, TextGenerator};
pub use publisher::{PublishReceipt, PublishRequest, Publisher};
pub use scheduler::{ScheduleTime, SchedulingExecutor};
pub use stages::PipelineStage;

/// Main error type for the pipeline
#[derive(Debug, thiserror::Error)]
pub enum RedpostError {
    #[error("{stage} stage could not parse model output")]
    Parse {
        stage: PipelineStage,
        #[source]
        source: ParseError,
    },

    #[error("{stage} stage call failed")]
    Transport {
        stage: PipelineStage,
        #[source]
        source: ProviderError,
    },

    #[error("Invalid schedule time '{input}': expected YYYY-MM-DD HH:mm:ss")]
    InvalidScheduleTime { input: String },

    #[error("Preview gate transition not allowed: {0}")]
    GateTransition(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Record store error: {0}")]
    StoreError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl RedpostError {
    /// Stage the error came from, when it is tied to one
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            RedpostError::Parse { stage, .. } | RedpostError::Transport { stage, .. } => {
                Some(*stage)
            }
            RedpostError::InvalidScheduleTime { .. } | RedpostError::GateTransition(_) => {
                Some(PipelineStage::Preview)
            }
            RedpostError::StoreError(_) => Some(PipelineStage::Record),
            _ => None,
        }
    }

    /// Raw model output attached to a parse failure
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            RedpostError::Parse { source, .. } => Some(&source.raw),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RedpostError>;
