//! Configuration for the pipeline
//!
//! Loaded once at start-up from `~/.redpost/config.toml` (or an explicit
//! path), then overridden by `.env` and process environment variables.
//! Components receive the finished value and never read the environment.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::providers::ChatConfig;
use crate::{RedpostError, Result};

pub const DEFAULT_TEXT_MODEL: &str = "doubao-seed-1-8-251228";
pub const DEFAULT_IMAGE_MODEL: &str = "doubao-seedream-4-5-251128";
pub const DEFAULT_BASE_URL: &str = "https://ark.cn-beijing.volces.com/api/v3";
pub const DEFAULT_IMAGE_SIZE: &str = "1728x2304";
pub const DEFAULT_MCP_TOOL: &str = "publish_content";

/// Keys accepted by [`RedpostConfig::get`] and [`RedpostConfig::set`]
pub const CONFIG_KEYS: &[&str] = &[
    "llm.api_key",
    "llm.model",
    "llm.base_url",
    "llm.temperature",
    "llm.timeout_secs",
    "image.api_key",
    "image.model",
    "image.base_url",
    "image.size",
    "image.watermark",
    "publish.mcp_url",
    "publish.mcp_tool",
    "publish.private",
    "storage.output_dir",
    "storage.preview_dir",
    "storage.archive_images",
    "preview.open_browser",
    "logging.log_to_file",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RedpostConfig {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub image: ImageModelConfig,

    #[serde(default)]
    pub publish: PublishConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub preview: PreviewConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_text_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_text_model() -> String {
    DEFAULT_TEXT_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_text_model(),
            base_url: default_base_url(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageModelConfig {
    /// Falls back to `llm.api_key`
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_image_model")]
    pub model: String,

    /// Falls back to `llm.base_url`
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_image_size")]
    pub size: String,

    #[serde(default)]
    pub watermark: bool,
}

fn default_image_model() -> String {
    DEFAULT_IMAGE_MODEL.to_string()
}

fn default_image_size() -> String {
    DEFAULT_IMAGE_SIZE.to_string()
}

impl Default for ImageModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_image_model(),
            base_url: None,
            size: default_image_size(),
            watermark: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(default)]
    pub mcp_url: Option<String>,

    #[serde(default = "default_mcp_tool")]
    pub mcp_tool: String,

    /// Mark published notes as private
    #[serde(default)]
    pub private: bool,
}

fn default_mcp_tool() -> String {
    DEFAULT_MCP_TOOL.to_string()
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            mcp_url: None,
            mcp_tool: default_mcp_tool(),
            private: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_preview_dir")]
    pub preview_dir: PathBuf,

    /// Download rendered images into the output directory
    #[serde(default)]
    pub archive_images: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

fn default_preview_dir() -> PathBuf {
    PathBuf::from("./preview")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            preview_dir: default_preview_dir(),
            archive_images: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewConfig {
    #[serde(default = "default_true")]
    pub open_browser: bool,
}

fn default_true() -> bool {
    true
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self { open_browser: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also append logs to `app.log` in the output directory
    #[serde(default)]
    pub log_to_file: bool,
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| RedpostError::ConfigError(format!("Invalid value for {}: {}", key, value)))
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl RedpostConfig {
    /// Default config file location
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".redpost")
            .join("config.toml")
    }

    /// Load file, then `.env`, then process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Ok(env_file) = dotenv::dotenv() {
            tracing::debug!("[CONFIG] Loaded {}", env_file.display());
        }
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Same as [`load`](Self::load) with an explicit variable lookup
    pub fn load_with_env<F>(path: Option<&Path>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::config_path);

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            toml::from_str(&content).map_err(|e| {
                RedpostError::ConfigError(format!("{}: {}", path.display(), e))
            })?
        } else {
            tracing::debug!("[CONFIG] {} not found, using defaults", path.display());
            RedpostConfig::default()
        };

        config.apply_env(env);
        Ok(config)
    }

    /// Environment overrides; blank values are ignored
    pub fn apply_env<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| env(key).as_deref().and_then(non_empty);

        if let Some(v) = var("DOUBAO_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = var("DOUBAO_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = var("DOUBAO_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Some(v) = var("DOUBAO_IMAGE_API_KEY") {
            self.image.api_key = Some(v);
        }
        if let Some(v) = var("DOUBAO_IMAGE_MODEL") {
            self.image.model = v;
        }
        if let Some(v) = var("MCP_URL") {
            self.publish.mcp_url = Some(v);
        }
        if let Some(v) = var("MCP_TOOL") {
            self.publish.mcp_tool = v;
        }
        if let Some(v) = var("OUTPUT_DIR") {
            self.storage.output_dir = PathBuf::from(v);
        }
        if let Some(v) = var("PREVIEW_DIR") {
            self.storage.preview_dir = PathBuf::from(v);
        }
    }

    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::config_path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| RedpostError::ConfigError(e.to_string()))?;
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Settings needed before any generation call
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_key.as_deref().and_then(non_empty).is_none() {
            return Err(RedpostError::ConfigError(
                "llm.api_key is not set (config file or DOUBAO_API_KEY)".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(RedpostError::ConfigError(format!(
                "llm.temperature must be between 0 and 2, got {}",
                self.llm.temperature
            )));
        }
        if self.llm.timeout_secs == 0 {
            return Err(RedpostError::ConfigError(
                "llm.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn image_api_key(&self) -> Option<String> {
        self.image
            .api_key
            .clone()
            .or_else(|| self.llm.api_key.clone())
    }

    pub fn image_base_url(&self) -> String {
        self.image
            .base_url
            .clone()
            .unwrap_or_else(|| self.llm.base_url.clone())
    }

    pub fn chat_config(&self, max_tokens: u32) -> ChatConfig {
        ChatConfig {
            model: self.llm.model.clone(),
            temperature: self.llm.temperature,
            max_tokens,
        }
    }

    /// Get a configuration value by key path (e.g., "llm.model")
    pub fn get(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["llm", "api_key"] => self.llm.api_key.clone(),
            ["llm", "model"] => Some(self.llm.model.clone()),
            ["llm", "base_url"] => Some(self.llm.base_url.clone()),
            ["llm", "temperature"] => Some(self.llm.temperature.to_string()),
            ["llm", "timeout_secs"] => Some(self.llm.timeout_secs.to_string()),
            ["image", "api_key"] => self.image.api_key.clone(),
            ["image", "model"] => Some(self.image.model.clone()),
            ["image", "base_url"] => self.image.base_url.clone(),
            ["image", "size"] => Some(self.image.size.clone()),
            ["image", "watermark"] => Some(self.image.watermark.to_string()),
            ["publish", "mcp_url"] => self.publish.mcp_url.clone(),
            ["publish", "mcp_tool"] => Some(self.publish.mcp_tool.clone()),
            ["publish", "private"] => Some(self.publish.private.to_string()),
            ["storage", "output_dir"] => Some(self.storage.output_dir.display().to_string()),
            ["storage", "preview_dir"] => Some(self.storage.preview_dir.display().to_string()),
            ["storage", "archive_images"] => Some(self.storage.archive_images.to_string()),
            ["preview", "open_browser"] => Some(self.preview.open_browser.to_string()),
            ["logging", "log_to_file"] => Some(self.logging.log_to_file.to_string()),
            _ => None,
        }
    }

    /// Set a configuration value by key path
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["llm", "api_key"] => self.llm.api_key = non_empty(value),
            ["llm", "model"] => self.llm.model = value.trim().to_string(),
            ["llm", "base_url"] => self.llm.base_url = value.trim().to_string(),
            ["llm", "temperature"] => self.llm.temperature = parse_value(key, value)?,
            ["llm", "timeout_secs"] => self.llm.timeout_secs = parse_value(key, value)?,
            ["image", "api_key"] => self.image.api_key = non_empty(value),
            ["image", "model"] => self.image.model = value.trim().to_string(),
            ["image", "base_url"] => self.image.base_url = non_empty(value),
            ["image", "size"] => self.image.size = value.trim().to_string(),
            ["image", "watermark"] => self.image.watermark = parse_value(key, value)?,
            ["publish", "mcp_url"] => self.publish.mcp_url = non_empty(value),
            ["publish", "mcp_tool"] => self.publish.mcp_tool = value.trim().to_string(),
            ["publish", "private"] => self.publish.private = parse_value(key, value)?,
            ["storage", "output_dir"] => self.storage.output_dir = PathBuf::from(value.trim()),
            ["storage", "preview_dir"] => self.storage.preview_dir = PathBuf::from(value.trim()),
            ["storage", "archive_images"] => {
                self.storage.archive_images = parse_value(key, value)?
            }
            ["preview", "open_browser"] => self.preview.open_browser = parse_value(key, value)?,
            ["logging", "log_to_file"] => self.logging.log_to_file = parse_value(key, value)?,
            _ => {
                return Err(RedpostError::ConfigError(format!(
                    "Unknown configuration key: {}",
                    key
                )))
            }
        }

        Ok(())
    }
}
