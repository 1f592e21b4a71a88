//! OpenAI-compatible provider (chat completions and image generations)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{ChatRequest, ImageGenerator, ImageRequest, ProviderError, TextGenerator};

/// Client for any endpoint speaking the OpenAI REST dialect
pub struct OpenAICompatProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl OpenAICompatProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        if api_key.is_none() {
            tracing::warn!("[PROVIDER] Created without API key; calls will fail");
        }

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn auth_header(&self) -> Result<String, ProviderError> {
        self.api_key
            .as_ref()
            .map(|k| format!("Bearer {}", k))
            .ok_or_else(|| ProviderError::AuthError("No API key configured".to_string()))
    }

    async fn post_json(&self, path: &str, payload: &Value) -> Result<Value, ProviderError> {
        let auth_header = self.auth_header()?;
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", auth_header)
            .json(payload)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(ProviderError::AuthError(body));
            }
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl TextGenerator for OpenAICompatProvider {
    async fn chat(&self, request: ChatRequest) -> Result<String, ProviderError> {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|m| serde_json::json!({ "role": m.role, "content": m.content }))
            .collect();

        let payload = serde_json::json!({
            "model": request.config.model,
            "messages": messages,
            "temperature": request.config.temperature,
            "max_tokens": request.config.max_tokens,
        });

        tracing::debug!(
            "[PROVIDER] chat request: model={}, messages={}, max_tokens={}",
            request.config.model,
            messages.len(),
            request.config.max_tokens
        );

        let json = self.post_json("/chat/completions", &payload).await?;

        json["choices"]
            .as_array()
            .and_then(|choices| choices.first())
            .and_then(|choice| choice["message"]["content"].as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                ProviderError::ParseError("missing choices[0].message.content".to_string())
            })
    }
}

#[async_trait]
impl ImageGenerator for OpenAICompatProvider {
    async fn render(&self, request: ImageRequest) -> Result<String, ProviderError> {
        let payload = serde_json::json!({
            "model": request.model,
            "prompt": request.prompt,
            "response_format": "url",
            "size": request.size,
            "watermark": request.watermark,
        });

        tracing::debug!(
            "[PROVIDER] image request: model={}, size={}",
            request.model,
            request.size
        );

        let json = self.post_json("/images/generations", &payload).await?;

        json["data"]
            .as_array()
            .and_then(|data| data.first())
            .and_then(|item| item["url"].as_str())
            .map(str::to_string)
            .ok_or_else(|| ProviderError::ParseError("missing data[0].url".to_string()))
    }
}
