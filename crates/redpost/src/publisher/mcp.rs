//! JSON-RPC 2.0 `tools/call` publisher

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{PublishReceipt, PublishRequest, Publisher};
use crate::providers::ProviderError;
use crate::stages::PipelineStage;
use crate::{RedpostError, Result};

pub struct McpPublisher {
    client: Client,
    url: String,
    tool: String,
}

impl McpPublisher {
    pub fn new(url: impl Into<String>, tool: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| transport(ProviderError::RequestFailed(e.to_string())))?;

        Ok(Self {
            client,
            url: url.into(),
            tool: tool.into(),
        })
    }

    fn payload(&self, request: &PublishRequest) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": {
                "name": self.tool,
                "arguments": {
                    "title": request.title,
                    "content": request.content,
                    "tags": request.tags,
                    "images": request.images,
                }
            }
        })
    }
}

fn transport(source: ProviderError) -> RedpostError {
    RedpostError::Transport {
        stage: PipelineStage::Publish,
        source,
    }
}

#[async_trait]
impl Publisher for McpPublisher {
    fn name(&self) -> &str {
        "mcp"
    }

    async fn publish(&self, request: &PublishRequest) -> Result<PublishReceipt> {
        tracing::info!("[PUBLISH] Calling tool {} at {}", self.tool, self.url);

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&self.payload(request))
            .send()
            .await
            .map_err(|e| transport(ProviderError::RequestFailed(e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(transport(ProviderError::ApiError {
                status: status.as_u16(),
                message: body,
            }));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| transport(ProviderError::ParseError(e.to_string())))?;

        if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
            let code = error["code"].as_i64().unwrap_or(0);
            let message = error["message"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            tracing::error!("[PUBLISH] Tool call rejected ({}): {}", code, message);
            return Err(transport(ProviderError::RpcError { code, message }));
        }

        // Tool results carry a content array of text parts
        let reference = body["result"]["content"]
            .as_array()
            .and_then(|parts| parts.first())
            .and_then(|part| part["text"].as_str())
            .map(str::to_string);

        tracing::info!("[PUBLISH] Tool call succeeded");

        Ok(PublishReceipt {
            publisher: self.name().to_string(),
            reference,
            message: format!("published via {}", self.tool),
        })
    }
}
