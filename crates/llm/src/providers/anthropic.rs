use super::{
    build_http_client, CompletionRequest, CompletionResponse, LlmProvider, ProviderId, TokenUsage,
};
use crate::config::ProviderKind;
use async_trait::async_trait;
use common::{LlmError, LlmResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const PROVIDER: &str = "anthropic";

// The messages API rejects requests without max_tokens.
const DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    api_key: Option<String>,
    model: String,
    endpoint: String,
    client: Client,
    timeout: Duration,
}

impl AnthropicProvider {
    pub fn new(
        api_key: Option<String>,
        model: String,
        endpoint: Option<String>,
        timeout: Duration,
    ) -> LlmResult<Self> {
        Ok(Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            model,
            endpoint: endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            client: build_http_client(timeout)?,
            timeout,
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new(ProviderKind::Anthropic, &self.model)
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            LlmError::Configuration("Anthropic API key is not configured".to_string())
        })?;

        let start = Instant::now();

        let body = MessagesRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system: request.system_prompt.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
            temperature: request.temperature,
        };

        debug!(model = %self.model, "sending request to Anthropic");

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::from_reqwest(PROVIDER, self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Http {
                provider: PROVIDER.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let parsed: MessagesResponse =
            response.json().await.map_err(|e| LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                message: e.to_string(),
            })?;

        let content = parsed.content.first().ok_or_else(|| LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            message: "response contained no content blocks".to_string(),
        })?;

        let usage = match parsed.usage {
            Some(u) => TokenUsage::new(u.input_tokens, u.output_tokens),
            None => TokenUsage::estimate(&request.prompt, &content.text),
        };

        let elapsed = start.elapsed();
        info!(
            model = %self.model,
            total_tokens = usage.total_tokens,
            elapsed_ms = elapsed.as_millis() as u64,
            "Anthropic completion finished"
        );

        Ok(CompletionResponse {
            content: content.text.clone(),
            model: self.model.clone(),
            usage,
            elapsed,
        })
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}
